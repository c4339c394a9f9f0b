//! The `pdf2htmlEX` backend: run the external tool and read back its HTML.
//!
//! The tool writes into a fresh directory under the scratch dir which is
//! removed when the conversion returns. The child is spawned with
//! `kill_on_drop`, so dropping the conversion future (the library timeout,
//! or runtime shutdown) also terminates the process.

use crate::config::ConversionConfig;
use crate::engine::PDF2HTMLEX;
use crate::error::Pdf2HtmlError;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Name of the output document inside the destination directory.
const OUTPUT_NAME: &str = "output.html";

/// Keep at most this many bytes of the tool's stderr in error messages.
const STDERR_TAIL: usize = 2048;

/// Assemble the command line for one conversion.
pub fn build_args(
    config: &ConversionConfig,
    input: &Path,
    dest_dir: &Path,
) -> Result<Vec<OsString>, Pdf2HtmlError> {
    let (first, last) = config.pages.as_span().ok_or_else(|| {
        Pdf2HtmlError::InvalidConfig(format!(
            "{PDF2HTMLEX} only converts contiguous page ranges, got {:?}",
            config.pages
        ))
    })?;

    let mut args: Vec<OsString> = vec!["--dest-dir".into(), dest_dir.into()];
    if let Some(first) = first {
        args.push("--first-page".into());
        args.push(first.to_string().into());
    }
    if let Some(last) = last {
        args.push("--last-page".into());
        args.push(last.to_string().into());
    }
    if let Some(ref pwd) = config.password {
        args.push("--user-password".into());
        args.push(pwd.into());
    }
    args.extend(config.tool_args.iter().map(OsString::from));
    args.push(input.into());
    args.push(OUTPUT_NAME.into());
    Ok(args)
}

/// Run `bin` on `input` and return the produced HTML.
pub async fn run(
    bin: &Path,
    config: &ConversionConfig,
    input: &Path,
) -> Result<String, Pdf2HtmlError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("pdf2htmlex-");
    let dest = match config.scratch_dir {
        Some(ref dir) => builder.tempdir_in(dir),
        None => builder.tempdir(),
    }
    .map_err(|e| Pdf2HtmlError::Internal(format!("Failed to create output dir: {e}")))?;

    let args = build_args(config, input, dest.path())?;
    info!("Running {} on {}", bin.display(), input.display());
    debug!("{} args: {:?}", PDF2HTMLEX, redact(&args));

    let output = Command::new(bin)
        .args(&args)
        .current_dir(dest.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Pdf2HtmlError::ExternalToolMissing {
                    tool: PDF2HTMLEX.to_string(),
                    hint: format!("Could not execute '{}': {e}", bin.display()),
                }
            }
            _ => Pdf2HtmlError::Internal(format!("Failed to spawn {PDF2HTMLEX}: {e}")),
        })?;

    if !output.status.success() {
        return Err(Pdf2HtmlError::ExternalToolFailed {
            tool: PDF2HTMLEX.to_string(),
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr),
        });
    }

    let html_path = dest.path().join(OUTPUT_NAME);
    tokio::fs::read_to_string(&html_path)
        .await
        .map_err(|e| Pdf2HtmlError::ExternalToolFailed {
            tool: PDF2HTMLEX.to_string(),
            status: output.status.to_string(),
            stderr: format!("no readable {OUTPUT_NAME} produced ({e})"),
        })
}

/// Page containers in a `pdf2htmlEX` document carry the `pf` class.
pub fn count_pages(html: &str) -> usize {
    html.matches("class=\"pf ").count()
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL {
        return text.to_string();
    }
    let mut cut = text.len() - STDERR_TAIL;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    format!("…{}", &text[cut..])
}

fn redact(args: &[OsString]) -> Vec<OsString> {
    let mut out = args.to_vec();
    for i in 1..out.len() {
        if args[i - 1] == "--user-password" {
            out[i] = "<redacted>".into();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSelection;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn args_for_whole_document() {
        let config = ConversionConfig::default();
        let args = build_args(&config, Path::new("/in/doc.pdf"), Path::new("/out")).unwrap();
        assert_eq!(
            strings(&args),
            ["--dest-dir", "/out", "/in/doc.pdf", "output.html"]
        );
    }

    #[test]
    fn args_for_range_password_and_extras() {
        let config = ConversionConfig::builder()
            .pages(PageSelection::Range(2, 4))
            .password("s3cret")
            .tool_args(vec!["--zoom".into(), "1.5".into()])
            .build()
            .unwrap();
        let args = build_args(&config, Path::new("in.pdf"), Path::new("/out")).unwrap();
        assert_eq!(
            strings(&args),
            [
                "--dest-dir",
                "/out",
                "--first-page",
                "2",
                "--last-page",
                "4",
                "--user-password",
                "s3cret",
                "--zoom",
                "1.5",
                "in.pdf",
                "output.html"
            ]
        );
        assert!(!strings(&redact(&args)).contains(&"s3cret".to_string()));
    }

    #[test]
    fn scattered_pages_are_rejected() {
        let config = ConversionConfig::builder()
            .pages(PageSelection::Set(vec![1, 3]))
            .build()
            .unwrap();
        let err = build_args(&config, Path::new("in.pdf"), Path::new("/out")).unwrap_err();
        assert!(matches!(err, Pdf2HtmlError::InvalidConfig(_)));
    }

    #[test]
    fn stderr_is_truncated_from_the_front() {
        let long = "x".repeat(STDERR_TAIL + 100) + "FINAL";
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.ends_with("FINAL"));
        assert!(tail.starts_with('…'));
        assert_eq!(stderr_tail(b"  short \n"), "short");
    }

    #[test]
    fn counts_page_containers() {
        let html = r#"<div id="pf1" class="pf w0 h0"></div><div id="pf2" class="pf w0 h0"></div>"#;
        assert_eq!(count_pages(html), 2);
        assert_eq!(count_pages("<html></html>"), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_binary_is_reported() {
        let config = ConversionConfig::default();
        let err = run(Path::new("/no/such/pdf2htmlEX"), &config, Path::new("in.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2HtmlError::ExternalToolMissing { .. }));
    }
}
