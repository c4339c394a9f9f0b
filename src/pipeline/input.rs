//! Input resolution: normalise a path, URL or byte buffer to a local file.
//!
//! pdfium and `pdf2htmlEX` both want a file-system path. Downloads and
//! in-memory uploads are written to temp files whose guards live inside
//! [`ResolvedInput`], so cleanup happens when the conversion drops it.
//! The `%PDF` magic is checked up front so callers get a meaningful error
//! rather than a pdfium failure.

use crate::error::Pdf2HtmlError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input: a local path or a temp file we own.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was a byte buffer spooled to a named temp file.
    Spooled(NamedTempFile),
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Spooled(file) => file.path(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedInput, Pdf2HtmlError> {
    if input.trim().is_empty() {
        return Err(Pdf2HtmlError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Write `bytes` to a named temp file in `scratch_dir` (or the system temp
/// directory) after checking it looks like a PDF.
pub fn spool_bytes(
    bytes: &[u8],
    scratch_dir: Option<&Path>,
) -> Result<ResolvedInput, Pdf2HtmlError> {
    if bytes.is_empty() {
        return Err(Pdf2HtmlError::EmptyInput);
    }
    check_magic(bytes, Path::new("<upload>"))?;

    let builder = {
        let mut b = tempfile::Builder::new();
        b.prefix("upload-").suffix(".pdf");
        b
    };
    let mut file = match scratch_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| Pdf2HtmlError::Internal(format!("Failed to create temp file: {e}")))?;

    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| Pdf2HtmlError::Internal(format!("Failed to write temp file: {e}")))?;

    debug!(
        "Spooled {} bytes to {}",
        bytes.len(),
        file.path().display()
    );
    Ok(ResolvedInput::Spooled(file))
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, Pdf2HtmlError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Pdf2HtmlError::FileNotFound { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            let n = f.read(&mut magic).unwrap_or(0);
            check_magic(&magic[..n], &path)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2HtmlError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2HtmlError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2HtmlError> {
    info!("Downloading PDF from: {}", url);

    let download_failed = |reason: String| Pdf2HtmlError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2HtmlError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let filename = extract_filename(url);

    let temp_dir = TempDir::new().map_err(|e| Pdf2HtmlError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_failed(e.to_string()))?;

    if bytes.is_empty() {
        return Err(Pdf2HtmlError::EmptyInput);
    }
    check_magic(&bytes, &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| Pdf2HtmlError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Reject data whose first bytes are not `%PDF`. Inputs shorter than the
/// magic are left for pdfium to reject as corrupt.
fn check_magic(bytes: &[u8], path: &Path) -> Result<(), Pdf2HtmlError> {
    if bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(Pdf2HtmlError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Pick a filename from the last URL path segment.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(
            extract_filename("https://example.com/papers/report.pdf"),
            "report.pdf"
        );
        assert_eq!(
            extract_filename("https://example.com/download"),
            "downloaded.pdf"
        );
    }

    #[test]
    fn spool_rejects_empty_bytes() {
        assert!(matches!(
            spool_bytes(b"", None),
            Err(Pdf2HtmlError::EmptyInput)
        ));
    }

    #[test]
    fn spool_rejects_non_pdf() {
        match spool_bytes(b"GIF89a....", None) {
            Err(Pdf2HtmlError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"GIF8"),
            _ => panic!("expected NotAPdf"),
        }
    }

    #[test]
    fn spool_writes_into_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = spool_bytes(b"%PDF-1.7\n%%EOF", Some(dir.path())).unwrap();
        let path = resolved.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7\n%%EOF");
        drop(resolved);
        assert!(!path.exists(), "spooled file must be removed on drop");
    }

    #[tokio::test]
    async fn local_missing_file_is_not_found() {
        let err = resolve_input("/no/such/file.pdf", 5).await.err().unwrap();
        assert!(matches!(err, Pdf2HtmlError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_non_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, "plain text, not a pdf").unwrap();
        let err = resolve_input(path.to_str().unwrap(), 5).await.err().unwrap();
        assert!(matches!(err, Pdf2HtmlError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("  ", 5).await.err().unwrap();
        assert!(matches!(err, Pdf2HtmlError::InvalidInput { .. }));
    }
}
