//! Conversion entry points.
//!
//! Every entry point funnels into the same orchestration: resolve the input
//! to a local file, dispatch on [`ConverterKind`], and assemble a
//! [`ConversionOutput`]. The optional whole-conversion deadline
//! ([`ConversionConfig::timeout`]) wraps everything after input resolution.

use crate::config::{ConversionConfig, ConverterKind};
use crate::engine;
use crate::error::Pdf2HtmlError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, PageResult};
use crate::pipeline::render::{self, ExtractOptions, PageContent};
use crate::pipeline::{external, html, input};
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Title used when neither the caller nor the document provides one.
pub const DEFAULT_TITLE: &str = "PDF Document";

/// Convert a PDF file or URL to HTML.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config` — Conversion configuration
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some pages failed
/// (check `output.stats.failed_pages`, or call
/// [`ConversionOutput::into_result`]).
///
/// # Errors
/// Returns `Err(Pdf2HtmlError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - Wrong or missing password
/// - pdfium or `pdf2htmlEX` unavailable
/// - All selected pages failed
/// - The configured timeout elapsed
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;

    // ── Step 2: Convert under the deadline ───────────────────────────────
    with_timeout(config, convert_path(resolved.path(), config)).await
}

/// Convert PDF bytes in memory to HTML.
///
/// The bytes are spooled to a named temp file in
/// [`ConversionConfig::scratch_dir`] that is removed on return.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2html::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("document.pdf")?;
/// let config = ConversionConfig::default();
/// let output = convert_from_bytes(&bytes, &config).await?;
/// println!("{}", output.html);
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    let spooled = input::spool_bytes(bytes, config.scratch_dir.as_deref())?;
    with_timeout(config, convert_path(spooled.path(), config)).await
}

/// Convert a PDF and write the HTML directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Pdf2HtmlError> {
    let output = convert(input_str, config).await?;
    write_atomic(output_path.as_ref(), &output.html).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2HtmlError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract PDF metadata without converting content.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, Pdf2HtmlError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    render::extract_metadata(resolved.path(), None, None).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn with_timeout<F>(config: &ConversionConfig, fut: F) -> Result<ConversionOutput, Pdf2HtmlError>
where
    F: Future<Output = Result<ConversionOutput, Pdf2HtmlError>>,
{
    match config.timeout() {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Pdf2HtmlError::Timeout {
                secs: config.timeout_secs,
            })?,
        None => fut.await,
    }
}

/// Convert a resolved local file with the configured backend.
async fn convert_path(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    let total_start = Instant::now();

    let mut output = match config.converter {
        ConverterKind::Native => {
            convert_with_pdfium(pdf_path, config, ExtractOptions::native(config)).await?
        }
        ConverterKind::Overlay => {
            convert_with_pdfium(pdf_path, config, ExtractOptions::overlay(config)).await?
        }
        ConverterKind::Pdf2HtmlEx => convert_with_pdf2htmlex(pdf_path, config).await?,
    };

    output.stats.html_bytes = output.html.len();
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Conversion complete ({}): {}/{} pages, {} bytes, {}ms total",
        output.converter,
        output.stats.processed_pages,
        output.stats.total_pages,
        output.stats.html_bytes,
        output.stats.total_duration_ms
    );
    Ok(output)
}

async fn convert_with_pdfium(
    pdf_path: &Path,
    config: &ConversionConfig,
    options: ExtractOptions,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    // ── Extract pages ────────────────────────────────────────────────────
    let extract_start = Instant::now();
    let extraction = render::extract_pages(pdf_path, config, options).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    let (results, contents): (Vec<PageResult>, Vec<Option<PageContent>>) =
        extraction.pages.into_iter().unzip();
    let contents: Vec<PageContent> = contents.into_iter().flatten().collect();

    let processed = contents.len();
    let failed = results.len() - processed;
    debug!("Extracted {} pages ({} failed)", processed, failed);

    if processed == 0 {
        let first_error = results
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Pdf2HtmlError::AllPagesFailed {
            total: results.len(),
            first_error,
        });
    }

    // ── Assemble document ────────────────────────────────────────────────
    let title = document_title(config, &extraction.metadata);
    let html = match config.converter {
        ConverterKind::Overlay => html::render_overlay(&title, &contents, config.font_scale),
        _ => html::render_native(&title, &contents),
    };

    let stats = ConversionStats {
        total_pages: extraction.metadata.page_count,
        processed_pages: processed,
        failed_pages: failed,
        text_spans: results.iter().map(|p| p.text_spans).sum(),
        images: results.iter().map(|p| p.images).sum(),
        extract_duration_ms,
        ..Default::default()
    };

    Ok(ConversionOutput {
        html,
        converter: config.converter,
        pages: results,
        metadata: extraction.metadata,
        stats,
    })
}

async fn convert_with_pdf2htmlex(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2HtmlError> {
    let bin = engine::locate_pdf2htmlex(config.pdf2htmlex_bin.as_deref())?;

    let start = Instant::now();
    let html = external::run(&bin, config, pdf_path).await?;
    let pages = external::count_pages(&html);

    Ok(ConversionOutput {
        html,
        converter: ConverterKind::Pdf2HtmlEx,
        pages: Vec::new(),
        metadata: DocumentMetadata::default(),
        stats: ConversionStats {
            processed_pages: pages,
            extract_duration_ms: start.elapsed().as_millis() as u64,
            ..Default::default()
        },
    })
}

/// Caller's title, else the document's, else [`DEFAULT_TITLE`].
fn document_title(config: &ConversionConfig, metadata: &DocumentMetadata) -> String {
    config
        .title
        .as_deref()
        .or(metadata.title.as_deref())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), Pdf2HtmlError> {
    let write_failed = |e| Pdf2HtmlError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("html.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)
}
