//! # edgequake-pdf2html
//!
//! Convert PDF documents to self-contained HTML, as a library, a CLI or a
//! containerised HTTP service.
//!
//! ## Converters
//!
//! | [`ConverterKind`] | How | Output |
//! |-------------------|-----|--------|
//! | `Native` (default) | pdfium text segments and image objects | absolutely positioned text and images, 1 pt = 1 px |
//! | `Overlay` | pdfium page raster plus text segments | page PNG with a transparent, selectable text layer in percent |
//! | `Pdf2HtmlEx` | external `pdf2htmlEX` executable | whatever the tool produces |
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file, download URL or spool bytes
//!  ├─ 2. Extract  open with pdfium, walk selected pages (spawn_blocking)
//!  ├─ 3. Encode   images and page rasters → data: URLs
//!  └─ 4. Render   assemble one HTML document + per-page stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2html::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("document.pdf", &config).await?;
//!     println!("{}", output.html);
//!     eprintln!("{} pages, {} text spans",
//!         output.stats.processed_pages,
//!         output.stats.text_spans);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `server` | on | The axum HTTP service in [`server`] |
//! | `cli`    | on | Enables the `pdf2html` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable both when using only the library:
//! ```toml
//! edgequake-pdf2html = { version = "0.1", default-features = false }
//! ```
//!
//! ## Native dependencies
//!
//! The pdfium shared library must be present for the `Native` and `Overlay`
//! converters (see [`engine`] for the lookup order); `pdf2htmlEX` must be on
//! `PATH` for the external converter. Nothing is downloaded at runtime.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod converter;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ConverterKind, PageSelection};
pub use convert::{convert, convert_from_bytes, convert_sync, convert_to_file, inspect};
pub use converter::{HtmlConverter, PipelineConverter, RequestOptions};
pub use error::{PageError, Pdf2HtmlError};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, PageResult};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
