//! Output types returned by the conversion entry points.

use crate::config::ConverterKind;
use crate::error::{PageError, Pdf2HtmlError};
use serde::{Deserialize, Serialize};

/// The result of converting a whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The complete, self-contained HTML document.
    pub html: String,

    /// Backend that produced `html`.
    pub converter: ConverterKind,

    /// Per-page outcome, ordered by page number.
    ///
    /// Empty for [`ConverterKind::Pdf2HtmlEx`], which produces a single
    /// document without per-page detail.
    pub pages: Vec<PageResult>,

    /// Document-level metadata read from the PDF info dictionary.
    pub metadata: DocumentMetadata,

    /// Aggregate statistics.
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Treat any page failure as an error.
    ///
    /// [`crate::convert`] already fails when *every* page failed; this lets
    /// strict callers also refuse partially converted documents.
    pub fn into_result(self) -> Result<Self, Pdf2HtmlError> {
        if self.stats.failed_pages > 0 {
            return Err(Pdf2HtmlError::PartialFailure {
                success: self.stats.processed_pages,
                failed: self.stats.failed_pages,
                total: self.stats.processed_pages + self.stats.failed_pages,
            });
        }
        Ok(self)
    }
}

/// Outcome for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Page box width in points.
    pub width: f32,
    /// Page box height in points.
    pub height: f32,
    /// Number of text spans placed on the page.
    pub text_spans: usize,
    /// Number of images embedded for the page (including the page raster
    /// for the overlay converter).
    pub images: usize,
    /// Set when the page could not be converted; the page is then left out
    /// of the document.
    pub error: Option<PageError>,
    /// Wall-clock time spent extracting this page.
    pub duration_ms: u64,
}

/// Metadata from the PDF info dictionary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Aggregate statistics for a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Selected pages that made it into the HTML.
    pub processed_pages: usize,
    /// Selected pages that failed.
    pub failed_pages: usize,
    /// Text spans across all converted pages.
    pub text_spans: usize,
    /// Embedded images across all converted pages.
    pub images: usize,
    /// Size of the final HTML in bytes.
    pub html_bytes: usize,
    pub extract_duration_ms: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_with(processed: usize, failed: usize) -> ConversionOutput {
        ConversionOutput {
            html: "<html></html>".into(),
            converter: ConverterKind::Native,
            pages: Vec::new(),
            metadata: DocumentMetadata::default(),
            stats: ConversionStats {
                processed_pages: processed,
                failed_pages: failed,
                ..Default::default()
            },
        }
    }

    #[test]
    fn into_result_passes_clean_output() {
        assert!(output_with(3, 0).into_result().is_ok());
    }

    #[test]
    fn into_result_reports_partial_failure() {
        match output_with(2, 1).into_result() {
            Err(Pdf2HtmlError::PartialFailure {
                success,
                failed,
                total,
            }) => {
                assert_eq!((success, failed, total), (2, 1, 3));
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }

    #[test]
    fn output_serialises_converter_name() {
        let json = serde_json::to_value(output_with(1, 0)).unwrap();
        assert_eq!(json["converter"], "native");
        assert_eq!(json["stats"]["processed_pages"], 1);
    }
}
