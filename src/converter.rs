//! The seam between the HTTP service and the conversion library.
//!
//! The server only ever talks to an `Arc<dyn HtmlConverter>`. Production
//! uses [`PipelineConverter`], which runs the library with a fixed
//! [`ConversionConfig`]; tests substitute a stub to exercise the HTTP layer
//! without pdfium installed.

use crate::config::{ConversionConfig, ConverterKind, PageSelection};
use crate::convert::convert_from_bytes;
use crate::engine;
use crate::error::Pdf2HtmlError;
use crate::output::ConversionOutput;
use async_trait::async_trait;
use tracing::info;

/// Per-request overrides of the service-wide configuration.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub pages: Option<PageSelection>,
    pub password: Option<String>,
}

/// Turns an uploaded PDF into HTML.
#[async_trait]
pub trait HtmlConverter: Send + Sync {
    /// The backend this converter runs.
    fn kind(&self) -> ConverterKind;

    /// Verify native dependencies before the service reports ready.
    ///
    /// An error here is fatal at startup.
    async fn warm_up(&self) -> Result<(), Pdf2HtmlError> {
        Ok(())
    }

    /// Convert one uploaded document.
    async fn convert_bytes(
        &self,
        pdf: Vec<u8>,
        options: RequestOptions,
    ) -> Result<ConversionOutput, Pdf2HtmlError>;
}

/// [`HtmlConverter`] backed by this crate's conversion pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConverter {
    config: ConversionConfig,
}

impl PipelineConverter {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    fn config_for(&self, options: RequestOptions) -> ConversionConfig {
        let mut config = self.config.clone();
        if let Some(pages) = options.pages {
            config.pages = pages;
        }
        if let Some(password) = options.password {
            config.password = Some(password);
        }
        config
    }
}

#[async_trait]
impl HtmlConverter for PipelineConverter {
    fn kind(&self) -> ConverterKind {
        self.config.converter
    }

    async fn warm_up(&self) -> Result<(), Pdf2HtmlError> {
        if let Some(ref dir) = self.config.scratch_dir {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Pdf2HtmlError::InvalidConfig(format!(
                    "Cannot create scratch directory '{}': {e}",
                    dir.display()
                ))
            })?;
            info!("Scratch directory ready: {}", dir.display());
        }

        if self.config.converter.needs_pdfium() {
            let library = self.config.pdfium_library.clone();
            tokio::task::spawn_blocking(move || engine::probe_pdfium(library.as_deref()))
                .await
                .map_err(|e| Pdf2HtmlError::Internal(format!("pdfium probe panicked: {e}")))??;
        } else {
            let bin = engine::locate_pdf2htmlex(self.config.pdf2htmlex_bin.as_deref())?;
            info!("{} available ({})", engine::PDF2HTMLEX, bin.display());
        }
        Ok(())
    }

    async fn convert_bytes(
        &self,
        pdf: Vec<u8>,
        options: RequestOptions,
    ) -> Result<ConversionOutput, Pdf2HtmlError> {
        let config = self.config_for(options);
        convert_from_bytes(&pdf, &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_options_override_service_defaults() {
        let converter = PipelineConverter::new(
            ConversionConfig::builder()
                .pages(PageSelection::Range(1, 2))
                .build()
                .unwrap(),
        );

        let unchanged = converter.config_for(RequestOptions::default());
        assert_eq!(unchanged.pages, PageSelection::Range(1, 2));
        assert!(unchanged.password.is_none());

        let overridden = converter.config_for(RequestOptions {
            pages: Some(PageSelection::Single(3)),
            password: Some("pw".into()),
        });
        assert_eq!(overridden.pages, PageSelection::Single(3));
        assert_eq!(overridden.password.as_deref(), Some("pw"));
    }

    #[tokio::test]
    async fn warm_up_fails_without_pdf2htmlex() {
        let converter = PipelineConverter::new(
            ConversionConfig::builder()
                .converter(ConverterKind::Pdf2HtmlEx)
                .pdf2htmlex_bin("/no/such/pdf2htmlEX")
                .build()
                .unwrap(),
        );
        let err = converter.warm_up().await.unwrap_err();
        assert!(matches!(err, Pdf2HtmlError::ExternalToolMissing { .. }));
    }

    #[tokio::test]
    async fn warm_up_fails_for_missing_pdfium_library() {
        let converter = PipelineConverter::new(
            ConversionConfig::builder()
                .pdfium_library("/no/such/libpdfium.so")
                .build()
                .unwrap(),
        );
        let err = converter.warm_up().await.unwrap_err();
        assert!(matches!(err, Pdf2HtmlError::PdfiumBindingFailed(_)));
    }

    #[tokio::test]
    async fn warm_up_creates_scratch_dir() {
        let root = tempfile::tempdir().unwrap();
        let scratch = root.path().join("scratch");
        let converter = PipelineConverter::new(
            ConversionConfig::builder()
                .scratch_dir(&scratch)
                .pdfium_library("/no/such/libpdfium.so")
                .build()
                .unwrap(),
        );
        // The pdfium probe fails afterwards, but the directory exists.
        assert!(converter.warm_up().await.is_err());
        assert!(scratch.is_dir());
    }
}
