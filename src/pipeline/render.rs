//! pdfium extraction: open the document, read metadata and pull each
//! selected page's text, images and (optionally) raster.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-aware. All pdfium work happens inside one
//! `tokio::task::spawn_blocking` call per conversion so the runtime's worker
//! threads keep serving requests while a large document is processed.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 12,000 × 17,000 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded.

use crate::config::ConversionConfig;
use crate::engine;
use crate::error::{PageError, Pdf2HtmlError};
use crate::output::{DocumentMetadata, PageResult};
use crate::pipeline::encode;
use crate::pipeline::text::{self, TextSpan};
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// An embedded image placed in top-left origin page coordinates (points).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    pub data_url: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Everything the HTML generators need from one page.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Page box in points.
    pub width: f32,
    pub height: f32,
    pub spans: Vec<TextSpan>,
    pub images: Vec<PlacedImage>,
    /// PNG data URL of the whole page, when rasterisation was requested.
    pub raster: Option<String>,
}

impl PageContent {
    /// Bytes of text and image payload this page contributes.
    fn payload_len(&self) -> usize {
        self.spans.iter().map(|s| s.text.len()).sum::<usize>()
            + self.images.iter().map(|i| i.data_url.len()).sum::<usize>()
            + self.raster.as_ref().map_or(0, |r| r.len())
    }
}

/// What to pull out of each page.
#[derive(Clone)]
pub struct ExtractOptions {
    pub pdfium_library: Option<PathBuf>,
    pub password: Option<String>,
    pub embed_images: bool,
    /// `Some((dpi, max_pixels))` rasterises every page.
    pub raster: Option<(u32, u32)>,
    pub progress: Option<ProgressCallback>,
}

impl ExtractOptions {
    pub fn native(config: &ConversionConfig) -> Self {
        Self {
            pdfium_library: config.pdfium_library.clone(),
            password: config.password.clone(),
            embed_images: config.embed_images,
            raster: None,
            progress: config.progress_callback.clone(),
        }
    }

    pub fn overlay(config: &ConversionConfig) -> Self {
        Self {
            pdfium_library: config.pdfium_library.clone(),
            password: config.password.clone(),
            embed_images: false,
            raster: Some((config.dpi, config.max_rendered_pixels)),
            progress: config.progress_callback.clone(),
        }
    }
}

/// The result of walking the selected pages.
pub struct Extraction {
    pub metadata: DocumentMetadata,
    /// One entry per selected page, in page order. Successful pages carry
    /// their content; failed pages carry only the [`PageResult`] error.
    pub pages: Vec<(PageResult, Option<PageContent>)>,
}

/// Extract the pages chosen by `config.pages` from `pdf_path`.
pub async fn extract_pages(
    pdf_path: &Path,
    config: &ConversionConfig,
    options: ExtractOptions,
) -> Result<Extraction, Pdf2HtmlError> {
    let path = pdf_path.to_path_buf();
    let selection = config.pages.clone();

    tokio::task::spawn_blocking(move || {
        let pdfium = engine::bind_pdfium(options.pdfium_library.as_deref())?;
        let document = open_document(&pdfium, &path, options.password.as_deref())?;
        let metadata = read_metadata(&document);

        let indices = selection.to_indices(metadata.page_count);
        if indices.is_empty() {
            return Err(Pdf2HtmlError::PageOutOfRange {
                page: first_requested(&selection),
                total: metadata.page_count,
            });
        }
        debug!("Selected {} pages for conversion", indices.len());

        let pages = extract_pages_blocking(&document, &indices, &options);
        Ok(Extraction { metadata, pages })
    })
    .await
    .map_err(|e| Pdf2HtmlError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Extract document metadata from a PDF without touching page content.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
    pdfium_library: Option<&Path>,
) -> Result<DocumentMetadata, Pdf2HtmlError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());
    let library = pdfium_library.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        let pdfium = engine::bind_pdfium(library.as_deref())?;
        let document = open_document(&pdfium, &path, pwd.as_deref())?;
        Ok(read_metadata(&document))
    })
    .await
    .map_err(|e| Pdf2HtmlError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn first_requested(selection: &crate::config::PageSelection) -> usize {
    use crate::config::PageSelection;
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2HtmlError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2HtmlError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2HtmlError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2HtmlError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

fn read_metadata(document: &PdfDocument) -> DocumentMetadata {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    let page_count = document.pages().len() as usize;
    info!("PDF loaded: {} pages", page_count);

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count,
        pdf_version: format!("{:?}", document.version()),
    }
}

fn extract_pages_blocking(
    document: &PdfDocument,
    indices: &[usize],
    options: &ExtractOptions,
) -> Vec<(PageResult, Option<PageContent>)> {
    let total = indices.len();
    let progress = options.progress.as_ref();
    if let Some(cb) = progress {
        cb.on_conversion_start(total);
    }

    let mut results = Vec::with_capacity(total);
    for &idx in indices {
        let page_num = idx + 1;
        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }

        let start = Instant::now();
        let outcome = extract_page(document, idx, options);
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(content) => {
                if let Some(cb) = progress {
                    cb.on_page_complete(page_num, total, content.payload_len());
                }
                let result = PageResult {
                    page_num,
                    width: content.width,
                    height: content.height,
                    text_spans: content.spans.len(),
                    images: content.images.len() + usize::from(content.raster.is_some()),
                    error: None,
                    duration_ms,
                };
                results.push((result, Some(content)));
            }
            Err(err) => {
                warn!("{}", err);
                if let Some(cb) = progress {
                    cb.on_page_error(page_num, total, &err.to_string());
                }
                let result = PageResult {
                    page_num,
                    error: Some(err),
                    duration_ms,
                    ..Default::default()
                };
                results.push((result, None));
            }
        }
    }

    if let Some(cb) = progress {
        let ok = results.iter().filter(|(r, _)| r.error.is_none()).count();
        cb.on_conversion_complete(total, ok);
    }
    results
}

fn extract_page(
    document: &PdfDocument,
    idx: usize,
    options: &ExtractOptions,
) -> Result<PageContent, PageError> {
    let page_num = idx + 1;
    let page = document
        .pages()
        .get(idx as u16)
        .map_err(|e| PageError::LoadFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;

    let width = page.width().value;
    let height = page.height().value;

    let spans = text::extract_spans(&page).map_err(|e| PageError::TextFailed {
        page: page_num,
        detail: format!("{:?}", e),
    })?;

    let images = if options.embed_images {
        extract_images(document, &page, height, page_num)
    } else {
        Vec::new()
    };

    let raster = match options.raster {
        Some((dpi, max_pixels)) => Some(rasterise(&page, dpi, max_pixels).map_err(|detail| {
            PageError::RenderFailed {
                page: page_num,
                detail,
            }
        })?),
        None => None,
    };

    debug!(
        "Page {}: {}x{} pt, {} spans, {} images",
        page_num,
        width,
        height,
        spans.len(),
        images.len()
    );

    Ok(PageContent {
        page_num,
        width,
        height,
        spans,
        images,
        raster,
    })
}

/// Image objects on the page. Images that cannot be decoded or encoded are
/// skipped; they never fail the page.
fn extract_images(
    document: &PdfDocument,
    page: &PdfPage,
    page_height: f32,
    page_num: usize,
) -> Vec<PlacedImage> {
    let mut images = Vec::new();

    for object in page.objects().iter() {
        let Some(image_object) = object.as_image_object() else {
            continue;
        };

        let bounds = match object.bounds() {
            Ok(b) => b,
            Err(e) => {
                debug!("Page {}: image without bounds: {:?}", page_num, e);
                continue;
            }
        };

        let decoded = image_object
            .get_processed_image(document)
            .or_else(|_| image_object.get_raw_image());
        let data_url = match decoded
            .map_err(|e| format!("{:?}", e))
            .and_then(|img| encode::image_data_url(&img).map_err(|e| e.to_string()))
        {
            Ok(url) => url,
            Err(e) => {
                warn!("Page {}: skipping image: {}", page_num, e);
                continue;
            }
        };

        images.push(PlacedImage {
            data_url,
            left: bounds.left().value,
            top: page_height - bounds.top().value,
            width: bounds.right().value - bounds.left().value,
            height: bounds.top().value - bounds.bottom().value,
        });
    }

    images
}

/// Target raster width for a page `width_pt` points wide.
pub(crate) fn raster_width(width_pt: f32, dpi: u32, max_pixels: u32) -> i32 {
    let at_dpi = (width_pt * dpi as f32 / 72.0).round() as i32;
    at_dpi.clamp(1, max_pixels as i32)
}

fn rasterise(page: &PdfPage, dpi: u32, max_pixels: u32) -> Result<String, String> {
    let render_config = PdfRenderConfig::new()
        .set_target_width(raster_width(page.width().value, dpi, max_pixels))
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| format!("{:?}", e))?;
    let image = bitmap.as_image();
    debug!("Rendered page → {}x{} px", image.width(), image.height());

    encode::png_data_url(&image).map_err(|e| format!("PNG encoding failed: {}", e))
}
