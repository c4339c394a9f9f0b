//! Configuration types for PDF-to-HTML conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across request handlers and to log the
//! effective settings at startup.

use crate::error::Pdf2HtmlError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for a PDF-to-HTML conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2html::{ConversionConfig, ConverterKind};
///
/// let config = ConversionConfig::builder()
///     .converter(ConverterKind::Overlay)
///     .dpi(200)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Which conversion backend produces the HTML. Default: [`ConverterKind::Native`].
    pub converter: ConverterKind,

    /// Rendering DPI used when rasterising pages for the overlay converter.
    /// Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Caps either dimension independently of DPI, so an A0 poster cannot
    /// allocate a 12 000 × 17 000 px bitmap.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Title written into the HTML `<title>`. Falls back to the document
    /// title, then to `"PDF Document"`.
    pub title: Option<String>,

    /// Embed image objects in native output. Default: true.
    pub embed_images: bool,

    /// Font-size multiplier applied by the overlay converter. Default: 0.8.
    pub font_scale: f32,

    /// Whole-conversion deadline in seconds; 0 disables it. Default: 0.
    pub timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Directory for spooled uploads and external-tool output.
    /// `None` uses the system temp directory.
    pub scratch_dir: Option<PathBuf>,

    /// Explicit pdfium shared library. `None` runs the usual lookup.
    pub pdfium_library: Option<PathBuf>,

    /// Explicit `pdf2htmlEX` executable. `None` searches `PATH`.
    pub pdf2htmlex_bin: Option<PathBuf>,

    /// Extra arguments passed verbatim to `pdf2htmlEX`.
    pub tool_args: Vec<String>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            converter: ConverterKind::default(),
            dpi: 150,
            max_rendered_pixels: 2000,
            password: None,
            pages: PageSelection::default(),
            title: None,
            embed_images: true,
            font_scale: 0.8,
            timeout_secs: 0,
            download_timeout_secs: 120,
            scratch_dir: None,
            pdfium_library: None,
            pdf2htmlex_bin: None,
            tool_args: Vec::new(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("converter", &self.converter)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("title", &self.title)
            .field("embed_images", &self.embed_images)
            .field("font_scale", &self.font_scale)
            .field("timeout_secs", &self.timeout_secs)
            .field("scratch_dir", &self.scratch_dir)
            .field("pdfium_library", &self.pdfium_library)
            .field("pdf2htmlex_bin", &self.pdf2htmlex_bin)
            .field("tool_args", &self.tool_args)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The conversion deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn converter(mut self, kind: ConverterKind) -> Self {
        self.config.converter = kind;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn embed_images(mut self, v: bool) -> Self {
        self.config.embed_images = v;
        self
    }

    pub fn font_scale(mut self, scale: f32) -> Self {
        self.config.font_scale = scale;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn pdf2htmlex_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdf2htmlex_bin = Some(path.into());
        self
    }

    pub fn tool_args(mut self, args: Vec<String>) -> Self {
        self.config.tool_args = args;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2HtmlError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(Pdf2HtmlError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if !(c.font_scale.is_finite() && c.font_scale > 0.0) {
            return Err(Pdf2HtmlError::InvalidConfig(format!(
                "Font scale must be > 0, got {}",
                c.font_scale
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The backend that turns a PDF into HTML.
///
/// | Kind | Output |
/// |------|--------|
/// | `Native` | absolutely positioned text spans (px) plus embedded images |
/// | `Overlay` | page raster with a selectable, percentage-positioned text layer |
/// | `Pdf2HtmlEx` | whatever the external `pdf2htmlEX` tool produces |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    #[default]
    Native,
    /// The "alternative" converter.
    Overlay,
    Pdf2HtmlEx,
}

impl ConverterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConverterKind::Native => "native",
            ConverterKind::Overlay => "overlay",
            ConverterKind::Pdf2HtmlEx => "pdf2htmlex",
        }
    }

    /// Whether this backend needs the pdfium shared library.
    pub fn needs_pdfium(&self) -> bool {
        !matches!(self, ConverterKind::Pdf2HtmlEx)
    }
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConverterKind {
    type Err = Pdf2HtmlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" | "pdfium" => Ok(ConverterKind::Native),
            "overlay" | "alternative" => Ok(ConverterKind::Overlay),
            "pdf2htmlex" => Ok(ConverterKind::Pdf2HtmlEx),
            other => Err(Pdf2HtmlError::InvalidConfig(format!(
                "Unknown converter '{other}' (expected native, overlay or pdf2htmlex)"
            ))),
        }
    }
}

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The selection as an inclusive `(first, last)` 1-indexed span, when it
    /// is contiguous. `All` yields `None` for both bounds.
    pub fn as_span(&self) -> Option<(Option<usize>, Option<usize>)> {
        match self {
            PageSelection::All => Some((None, None)),
            PageSelection::Single(p) => Some((Some(*p), Some(*p))),
            PageSelection::Range(a, b) => Some((Some(*a), Some(*b))),
            PageSelection::Set(pages) => {
                let mut sorted = pages.clone();
                sorted.sort_unstable();
                sorted.dedup();
                let first = *sorted.first()?;
                let last = *sorted.last()?;
                (last - first + 1 == sorted.len()).then_some((Some(first), Some(last)))
            }
        }
    }
}

/// Parses `all`, `5`, `3-15` or `1,3,5,7`.
impl FromStr for PageSelection {
    type Err = Pdf2HtmlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let invalid = |msg: String| Pdf2HtmlError::InvalidConfig(msg);
        let parse_page = |p: &str| -> Result<usize, Pdf2HtmlError> {
            let n: usize = p
                .trim()
                .parse()
                .map_err(|_| invalid(format!("Invalid page number: '{}'", p.trim())))?;
            if n < 1 {
                return Err(invalid(format!("Pages are 1-indexed, minimum is 1 (got {n})")));
            }
            Ok(n)
        };

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        // Range: "3-15"
        if let Some((start, end)) = s.split_once('-') {
            let start = parse_page(start)?;
            let end = parse_page(end)?;
            if start > end {
                return Err(invalid(format!(
                    "Invalid page range '{start}-{end}': start must be <= end"
                )));
            }
            return Ok(PageSelection::Range(start, end));
        }

        // Set: "1,3,5,7"
        if s.contains(',') {
            let pages = s
                .split(',')
                .map(&parse_page)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }

        Ok(PageSelection::Single(parse_page(&s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.converter, ConverterKind::Native);
        assert_eq!(c.dpi, 150);
        assert_eq!(c.max_rendered_pixels, 2000);
        assert!(c.embed_images);
        assert!((c.font_scale - 0.8).abs() < f32::EPSILON);
        assert!(c.timeout().is_none());
    }

    #[test]
    fn builder_clamps_dpi_and_pixels() {
        let c = ConversionConfig::builder()
            .dpi(1000)
            .max_rendered_pixels(5)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 400);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn builder_rejects_non_positive_font_scale() {
        let err = ConversionConfig::builder().font_scale(0.0).build().unwrap_err();
        assert!(matches!(err, Pdf2HtmlError::InvalidConfig(_)));
    }

    #[test]
    fn timeout_is_enabled_by_positive_secs() {
        let c = ConversionConfig::builder().timeout_secs(30).build().unwrap();
        assert_eq!(c.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn converter_kind_parses_aliases() {
        assert_eq!("native".parse::<ConverterKind>().unwrap(), ConverterKind::Native);
        assert_eq!("Alternative".parse::<ConverterKind>().unwrap(), ConverterKind::Overlay);
        assert_eq!("overlay".parse::<ConverterKind>().unwrap(), ConverterKind::Overlay);
        assert_eq!(
            " pdf2htmlEX ".parse::<ConverterKind>().unwrap(),
            ConverterKind::Pdf2HtmlEx
        );
        assert!("poppler".parse::<ConverterKind>().is_err());
    }

    #[test]
    fn converter_kind_serialises_lowercase() {
        let json = serde_json::to_string(&ConverterKind::Pdf2HtmlEx).unwrap();
        assert_eq!(json, "\"pdf2htmlex\"");
        assert_eq!(ConverterKind::Overlay.to_string(), "overlay");
    }

    #[test]
    fn page_selection_parses_all_forms() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("5".parse::<PageSelection>().unwrap(), PageSelection::Single(5));
        assert_eq!(
            "3-15".parse::<PageSelection>().unwrap(),
            PageSelection::Range(3, 15)
        );
        assert_eq!(
            "1, 3,5".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
    }

    #[test]
    fn page_selection_rejects_bad_input() {
        assert!("0".parse::<PageSelection>().is_err());
        assert!("5-3".parse::<PageSelection>().is_err());
        assert!("1,x".parse::<PageSelection>().is_err());
        assert!("abc".parse::<PageSelection>().is_err());
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(4, 10).to_indices(5), vec![3, 4]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }

    #[test]
    fn contiguous_spans() {
        assert_eq!(PageSelection::All.as_span(), Some((None, None)));
        assert_eq!(PageSelection::Single(2).as_span(), Some((Some(2), Some(2))));
        assert_eq!(
            PageSelection::Set(vec![4, 2, 3]).as_span(),
            Some((Some(2), Some(4)))
        );
        assert_eq!(PageSelection::Set(vec![1, 3]).as_span(), None);
        assert_eq!(PageSelection::Set(vec![]).as_span(), None);
    }
}
