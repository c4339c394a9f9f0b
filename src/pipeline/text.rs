//! Positioned text extraction.
//!
//! pdfium groups characters that share a font and baseline into text
//! segments. Each non-blank segment becomes one [`TextSpan`] carrying its
//! box in PDF user space (points, origin bottom-left), the font size and the
//! fill colour of its first character. The HTML generators convert these
//! boxes into their own coordinate systems.

use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Default size when a segment exposes no character metrics.
const FALLBACK_FONT_SIZE: f32 = 12.0;

/// A run of text positioned on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Sanitised text; never empty.
    pub text: String,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
    /// Font size in points.
    pub font_size: f32,
    /// Fill colour as RGB.
    pub color: [u8; 3],
}

/// Box of a span in a top-left origin system, in points (1 pt renders as 1 px).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub left: f32,
    pub top: f32,
}

/// Box of a span as percentages of the page size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl TextSpan {
    /// Position in a top-left origin page of height `page_height`.
    pub fn pixel_box(&self, page_height: f32) -> PixelBox {
        PixelBox {
            left: self.left,
            top: page_height - self.top,
        }
    }

    /// Position and size relative to the page, in percent.
    ///
    /// Returns `None` for a degenerate page box.
    pub fn percent_box(&self, page_width: f32, page_height: f32) -> Option<PercentBox> {
        if page_width <= 0.0 || page_height <= 0.0 {
            return None;
        }
        Some(PercentBox {
            left: self.left / page_width * 100.0,
            top: (page_height - self.top) / page_height * 100.0,
            width: (self.right - self.left) / page_width * 100.0,
            height: (self.top - self.bottom) / page_height * 100.0,
        })
    }

    /// Colour as a `#rrggbb` CSS value.
    pub fn css_color(&self) -> String {
        let [r, g, b] = self.color;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// Collapse whitespace runs to a single space and trim.
pub fn sanitize_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Extract the positioned text spans of one page.
pub fn extract_spans(page: &PdfPage) -> Result<Vec<TextSpan>, PdfiumError> {
    let text = page.text()?;
    let mut spans = Vec::new();

    for segment in text.segments().iter() {
        let content = sanitize_text(&segment.text());
        if content.is_empty() {
            continue;
        }

        let bounds = segment.bounds();
        let (font_size, color) = segment
            .chars()
            .ok()
            .and_then(|chars| {
                chars.iter().next().map(|ch| {
                    let color = ch
                        .fill_color()
                        .map(|c| [c.red(), c.green(), c.blue()])
                        .unwrap_or([0, 0, 0]);
                    (ch.scaled_font_size().value, color)
                })
            })
            .unwrap_or((0.0, [0, 0, 0]));

        let height = bounds.top().value - bounds.bottom().value;
        let font_size = if font_size > 0.0 {
            font_size
        } else if height > 0.0 {
            height
        } else {
            FALLBACK_FONT_SIZE
        };

        spans.push(TextSpan {
            text: content,
            left: bounds.left().value,
            bottom: bounds.bottom().value,
            right: bounds.right().value,
            top: bounds.top().value,
            font_size,
            color,
        });
    }

    Ok(spans)
}
