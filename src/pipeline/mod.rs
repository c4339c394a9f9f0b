//! Pipeline stages for PDF-to-HTML conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the converters can share the stages they need.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌──▶ render ──▶ text/encode ──▶ html     (native, overlay)
//! input ─────┤    (pdfium)   (spans, data URLs)
//! (path/URL/ └──▶ external                            (pdf2htmlEX)
//!  bytes)
//! ```
//!
//! 1. [`input`]    — canonicalise a path, URL or byte buffer to a local file
//! 2. [`render`]   — open the document, read metadata, walk the selected pages
//!    inside `spawn_blocking`
//! 3. [`text`]     — positioned text spans and coordinate conversions
//! 4. [`encode`]   — images to base64 `data:` URLs
//! 5. [`html`]     — assemble the self-contained document
//! 6. [`external`] — hand the whole file to `pdf2htmlEX` instead

pub mod encode;
pub mod external;
pub mod html;
pub mod input;
pub mod render;
pub mod text;
