//! # fb2pdf
//!
//! Converts FictionBook (FB2) e-books into paginated, styled PDF.
//!
//! A book is read as a stream of XML events. Most events only toggle
//! style (bold, italic, alignment, indent) or flow text onto the page.
//! Titles, subtitles and the book description are decoded whole and laid
//! out as blocks: a cover page, titles on fresh pages, subtitles that
//! avoid the bottom of a page, bookmarks for both. The description's
//! annotation is fed back through the same parser as ordinary content.
//!
//! ## Architecture
//!
//! ```text
//! FB2 bytes
//!       ↓
//!   [parser]   : XML events → style changes and drawing calls
//!       ↓            ↘ [model]  : title / subtitle / description records
//!   [style]    : bold, italic, alignment, indent
//!   [layout]   : cover, titles, subtitles, scopes, footer, page breaks
//!       ↓
//!   [backend]  : flowing-cursor drawing surface (trait)
//!       ↓
//!   [pdf]      : PdfDocument pages → PDF bytes
//! ```
//!
//! [`Converter`] ties a run together and writes the result atomically.

pub mod backend;
pub mod convert;
pub mod error;
pub mod font;
pub mod layout;
pub mod model;
pub mod parser;
pub mod pdf;
pub mod style;
pub mod text;

pub use convert::{default_output_path, Conversion, ConversionReport, ConvertOptions, Converter};
pub use error::{ConvertError, Phase, Result};

/// Convert an in-memory book to PDF bytes with default options.
pub fn render(source: &[u8]) -> Result<Vec<u8>> {
    Converter::new(ConvertOptions::default())
        .convert_bytes(source)?
        .document
        .finish()
}
