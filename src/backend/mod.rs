//! # Rendering Backend
//!
//! The drawing surface the parser and layout engine write into. It is a
//! flowing-cursor model: text is written at the current position, wraps at
//! the right margin, and breaks onto a new page when it would run past the
//! bottom margin.
//!
//! All coordinates are millimetres from the top-left corner of the page.
//! Font sizes are points.

use serde::Serialize;

use crate::font::{FontFamily, FontVariant};

/// Horizontal alignment of a cell or aligned text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// An RGB stroke color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Drawn on every page as it is closed, once installed.
pub type FooterFn = Box<dyn Fn(&mut dyn Backend)>;

/// Drawing primitives driven by the converter.
pub trait Backend {
    /// Close the current page (drawing its footer) and start a new one
    /// with the cursor at the top-left margin.
    fn add_page(&mut self);

    /// 1-based number of the current page; 0 before the first page.
    fn page_no(&self) -> usize;

    /// Page width and height.
    fn page_size(&self) -> (f64, f64);

    fn set_font(&mut self, family: FontFamily, variant: FontVariant, size: f64);

    /// Switch variant within the current family and size.
    fn set_font_variant(&mut self, variant: FontVariant);

    /// Flow text from the cursor, wrapping at the right margin and
    /// continuing at the left margin. `'\n'` forces a line break.
    fn write(&mut self, line_height: f64, text: &str);

    /// Wrap text to `width` (0 = full content width) and place each line
    /// with the given alignment. No paragraph indent is applied.
    fn write_aligned(&mut self, width: f64, line_height: f64, text: &str, align: Align);

    /// A block of lines inside a `width`-wide column starting at the cursor
    /// (0 = up to the right margin). Leaves the cursor at the left margin
    /// below the block.
    fn multi_cell(&mut self, width: f64, line_height: f64, text: &str, align: Align);

    /// A single-line cell at the cursor. Advances the cursor horizontally.
    fn cell(&mut self, width: f64, height: f64, text: &str, align: Align);

    /// Register a navigation entry on the current page. A negative `y`
    /// means the current cursor position.
    fn bookmark(&mut self, title: &str, level: usize, y: f64);

    fn set_margins(&mut self, left: f64, top: f64, right: f64);

    fn set_left_margin(&mut self, left: f64);

    fn left_margin(&self) -> f64;

    /// Move to the left margin and down by `height`.
    fn ln(&mut self, height: f64);

    fn x(&self) -> f64;

    fn y(&self) -> f64;

    /// A negative value is measured from the right edge.
    fn set_x(&mut self, x: f64);

    /// Also resets x to the left margin. A negative value is measured from
    /// the bottom edge.
    fn set_y(&mut self, y: f64);

    /// Width of `text` in the current font.
    fn string_width(&self, text: &str) -> f64;

    fn set_draw_color(&mut self, color: Color);

    fn set_line_width(&mut self, width: f64);

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64);

    fn set_footer(&mut self, footer: FooterFn);
}
