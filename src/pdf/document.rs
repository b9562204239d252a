//! # Flowing Document
//!
//! [`PdfDocument`] is the [`Backend`] the converter draws into. It keeps a
//! cursor, the current font and margins, and turns every drawing call into
//! positioned [`PageElement`]s on the current [`Page`]. Nothing is
//! serialized until [`PdfDocument::finish`].
//!
//! Text is placed the way a cell-based writer places it: a 1 mm inner
//! margin on each side of a cell, and the baseline at half the cell
//! height plus 30% of the font size. A cell that would cross the bottom
//! break margin moves to a new page first, keeping its horizontal
//! position.

use std::collections::BTreeSet;

use crate::backend::{Align, Backend, Color, FooterFn};
use crate::error::Result;
use crate::font::{FontContext, FontData, FontFamily, FontKey, FontVariant};
use crate::text::{break_into_lines, BrokenLine};

use super::{Bookmark, DocumentInfo, Page, PageElement, PdfWriter, PT_PER_MM};

/// A4 portrait, millimetres.
pub const A4: (f64, f64) = (210.0, 297.0);

/// Inner margin on each side of a cell.
const CELL_MARGIN: f64 = 1.0;

/// Distance from the bottom edge that triggers an automatic page break.
const BREAK_MARGIN: f64 = 20.0;

/// Margin used until `set_margins` is called.
const DEFAULT_MARGIN: f64 = 10.0;

/// Tolerance for floating point width comparisons.
const EPSILON: f64 = 1e-6;

pub struct PdfDocument {
    fonts: FontContext,
    page_width: f64,
    page_height: f64,
    pages: Vec<Page>,
    bookmarks: Vec<Bookmark>,
    info: DocumentInfo,

    left_margin: f64,
    top_margin: f64,
    right_margin: f64,

    x: f64,
    y: f64,
    font: FontKey,
    font_size: f64,
    draw_color: Color,
    line_width: f64,

    footer: Option<FooterFn>,
    in_footer: bool,
    page_open: bool,
    /// Characters drawn with a standard font that WinAnsi cannot encode.
    unencodable: BTreeSet<char>,
}

impl PdfDocument {
    pub fn new(fonts: FontContext) -> Self {
        Self {
            fonts,
            page_width: A4.0,
            page_height: A4.1,
            pages: Vec::new(),
            bookmarks: Vec::new(),
            info: DocumentInfo::default(),
            left_margin: DEFAULT_MARGIN,
            top_margin: DEFAULT_MARGIN,
            right_margin: DEFAULT_MARGIN,
            x: DEFAULT_MARGIN,
            y: DEFAULT_MARGIN,
            font: FontKey::new(FontFamily::Common, FontVariant::Regular),
            font_size: 12.0,
            draw_color: Color::BLACK,
            line_width: 0.2,
            footer: None,
            in_footer: false,
            page_open: false,
            unencodable: BTreeSet::new(),
        }
    }

    pub fn set_info(&mut self, info: DocumentInfo) {
        self.info = info;
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Run the footer on the open page. Calling it twice is harmless.
    pub fn close(&mut self) {
        if self.page_open {
            self.run_footer();
            self.page_open = false;
        }
    }

    /// Close the last page and serialize the whole document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            self.add_page();
        }
        self.close();
        if !self.unencodable.is_empty() {
            let chars: String = self.unencodable.iter().collect();
            tracing::warn!(
                count = self.unencodable.len(),
                "characters {chars:?} have no glyph in the standard fonts and are drawn as '?'; \
                 use a font directory to embed TrueType fonts"
            );
        }
        tracing::debug!(
            pages = self.pages.len(),
            bookmarks = self.bookmarks.len(),
            "serializing document"
        );
        Ok(PdfWriter::new().write(
            &self.pages,
            (self.page_width, self.page_height),
            &self.bookmarks,
            &self.info,
            &self.fonts,
        ))
    }

    fn run_footer(&mut self) {
        let Some(footer) = self.footer.take() else {
            return;
        };
        let (font, size, x, y) = (self.font, self.font_size, self.x, self.y);
        self.in_footer = true;
        footer(self as &mut dyn Backend);
        self.in_footer = false;
        self.font = font;
        self.font_size = size;
        self.x = x;
        self.y = y;
        self.footer = Some(footer);
    }

    /// Font size in millimetres.
    fn font_size_mm(&self) -> f64 {
        self.font_size / PT_PER_MM
    }

    fn break_lines(&self, text: &str, first_width: f64, width: f64) -> Vec<BrokenLine> {
        let size = self.font_size_mm();
        break_into_lines(text, first_width, width, |ch| {
            self.fonts.char_width(ch, self.font, size)
        })
    }

    /// Move to a new page if a cell of height `h` would cross the break
    /// margin. The horizontal position survives the break.
    fn ensure_room(&mut self, h: f64) {
        if !self.page_open {
            self.add_page();
        } else if !self.in_footer && self.y + h > self.page_height - BREAK_MARGIN {
            let x = self.x;
            self.add_page();
            self.x = x;
        }
    }

    /// Characters that will be replaced by `?` in the output.
    pub fn unencodable_chars(&self) -> &BTreeSet<char> {
        &self.unencodable
    }

    fn put_text(&mut self, x: f64, cell_height: f64, text: &str) {
        if matches!(self.fonts.resolve(self.font), FontData::Standard(_)) {
            self.unencodable.extend(
                text.chars()
                    .filter(|&ch| !ch.is_control() && PdfWriter::unicode_to_winansi(ch).is_none()),
            );
        }
        let baseline = self.y + 0.5 * cell_height + 0.3 * self.font_size_mm();
        let element = PageElement::Text {
            x,
            y: baseline,
            font: self.font,
            size: self.font_size,
            text: text.to_string(),
        };
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    /// X of a line of width `line_width` aligned inside a cell.
    fn aligned_x(cell_x: f64, cell_width: f64, line_width: f64, align: Align) -> f64 {
        match align {
            Align::Left => cell_x + CELL_MARGIN,
            Align::Center => cell_x + (cell_width - line_width) / 2.0,
            Align::Right => cell_x + cell_width - CELL_MARGIN - line_width,
        }
    }

    fn content_width(&self) -> f64 {
        self.page_width - self.left_margin - self.right_margin
    }
}

impl Backend for PdfDocument {
    fn add_page(&mut self) {
        if self.page_open {
            self.run_footer();
        }
        self.pages.push(Page::default());
        self.page_open = true;
        self.x = self.left_margin;
        self.y = self.top_margin;
        tracing::debug!(page = self.pages.len(), "opened page");
    }

    fn page_no(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }

    fn set_font(&mut self, family: FontFamily, variant: FontVariant, size: f64) {
        self.font = FontKey::new(family, variant);
        self.font_size = size;
    }

    fn set_font_variant(&mut self, variant: FontVariant) {
        self.font = FontKey::new(self.font.family, variant);
    }

    fn write(&mut self, line_height: f64, text: &str) {
        let right = self.page_width - self.right_margin;
        let first = (right - self.x - 2.0 * CELL_MARGIN).max(0.0);
        let full = (self.content_width() - 2.0 * CELL_MARGIN).max(0.0);

        for (i, line) in self.break_lines(text, first, full).iter().enumerate() {
            if i > 0 {
                self.x = self.left_margin;
                self.y += line_height;
            }
            if line.text.is_empty() {
                continue;
            }
            self.ensure_room(line_height);
            self.put_text(self.x + CELL_MARGIN, line_height, &line.text);
            self.x += line.width + 2.0 * CELL_MARGIN;
        }
    }

    fn write_aligned(&mut self, width: f64, line_height: f64, text: &str, align: Align) {
        let width = if width <= 0.0 {
            self.content_width()
        } else {
            width
        };
        let wrap = (width - 2.0 * CELL_MARGIN).max(0.0);
        let right = self.page_width - self.right_margin;
        let origin = self.left_margin;

        for (i, line) in self.break_lines(text, wrap, wrap).iter().enumerate() {
            if i > 0 {
                self.ln(line_height);
            }
            if line.text.is_empty() {
                continue;
            }
            let target = Self::aligned_x(origin, width, line.width, align) - CELL_MARGIN;
            if self.x > target && self.x + line.width + 2.0 * CELL_MARGIN > right + EPSILON {
                self.ln(line_height);
            }
            self.x = self.x.max(target);
            self.ensure_room(line_height);
            self.put_text(self.x + CELL_MARGIN, line_height, &line.text);
            self.x += line.width + 2.0 * CELL_MARGIN;
        }
    }

    fn multi_cell(&mut self, width: f64, line_height: f64, text: &str, align: Align) {
        let width = if width <= 0.0 {
            self.page_width - self.right_margin - self.x
        } else {
            width
        };
        let wrap = (width - 2.0 * CELL_MARGIN).max(0.0);

        for line in self.break_lines(text, wrap, wrap) {
            self.ensure_room(line_height);
            if !line.text.is_empty() {
                let x = Self::aligned_x(self.x, width, line.width, align);
                self.put_text(x, line_height, &line.text);
            }
            self.y += line_height;
        }
        self.x = self.left_margin;
    }

    fn cell(&mut self, width: f64, height: f64, text: &str, align: Align) {
        let width = if width <= 0.0 {
            self.page_width - self.right_margin - self.x
        } else {
            width
        };
        self.ensure_room(height);
        if !text.is_empty() {
            let size = self.font_size_mm();
            let text_width = self.fonts.measure_string(text, self.font, size);
            let x = Self::aligned_x(self.x, width, text_width, align);
            self.put_text(x, height, text);
        }
        self.x += width;
    }

    fn bookmark(&mut self, title: &str, level: usize, y: f64) {
        let y = if y < 0.0 { self.y } else { y };
        let page_index = self.pages.len().saturating_sub(1);
        tracing::debug!(title, level, page = page_index + 1, "bookmark");
        self.bookmarks.push(Bookmark {
            title: title.to_string(),
            level,
            page_index,
            y,
        });
    }

    fn set_margins(&mut self, left: f64, top: f64, right: f64) {
        self.left_margin = left;
        self.top_margin = top;
        self.right_margin = right;
    }

    fn set_left_margin(&mut self, left: f64) {
        self.left_margin = left;
        if self.page_open && self.x < left {
            self.x = left;
        }
    }

    fn left_margin(&self) -> f64 {
        self.left_margin
    }

    fn ln(&mut self, height: f64) {
        self.x = self.left_margin;
        self.y += height;
    }

    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }

    fn set_x(&mut self, x: f64) {
        self.x = if x >= 0.0 { x } else { self.page_width + x };
    }

    fn set_y(&mut self, y: f64) {
        self.x = self.left_margin;
        self.y = if y >= 0.0 { y } else { self.page_height + y };
    }

    fn string_width(&self, text: &str) -> f64 {
        self.fonts
            .measure_string(text, self.font, self.font_size_mm())
    }

    fn set_draw_color(&mut self, color: Color) {
        self.draw_color = color;
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        if !self.page_open {
            self.add_page();
        }
        let element = PageElement::Line {
            x1,
            y1,
            x2,
            y2,
            color: self.draw_color,
            width: self.line_width,
        };
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn set_footer(&mut self, footer: FooterFn) {
        self.footer = Some(footer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> PdfDocument {
        let mut doc = PdfDocument::new(FontContext::new());
        doc.set_margins(15.0, 15.0, 15.0);
        doc.set_font(FontFamily::Common, FontVariant::Regular, 15.0);
        doc
    }

    fn page_texts(doc: &PdfDocument, index: usize) -> Vec<String> {
        doc.pages()[index].texts().map(str::to_string).collect()
    }

    fn text_positions(doc: &PdfDocument, index: usize) -> Vec<(f64, f64)> {
        doc.pages()[index]
            .elements
            .iter()
            .filter_map(|e| match e {
                PageElement::Text { x, y, .. } => Some((*x, *y)),
                PageElement::Line { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_write_flows_after_previous_run() {
        let mut doc = document();
        doc.add_page();
        doc.write(10.0, "Hello ");
        let x_after = doc.x();
        doc.write(10.0, "world");
        let positions = text_positions(&doc, 0);
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].1, positions[1].1);
        assert!((positions[1].0 - (x_after + CELL_MARGIN)).abs() < EPSILON);
    }

    #[test]
    fn test_write_wraps_to_left_margin() {
        let mut doc = document();
        doc.add_page();
        let long = "word ".repeat(60);
        doc.write(10.0, &long);
        let positions = text_positions(&doc, 0);
        assert!(positions.len() > 1);
        assert!((positions[1].0 - (15.0 + CELL_MARGIN)).abs() < EPSILON);
        assert!((positions[1].1 - positions[0].1 - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_auto_page_break() {
        let mut doc = document();
        doc.add_page();
        doc.set_y(270.0);
        doc.write(10.0, "bottom");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(page_texts(&doc, 1), ["bottom"]);
    }

    #[test]
    fn test_multi_cell_centers_and_resets_x() {
        let mut doc = document();
        doc.add_page();
        doc.set_x(100.0);
        doc.multi_cell(0.0, 20.0, "AB", Align::Center);
        assert_eq!(doc.x(), 15.0);
        assert_eq!(doc.y(), 35.0);
        let (x, _) = text_positions(&doc, 0)[0];
        let width = doc.string_width("AB");
        assert!((x - (100.0 + (95.0 - width) / 2.0)).abs() < EPSILON);
    }

    #[test]
    fn test_write_aligned_right() {
        let mut doc = document();
        doc.add_page();
        doc.write_aligned(0.0, 10.0, "right", Align::Right);
        let (x, _) = text_positions(&doc, 0)[0];
        let width = doc.string_width("right");
        assert!((x - (195.0 - CELL_MARGIN - width)).abs() < EPSILON);
    }

    #[test]
    fn test_set_y_negative_measures_from_bottom() {
        let mut doc = document();
        doc.add_page();
        doc.set_x(50.0);
        doc.set_y(-15.0);
        assert_eq!(doc.y(), 282.0);
        assert_eq!(doc.x(), 15.0);
    }

    #[test]
    fn test_footer_runs_on_close_and_restores_cursor() {
        let mut doc = document();
        doc.add_page();
        doc.set_footer(Box::new(|b: &mut dyn Backend| {
            b.set_font(FontFamily::Mono, FontVariant::Regular, 12.0);
            b.set_y(-15.0);
            let label = b.page_no().to_string();
            b.cell(0.0, 10.0, &label, Align::Center);
        }));
        doc.write(10.0, "body");
        let (x, y) = (doc.x(), doc.y());
        doc.add_page();
        assert_eq!(page_texts(&doc, 0), ["body", "1"]);
        assert_eq!(doc.y(), 15.0);
        doc.write(10.0, "next");
        doc.close();
        doc.close();
        assert_eq!(page_texts(&doc, 1), ["next", "2"]);
        assert!(x > 15.0 && y == 15.0);
    }

    #[test]
    fn test_footer_never_breaks_page() {
        let mut doc = document();
        doc.add_page();
        doc.set_footer(Box::new(|b: &mut dyn Backend| {
            b.set_y(-5.0);
            b.cell(0.0, 10.0, "footer", Align::Center);
        }));
        doc.close();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_bookmark_uses_current_page() {
        let mut doc = document();
        doc.add_page();
        doc.add_page();
        doc.bookmark("Chapter", 0, -1.0);
        assert_eq!(doc.bookmarks()[0].page_index, 1);
        assert_eq!(doc.bookmarks()[0].y, 15.0);
    }

    #[test]
    fn test_line_records_color_and_width() {
        let mut doc = document();
        doc.add_page();
        doc.set_draw_color(Color::rgb8(200, 0, 0));
        doc.set_line_width(10.0);
        doc.line(-10.0, 170.0, 220.0, 170.0);
        match &doc.pages()[0].elements[0] {
            PageElement::Line { color, width, .. } => {
                assert_eq!(*color, Color::rgb8(200, 0, 0));
                assert_eq!(*width, 10.0);
            }
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn test_finish_empty_document_has_one_page() {
        let bytes = document().finish().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.7"));
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn test_unencodable_characters_are_collected() {
        let mut doc = document();
        doc.add_page();
        doc.write(10.0, "Caf\u{e9} \u{201c}ok\u{201d} \u{41f}\u{440}\u{438}");
        let chars: String = doc.unencodable_chars().iter().collect();
        assert_eq!(chars, "\u{41f}\u{438}\u{440}");
    }
}
