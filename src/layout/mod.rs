//! # Layout Engine
//!
//! The fixed page design of a converted book: the cover page, section
//! titles and subtitles, the epigraph and poem scopes, paragraph flow and
//! the page-number footer.
//!
//! Everything here draws through [`Backend`] and reads or updates the
//! [`RenderState`]; none of it looks at markup. Units are millimetres and
//! font sizes are points.

pub mod page_break;

use crate::backend::{Align, Backend, Color};
use crate::error::Result;
use crate::font::{FontFamily, FontVariant};
use crate::model::{DocumentMetadata, SubtitleBlock, TitleBlock};
use crate::style::{Alignment, RenderState};

use page_break::{decide_subtitle_break, BreakDecision, SUBTITLE_BOTTOM_GAP, SUBTITLE_LINE_HEIGHT};

pub const MARGIN_LEFT: f64 = 15.0;
pub const MARGIN_TOP: f64 = 15.0;
pub const MARGIN_RIGHT: f64 = 15.0;

pub const COMMON_FONT_SIZE: f64 = 15.0;
pub const COMMON_LINE_HEIGHT: f64 = 10.0;
pub const PARAGRAPH_GAP: f64 = 2.0;
pub const PARAGRAPH_INDENT: &str = "        ";

pub const TITLE_FONT_SIZE: f64 = 24.0;
pub const TITLE_LINE_HEIGHT: f64 = 20.0;
pub const TITLE_GAP: f64 = 10.0;

pub const SUBTITLE_FONT_SIZE: f64 = 22.0;
pub const SUBTITLE_TOP_GAP: f64 = 10.0;

const COVER_AUTHOR_SIZE: f64 = 30.0;
const COVER_TITLE_SIZE: f64 = 32.0;
const COVER_DATE_SIZE: f64 = 18.0;
const COVER_LINE_HEIGHT: f64 = 20.0;
const COVER_RULE_Y: f64 = 170.0;
const COVER_RULE_WIDTH: f64 = 10.0;

const FOOTER_FONT_SIZE: f64 = 12.0;

fn cover_rule_color() -> Color {
    Color::rgb8(200, 0, 0)
}

/// Back to the body font in the variant the flags call for.
pub fn set_body_font(backend: &mut dyn Backend, state: &RenderState) {
    backend.set_font(FontFamily::Common, state.font_variant(), COMMON_FONT_SIZE);
}

/// The cover: author, the title in capitals, a red rule across the page
/// and the date near the bottom. Always exactly one page.
pub fn compose_cover(meta: &DocumentMetadata, backend: &mut dyn Backend, state: &RenderState) {
    let (width, _) = backend.page_size();
    backend.add_page();

    backend.set_font(FontFamily::Cover, FontVariant::Regular, COVER_AUTHOR_SIZE);
    backend.set_y(50.0);
    backend.multi_cell(0.0, COVER_LINE_HEIGHT, &meta.author.to_string(), Align::Center);

    backend.set_font(FontFamily::Cover, FontVariant::Bold, COVER_TITLE_SIZE);
    backend.ln(30.0);
    backend.multi_cell(0.0, COVER_LINE_HEIGHT, &meta.title.to_uppercase(), Align::Center);

    backend.set_draw_color(cover_rule_color());
    backend.set_line_width(COVER_RULE_WIDTH);
    backend.line(-10.0, COVER_RULE_Y, width + 10.0, COVER_RULE_Y);

    backend.set_font(FontFamily::Common, FontVariant::Regular, COVER_DATE_SIZE);
    backend.set_y(-50.0);
    backend.multi_cell(0.0, COVER_LINE_HEIGHT, &meta.date, Align::Center);

    set_body_font(backend, state);
}

/// A section title on a fresh page, registered as a top-level bookmark
/// under its first paragraph.
pub fn render_title(title: &TitleBlock, backend: &mut dyn Backend, state: &RenderState) -> Result<()> {
    let lines = title.lines()?;
    backend.add_page();

    if let Some(first) = lines.first().filter(|l| !l.is_empty()) {
        let y = backend.y();
        backend.bookmark(first, 0, y);
    }

    backend.set_font(FontFamily::Title, FontVariant::Regular, TITLE_FONT_SIZE);
    for line in &lines {
        backend.write_aligned(0.0, TITLE_LINE_HEIGHT, line, Align::Center);
        backend.ln(TITLE_LINE_HEIGHT);
    }
    backend.ln(TITLE_GAP);
    set_body_font(backend, state);
    Ok(())
}

/// A subtitle in a centered column two thirds of the page wide,
/// registered as a second-level bookmark. Moves to a new page first when
/// it would be stranded at the bottom.
pub fn render_subtitle(
    subtitle: &SubtitleBlock,
    backend: &mut dyn Backend,
    state: &RenderState,
) -> Result<()> {
    let text = subtitle.plain_text()?;
    let (width, height) = backend.page_size();

    backend.set_font(FontFamily::Subtitle, FontVariant::Regular, SUBTITLE_FONT_SIZE);
    backend.ln(SUBTITLE_TOP_GAP);

    let decision = decide_subtitle_break(
        backend.y(),
        backend.string_width(&text),
        width,
        height,
        MARGIN_TOP,
    );
    if decision == BreakDecision::MoveToNextPage {
        backend.add_page();
    }

    let y = backend.y();
    backend.bookmark(&text, 1, y);
    backend.set_x(width / 6.0);
    backend.multi_cell(width * 2.0 / 3.0, SUBTITLE_LINE_HEIGHT, &text, Align::Center);
    backend.ln(SUBTITLE_BOTTOM_GAP);
    set_body_font(backend, state);
    Ok(())
}

/// Right-aligned italic text in the right two thirds of the page.
pub fn enter_epigraph(state: &mut RenderState, backend: &mut dyn Backend) {
    state.enter_scope(Some(backend.left_margin()));
    let (width, _) = backend.page_size();
    backend.set_left_margin(width / 3.0);
    state.alignment = Alignment::Right;
    state.set_italic(true, backend);
}

pub fn leave_epigraph(state: &mut RenderState, backend: &mut dyn Backend) {
    state.leave_scope(backend);
    backend.ln(COMMON_LINE_HEIGHT);
}

/// Centered italic verse. Margins are left alone.
pub fn enter_poem(state: &mut RenderState, backend: &mut dyn Backend) {
    state.enter_scope(None);
    state.alignment = Alignment::Center;
    state.set_italic(true, backend);
}

pub fn leave_poem(state: &mut RenderState, backend: &mut dyn Backend) {
    state.leave_scope(backend);
}

/// Write a run of character data. Whitespace-only runs are dropped. The
/// first run of a paragraph gets the indent in plain flow; aligned text
/// consumes the indent without drawing it.
pub fn write_text(text: &str, state: &mut RenderState, backend: &mut dyn Backend) {
    if text.trim().is_empty() {
        return;
    }
    let indent = state.take_indent();
    match state.alignment.to_align() {
        None if indent => {
            backend.write(COMMON_LINE_HEIGHT, &format!("{PARAGRAPH_INDENT}{text}"));
        }
        None => backend.write(COMMON_LINE_HEIGHT, text),
        Some(align) => backend.write_aligned(0.0, COMMON_LINE_HEIGHT, text, align),
    }
}

pub fn end_paragraph(backend: &mut dyn Backend) {
    backend.ln(COMMON_LINE_HEIGHT + PARAGRAPH_GAP);
}

pub fn end_stanza(backend: &mut dyn Backend) {
    backend.ln(COMMON_LINE_HEIGHT);
}

pub fn end_verse(backend: &mut dyn Backend) {
    backend.write(COMMON_LINE_HEIGHT, "\n");
}

/// Draw the page number centered at the bottom of every page closed from
/// now on.
pub fn install_footer(backend: &mut dyn Backend) {
    backend.set_footer(Box::new(|b: &mut dyn Backend| {
        let (width, _) = b.page_size();
        let label = b.page_no().to_string();
        b.set_font(FontFamily::Mono, FontVariant::Regular, FOOTER_FONT_SIZE);
        b.set_y(-15.0);
        b.set_x(width / 4.0);
        b.cell(width / 2.0, 10.0, &label, Align::Center);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Op, RecordingBackend};
    use crate::model::Author;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            author: Author {
                first_name: "Ivan".to_string(),
                middle_name: String::new(),
                last_name: "Petrov".to_string(),
            },
            title: "The Book".to_string(),
            date: "2001".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cover_sequence() {
        let mut backend = RecordingBackend::new();
        compose_cover(&metadata(), &mut backend, &RenderState::new());

        let ops = &backend.ops;
        assert_eq!(ops[0], Op::AddPage);
        assert_eq!(backend.page, 1);
        assert_eq!(
            backend.written(),
            ["Ivan Petrov", "THE BOOK", "2001"]
        );
        let line_at = ops.iter().position(|op| *op == Op::Line).unwrap();
        let date_at = ops
            .iter()
            .position(|op| *op == Op::MultiCell("2001".to_string(), Align::Center))
            .unwrap();
        assert!(line_at < date_at);
        assert_eq!(
            ops.last(),
            Some(&Op::SetFont(FontFamily::Common, FontVariant::Regular, COMMON_FONT_SIZE))
        );
    }

    #[test]
    fn test_title_opens_page_and_bookmarks_first_paragraph() {
        let mut backend = RecordingBackend::new();
        let title = TitleBlock {
            paragraphs: vec!["Part <strong>One</strong>".to_string(), "Beginnings".to_string()],
        };
        render_title(&title, &mut backend, &RenderState::new()).unwrap();

        assert_eq!(backend.ops[0], Op::AddPage);
        assert_eq!(backend.ops[1], Op::Bookmark("Part One".to_string(), 0));
        assert_eq!(
            backend.written(),
            ["Part One", "Beginnings"]
        );
        assert!(backend
            .ops
            .contains(&Op::WriteAligned("Beginnings".to_string(), Align::Center)));
    }

    #[test]
    fn test_empty_title_has_no_bookmark() {
        let mut backend = RecordingBackend::new();
        render_title(&TitleBlock::default(), &mut backend, &RenderState::new()).unwrap();
        assert_eq!(backend.ops[0], Op::AddPage);
        assert!(!backend.ops.iter().any(|op| matches!(op, Op::Bookmark(..))));
    }

    #[test]
    fn test_subtitle_breaks_before_drawing() {
        let mut backend = RecordingBackend::new();
        backend.y = 240.0;
        let sub = SubtitleBlock {
            text: "Chapter".to_string(),
        };
        render_subtitle(&sub, &mut backend, &RenderState::new()).unwrap();

        let page_at = backend.ops.iter().position(|op| *op == Op::AddPage).unwrap();
        let draw_at = backend
            .ops
            .iter()
            .position(|op| matches!(op, Op::MultiCell(..)))
            .unwrap();
        assert!(page_at < draw_at);
        assert!(backend.ops.contains(&Op::Bookmark("Chapter".to_string(), 1)));
    }

    #[test]
    fn test_subtitle_that_fits_stays() {
        let mut backend = RecordingBackend::new();
        backend.y = 100.0;
        let sub = SubtitleBlock {
            text: "Chapter".to_string(),
        };
        render_subtitle(&sub, &mut backend, &RenderState::new()).unwrap();
        assert!(!backend.ops.contains(&Op::AddPage));
        assert_eq!(backend.written(), ["Chapter"]);
    }

    #[test]
    fn test_epigraph_scope_round_trip() {
        let mut backend = RecordingBackend::new();
        let mut state = RenderState::new();
        enter_epigraph(&mut state, &mut backend);
        assert_eq!(backend.left_margin(), 70.0);
        assert_eq!(state.alignment, Alignment::Right);
        assert!(state.italic);

        leave_epigraph(&mut state, &mut backend);
        assert_eq!(backend.left_margin(), 15.0);
        assert_eq!(state.alignment, Alignment::None);
        assert!(!state.italic);
        assert_eq!(backend.ops.last(), Some(&Op::Ln(COMMON_LINE_HEIGHT)));
    }

    #[test]
    fn test_poem_keeps_margin() {
        let mut backend = RecordingBackend::new();
        let mut state = RenderState::new();
        enter_poem(&mut state, &mut backend);
        assert_eq!(state.alignment, Alignment::Center);
        leave_poem(&mut state, &mut backend);
        assert!(!backend.ops.iter().any(|op| matches!(op, Op::SetLeftMargin(_))));
        assert_eq!(state.alignment, Alignment::None);
    }

    #[test]
    fn test_indent_only_on_first_plain_run() {
        let mut backend = RecordingBackend::new();
        let mut state = RenderState::new();
        state.begin_paragraph();
        write_text("  \n ", &mut state, &mut backend);
        write_text("Once", &mut state, &mut backend);
        write_text(" upon", &mut state, &mut backend);
        assert_eq!(
            backend.written(),
            [format!("{PARAGRAPH_INDENT}Once"), " upon".to_string()]
        );
    }

    #[test]
    fn test_aligned_text_drops_indent() {
        let mut backend = RecordingBackend::new();
        let mut state = RenderState::new();
        state.alignment = Alignment::Center;
        state.begin_paragraph();
        write_text("verse", &mut state, &mut backend);
        assert!(!state.pending_indent);
        assert_eq!(backend.ops, [Op::WriteAligned("verse".to_string(), Align::Center)]);
    }

    #[test]
    fn test_footer_is_installed() {
        let mut backend = RecordingBackend::new();
        install_footer(&mut backend);
        assert!(backend.has_footer());
    }
}
