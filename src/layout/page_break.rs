//! # Page Break Decisions
//!
//! Titles always start a page. Subtitles only move to a new page when the
//! subtitle and a little of the text after it would not fit on the
//! current one, so a subtitle is never left stranded at the bottom.

/// What to do with a block before drawing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// Draw it on the current page.
    Place,
    /// Open a new page first.
    MoveToNextPage,
}

/// Line height of a subtitle.
pub const SUBTITLE_LINE_HEIGHT: f64 = 15.0;

/// Gap below a subtitle.
pub const SUBTITLE_BOTTOM_GAP: f64 = 5.0;

/// Body text that must fit below a subtitle on the same page.
pub const SUBTITLE_MIN_SPACE_AFTER: f64 = 35.0;

/// Estimated number of lines `text_width` wraps to in a column two thirds
/// of the page wide. Never less than one.
pub fn estimated_subtitle_lines(text_width: f64, page_width: f64) -> f64 {
    let column = page_width * 2.0 / 3.0;
    (text_width / column).ceil().max(1.0)
}

/// Decide whether a subtitle starting at `y` fits on the current page.
///
/// The estimate is `lines × line height + bottom gap + minimum space
/// after`, compared against the page height less the top margin.
pub fn decide_subtitle_break(
    y: f64,
    text_width: f64,
    page_width: f64,
    page_height: f64,
    top_margin: f64,
) -> BreakDecision {
    let lines = estimated_subtitle_lines(text_width, page_width);
    let needed = lines * SUBTITLE_LINE_HEIGHT + SUBTITLE_BOTTOM_GAP + SUBTITLE_MIN_SPACE_AFTER;
    if y + needed > page_height - top_margin {
        BreakDecision::MoveToNextPage
    } else {
        BreakDecision::Place
    }
}
