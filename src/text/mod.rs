//! # Text Layout
//!
//! Greedy line breaking at UAX#14 break opportunities.
//!
//! The breaker is unit-agnostic: widths come from a measuring closure, so
//! the document builder can feed it millimetres while tests feed it plain
//! character counts.

use unicode_linebreak::{linebreaks, BreakOpportunity};

/// A line of text after line-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    pub text: String,
    /// Width of the line. Trailing spaces are excluded on lines that end
    /// in a wrap, and kept on the final line so a following text run
    /// starts after them.
    pub width: f64,
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Entry `i` is the opportunity *before* `chars[i]`. Index 0 is always
/// `None`.
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    // linebreaks() yields byte offsets of the start of the next segment.
    let byte_to_char: Vec<usize> = {
        let mut map = vec![0usize; text.len() + 1];
        let mut char_idx = 0;
        for (byte_idx, _) in text.char_indices() {
            map[byte_idx] = char_idx;
            char_idx += 1;
        }
        map[text.len()] = char_idx;
        map
    };

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx > 0 && char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }

    result
}

/// Break `text` into lines.
///
/// The first line gets `first_width` (the space left on a partially
/// filled line), later lines get `width`. `'\n'` forces a break. When the
/// first word does not fit into a partial first line, that line is
/// returned empty and the word starts the next one.
pub fn break_into_lines<F>(text: &str, first_width: f64, width: f64, measure: F) -> Vec<BrokenLine>
where
    F: Fn(char) -> f64,
{
    let mut lines = Vec::new();
    for segment in text.split('\n') {
        let segment = segment.trim_end_matches('\r');
        break_segment(segment, first_width, width, &measure, &mut lines);
    }
    lines
}

fn break_segment<F>(
    text: &str,
    first_width: f64,
    width: f64,
    measure: &F,
    lines: &mut Vec<BrokenLine>,
) where
    F: Fn(char) -> f64,
{
    let chars: Vec<char> = text.chars().collect();
    let widths: Vec<f64> = chars.iter().map(|&c| measure(c)).collect();
    let opps = compute_break_opportunities(text);

    let mut line_start = 0;
    let mut line_width = 0.0;
    let mut last_break: Option<usize> = None;
    let mut i = 0;

    while i < chars.len() {
        let limit = if lines.is_empty() { first_width } else { width };

        if i > line_start && opps[i].is_some() {
            last_break = Some(i);
        }

        let w = widths[i];
        if line_width + w > limit && !chars[i].is_whitespace() {
            if let Some(bp) = last_break.filter(|&bp| bp > line_start) {
                lines.push(make_line(&chars[line_start..bp], &widths[line_start..bp], true));
                line_start = bp;
                line_width = widths[bp..i].iter().sum();
                last_break = None;
                continue;
            }
            if lines.is_empty() && first_width < width {
                lines.push(BrokenLine {
                    text: String::new(),
                    width: 0.0,
                });
                continue;
            }
            if i > line_start {
                lines.push(make_line(&chars[line_start..i], &widths[line_start..i], true));
                line_start = i;
                line_width = 0.0;
                last_break = None;
                continue;
            }
        }

        line_width += w;
        i += 1;
    }

    lines.push(make_line(&chars[line_start..], &widths[line_start..], false));
}

fn make_line(chars: &[char], widths: &[f64], trim_trailing: bool) -> BrokenLine {
    let mut end = chars.len();
    if trim_trailing {
        while end > 0 && chars[end - 1].is_whitespace() {
            end -= 1;
        }
    }
    BrokenLine {
        text: chars[..end].iter().collect(),
        width: widths[..end].iter().sum(),
    }
}
