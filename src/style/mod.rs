//! # Style State
//!
//! The emphasis flags, alignment mode and paragraph indent that the parser
//! toggles as it walks the book. Every flag change immediately re-selects
//! the font variant on the backend, so the active variant always matches
//! `(bold, italic)`.
//!
//! Flags are plain booleans. `<strong><strong>a</strong>b</strong>` clears
//! bold at the first `</strong>`, and `b` is drawn regular.

use std::collections::BTreeSet;

use crate::backend::{Align, Backend};
use crate::font::FontVariant;

/// How character data is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    /// Plain left-flowing text with paragraph indent.
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    /// The aligned-writing mode, or `None` for plain flow.
    pub fn to_align(self) -> Option<Align> {
        match self {
            Alignment::None => None,
            Alignment::Left => Some(Align::Left),
            Alignment::Center => Some(Align::Center),
            Alignment::Right => Some(Align::Right),
        }
    }
}

/// Saved on entering an epigraph or poem, restored on leaving it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScopeSnapshot {
    /// Only epigraphs move the margin.
    left_margin: Option<f64>,
    alignment: Alignment,
    italic: bool,
}

/// Mutable formatting state of one conversion run.
#[derive(Debug, Default)]
pub struct RenderState {
    pub bold: bool,
    pub italic: bool,
    pub alignment: Alignment,
    /// Set at a paragraph start, consumed by its first text run.
    pub pending_indent: bool,
    /// Distinct names of unrecognized elements.
    pub unknown_tags: BTreeSet<String>,
    scopes: Vec<ScopeSnapshot>,
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn font_variant(&self) -> FontVariant {
        FontVariant::from_flags(self.bold, self.italic)
    }

    /// Push the current variant to the backend.
    pub fn apply(&self, backend: &mut dyn Backend) {
        backend.set_font_variant(self.font_variant());
    }

    pub fn set_bold(&mut self, bold: bool, backend: &mut dyn Backend) {
        self.bold = bold;
        self.apply(backend);
    }

    pub fn set_italic(&mut self, italic: bool, backend: &mut dyn Backend) {
        self.italic = italic;
        self.apply(backend);
    }

    pub fn begin_paragraph(&mut self) {
        self.pending_indent = true;
    }

    /// Whether an indent is due, clearing it.
    pub fn take_indent(&mut self) -> bool {
        std::mem::take(&mut self.pending_indent)
    }

    /// Record an unknown element. Returns `true` the first time a name is
    /// seen.
    pub fn record_unknown(&mut self, name: &str) -> bool {
        if self.unknown_tags.contains(name) {
            return false;
        }
        self.unknown_tags.insert(name.to_string())
    }

    /// Remember alignment and italic before a scoped block, plus the left
    /// margin when the block is going to move it.
    pub fn enter_scope(&mut self, left_margin: Option<f64>) {
        self.scopes.push(ScopeSnapshot {
            left_margin,
            alignment: self.alignment,
            italic: self.italic,
        });
    }

    /// Restore what [`RenderState::enter_scope`] saved. Without a saved
    /// scope, alignment and italic fall back to their defaults.
    pub fn leave_scope(&mut self, backend: &mut dyn Backend) {
        match self.scopes.pop() {
            Some(saved) => {
                if let Some(margin) = saved.left_margin {
                    backend.set_left_margin(margin);
                }
                self.alignment = saved.alignment;
                self.italic = saved.italic;
            }
            None => {
                self.alignment = Alignment::None;
                self.italic = false;
            }
        }
        self.apply(backend);
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }
}
