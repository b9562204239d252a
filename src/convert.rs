//! # Conversion Runs
//!
//! [`Converter`] owns one book-to-PDF run from start to finish:
//!
//! ```text
//!   open  ── read the source, load fonts
//!   parse ── EventParser over the bytes, drawing into a PdfDocument
//!   report ─ unknown elements, page and bookmark counts
//!   finalize ─ serialize and atomically replace the output file
//! ```
//!
//! Each run gets a fresh [`RenderState`] and [`PdfDocument`], so nothing
//! carries over between books converted by the same `Converter`. The
//! output file only appears once the whole run has succeeded.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::backend::Backend;
use crate::error::{ConvertError, Result};
use crate::font::{FontContext, FontRegistry};
use crate::layout::{self, MARGIN_LEFT, MARGIN_RIGHT, MARGIN_TOP};
use crate::model::DocumentMetadata;
use crate::parser::EventParser;
use crate::pdf::{Bookmark, DocumentInfo, PdfDocument};
use crate::style::RenderState;

/// Settings for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Skip and report unrecognized elements instead of failing on the
    /// first one.
    pub skip_unknown: bool,
    /// Directory of TrueType files to embed instead of the standard fonts.
    pub font_dir: Option<PathBuf>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            skip_unknown: true,
            font_dir: None,
        }
    }
}

/// A finished, not yet serialized conversion.
pub struct Conversion {
    pub document: PdfDocument,
    pub metadata: Option<DocumentMetadata>,
    /// Distinct unrecognized element names, sorted.
    pub unknown_elements: Vec<String>,
}

/// Summary of a run written to disk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub pages: usize,
    pub bookmarks: Vec<Bookmark>,
    pub unknown_elements: Vec<String>,
}

pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    fn font_context(&self) -> Result<FontContext> {
        let mut registry = FontRegistry::new();
        if let Some(dir) = &self.options.font_dir {
            let loaded = registry.load_dir(dir)?;
            tracing::debug!(dir = %dir.display(), loaded, "loaded fonts");
        }
        Ok(FontContext::with_registry(registry))
    }

    /// Convert an in-memory book.
    pub fn convert_bytes(&self, source: &[u8]) -> Result<Conversion> {
        let mut document = PdfDocument::new(self.font_context()?);
        document.set_margins(MARGIN_LEFT, MARGIN_TOP, MARGIN_RIGHT);

        let mut state = RenderState::new();
        layout::set_body_font(&mut document, &state);

        let metadata =
            EventParser::new(&mut state, &mut document, self.options.skip_unknown).parse_book(source)?;

        if let Some(meta) = &metadata {
            document.set_info(document_info(meta));
        }

        let unknown_elements: Vec<String> = state.unknown_tags.into_iter().collect();
        for name in &unknown_elements {
            tracing::warn!(element = %name, "unknown element skipped");
        }

        Ok(Conversion {
            document,
            metadata,
            unknown_elements,
        })
    }

    /// Convert `input` and write the PDF to `output`. Nothing is created
    /// at `output` unless the whole run succeeds.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<ConversionReport> {
        let source = fs::read(input).map_err(|source| ConvertError::SourceOpen {
            path: input.to_path_buf(),
            source,
        })?;

        let conversion = self.convert_bytes(&source)?;
        drop(source);

        let pages = conversion.document.page_count();
        let bookmarks = conversion.document.bookmarks().to_vec();
        let bytes = conversion.document.finish()?;
        write_atomically(output, &bytes)?;

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            pages,
            bytes = bytes.len(),
            "converted"
        );

        Ok(ConversionReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            pages,
            bookmarks,
            unknown_elements: conversion.unknown_elements,
        })
    }
}

fn document_info(meta: &DocumentMetadata) -> DocumentInfo {
    let non_empty = |s: String| (!s.is_empty()).then_some(s);
    DocumentInfo {
        title: non_empty(meta.title.clone()),
        author: non_empty(meta.author.to_string()),
        subject: non_empty(meta.genres.join(", ")),
        lang: meta.lang.clone(),
    }
}

/// Write `bytes` to a temporary file next to `path`, then move it into
/// place.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_error = |source| ConvertError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// `book.fb2` becomes `book.pdf`; any other name gets `.pdf` appended.
pub fn default_output_path(input: &Path) -> PathBuf {
    if input.extension().is_some_and(|ext| ext == "fb2") {
        return input.with_extension("pdf");
    }
    let mut name = input.as_os_str().to_os_string();
    name.push(".pdf");
    PathBuf::from(name)
}
