//! # Event Parser
//!
//! Walks a FictionBook document as a stream of XML events and turns each
//! one into style changes and drawing calls.
//!
//! Most elements are streamed: a start tag flips some state, character
//! data is written, the end tag flips it back. Three elements are
//! different. `<title>`, `<subtitle>` and `<description>` are decoded whole
//! into [`crate::model`] records before anything is drawn.
//!
//! ```text
//!   <description> ──decode──▶ DocumentMetadata ──▶ cover page
//!                                    │              new page
//!                                    │              footer
//!                                    └─annotation─▶ parse again (nested)
//! ```
//!
//! The annotation is parsed by the same [`EventParser`], on the same
//! [`RenderState`] and backend, so `<strong>` in an annotation behaves
//! exactly like `<strong>` in the body. The nested parse finishes before
//! the outer one reads its next event.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::backend::Backend;
use crate::error::{ConvertError, Result};
use crate::layout;
use crate::model::{self, DocumentMetadata, SubtitleBlock, TitleBlock};
use crate::style::RenderState;

/// Every element kind the parser acts on. Anything else is `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Paragraph,
    Strong,
    Emphasis,
    Title,
    Subtitle,
    Epigraph,
    Poem,
    Stanza,
    Verse,
    Description,
    FictionBook,
    Body,
    Section,
    Unknown(String),
}

impl Element {
    /// Classify a local (prefix-free) element name.
    pub fn from_local_name(name: &[u8]) -> Self {
        match name {
            b"p" => Element::Paragraph,
            b"strong" => Element::Strong,
            b"emphasis" => Element::Emphasis,
            b"title" => Element::Title,
            b"subtitle" => Element::Subtitle,
            b"epigraph" => Element::Epigraph,
            b"poem" => Element::Poem,
            b"stanza" => Element::Stanza,
            b"v" => Element::Verse,
            b"description" => Element::Description,
            b"FictionBook" => Element::FictionBook,
            b"body" => Element::Body,
            b"section" => Element::Section,
            other => Element::Unknown(String::from_utf8_lossy(other).into_owned()),
        }
    }

    fn of(start: &BytesStart<'_>) -> Self {
        Self::from_local_name(start.local_name().as_ref())
    }
}

/// Whether a parse is over the book itself or over a fragment taken from
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    TopLevel,
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// One traversal of a book. Borrows the run's state and backend for its
/// whole lifetime; nested parses reuse the same borrows.
pub struct EventParser<'a> {
    state: &'a mut RenderState,
    backend: &'a mut dyn Backend,
    skip_unknown: bool,
    metadata: Option<DocumentMetadata>,
}

impl<'a> EventParser<'a> {
    pub fn new(state: &'a mut RenderState, backend: &'a mut dyn Backend, skip_unknown: bool) -> Self {
        Self {
            state,
            backend,
            skip_unknown,
            metadata: None,
        }
    }

    /// Parse a whole book. Returns the metadata of its first
    /// `<description>`, if any.
    ///
    /// `</body>` ends the parse; anything after it is not read. A book
    /// that simply runs out without one is accepted as is.
    pub fn parse_book(mut self, source: &[u8]) -> Result<Option<DocumentMetadata>> {
        self.parse(source, Mode::TopLevel)?;
        Ok(self.metadata)
    }

    fn parse(&mut self, source: &[u8], mode: Mode) -> Result<()> {
        let mut reader = Reader::from_reader(source);

        loop {
            let position = reader.buffer_position() as u64;
            let event = reader
                .read_event()
                .map_err(|source| ConvertError::MarkupSyntax { position, source })?;

            let flow = match event {
                Event::Start(e) => self.start(&mut reader, &e, position, false)?,
                Event::Empty(e) => self.start(&mut reader, &e, position, true)?,
                Event::End(e) => self.end(&Element::from_local_name(e.local_name().as_ref())),
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| ConvertError::MarkupSyntax {
                        position,
                        source: e.into(),
                    })?;
                    layout::write_text(&text, self.state, self.backend);
                    Flow::Continue
                }
                Event::CData(t) => {
                    let text = t.decode().map_err(|e| ConvertError::MarkupSyntax {
                        position,
                        source: e.into(),
                    })?;
                    layout::write_text(&text, self.state, self.backend);
                    Flow::Continue
                }
                Event::Eof => {
                    if mode == Mode::TopLevel {
                        tracing::debug!("input ended without </body>");
                    }
                    return Ok(());
                }
                _ => Flow::Continue,
            };

            if flow == Flow::Stop {
                return Ok(());
            }
        }
    }

    /// Handle a start tag. An empty-element tag is a start immediately
    /// followed by its end.
    fn start(
        &mut self,
        reader: &mut Reader<&[u8]>,
        e: &BytesStart<'_>,
        position: u64,
        empty: bool,
    ) -> Result<Flow> {
        let element = Element::of(e);
        match &element {
            Element::Paragraph => self.state.begin_paragraph(),
            Element::Strong => self.state.set_bold(true, self.backend),
            Element::Emphasis => self.state.set_italic(true, self.backend),
            Element::Epigraph => layout::enter_epigraph(self.state, self.backend),
            Element::Poem => layout::enter_poem(self.state, self.backend),
            Element::Stanza
            | Element::Verse
            | Element::FictionBook
            | Element::Body
            | Element::Section => {}

            Element::Title => {
                let block = if empty {
                    TitleBlock::default()
                } else {
                    model::decode_title(reader)?
                };
                layout::render_title(&block, self.backend, self.state)?;
                return Ok(Flow::Continue);
            }
            Element::Subtitle => {
                let block = if empty {
                    SubtitleBlock::default()
                } else {
                    model::decode_subtitle(reader, e)?
                };
                layout::render_subtitle(&block, self.backend, self.state)?;
                return Ok(Flow::Continue);
            }
            Element::Description => {
                let metadata = if empty {
                    DocumentMetadata::default()
                } else {
                    model::decode_description(reader)?
                };
                self.describe(metadata)?;
                return Ok(Flow::Continue);
            }
            Element::Unknown(name) => {
                self.unknown(reader, e, name, position, empty)?;
                return Ok(Flow::Continue);
            }
        }

        if empty {
            Ok(self.end(&element))
        } else {
            Ok(Flow::Continue)
        }
    }

    fn end(&mut self, element: &Element) -> Flow {
        match element {
            Element::Paragraph => layout::end_paragraph(self.backend),
            Element::Strong => self.state.set_bold(false, self.backend),
            Element::Emphasis => self.state.set_italic(false, self.backend),
            Element::Epigraph => layout::leave_epigraph(self.state, self.backend),
            Element::Poem => layout::leave_poem(self.state, self.backend),
            Element::Stanza => layout::end_stanza(self.backend),
            Element::Verse => layout::end_verse(self.backend),
            Element::Body => return Flow::Stop,
            _ => {}
        }
        Flow::Continue
    }

    /// Cover, first body page, footer, then the annotation as book
    /// content.
    fn describe(&mut self, metadata: DocumentMetadata) -> Result<()> {
        layout::compose_cover(&metadata, self.backend, self.state);
        self.backend.add_page();
        layout::install_footer(self.backend);

        if !metadata.annotation.trim().is_empty() {
            tracing::debug!(bytes = metadata.annotation.len(), "parsing annotation");
            self.parse(metadata.annotation.as_bytes(), Mode::Nested)?;
        }

        if self.metadata.is_none() {
            self.metadata = Some(metadata);
        }
        Ok(())
    }

    fn unknown(
        &mut self,
        reader: &mut Reader<&[u8]>,
        e: &BytesStart<'_>,
        name: &str,
        position: u64,
        empty: bool,
    ) -> Result<()> {
        if self.state.record_unknown(name) {
            tracing::debug!(element = name, position, "unknown element");
        }
        if !self.skip_unknown {
            return Err(ConvertError::UnknownElement {
                name: name.to_string(),
                position,
            });
        }
        if !empty {
            reader
                .read_to_end(e.name())
                .map_err(|source| ConvertError::MarkupSyntax {
                    position: reader.buffer_position() as u64,
                    source,
                })?;
        }
        Ok(())
    }
}

/// Parse `source` into `backend`. Shorthand for [`EventParser::parse_book`].
pub fn parse_book(
    source: &[u8],
    state: &mut RenderState,
    backend: &mut dyn Backend,
    skip_unknown: bool,
) -> Result<Option<DocumentMetadata>> {
    EventParser::new(state, backend, skip_unknown).parse_book(source)
}
