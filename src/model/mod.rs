//! # Book Model
//!
//! Typed records decoded from FictionBook subtrees: the book metadata from
//! `<description>`, and the `<title>` and `<subtitle>` blocks met in the
//! body.
//!
//! These subtrees are not streamed event by event like the rest of the
//! book. When the parser meets one of them it hands the reader over to a
//! decoder here, which consumes the whole subtree and returns a record.
//! Inline markup inside paragraphs is kept raw and only flattened to plain
//! text when it is rendered.
//!
//! Decoding is lenient about missing children (they decode as empty
//! strings) and strict about broken nesting.

use std::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::error::{ConvertError, Result};

/// The first author listed in `<title-info>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.first_name, &self.middle_name, &self.last_name]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// Book metadata from `<description><title-info>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub author: Author,
    pub title: String,
    /// Raw inner markup of `<annotation>`, parsed again as book content.
    pub annotation: String,
    pub date: String,
    pub genres: Vec<String>,
    pub lang: Option<String>,
}

/// A `<title>`: one entry of raw inner markup per `<p>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleBlock {
    pub paragraphs: Vec<String>,
}

impl TitleBlock {
    /// Plain text of every paragraph.
    pub fn lines(&self) -> Result<Vec<String>> {
        self.paragraphs.iter().map(|p| flatten_markup(p)).collect()
    }
}

/// A `<subtitle>`, raw inner markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleBlock {
    pub text: String,
}

impl SubtitleBlock {
    pub fn plain_text(&self) -> Result<String> {
        flatten_markup(&self.text)
    }
}

fn decode_error(element: &str, reader: &Reader<&[u8]>, reason: impl fmt::Display) -> ConvertError {
    ConvertError::SubtreeDecode {
        element: element.to_string(),
        position: reader.buffer_position() as u64,
        reason: reason.to_string(),
    }
}

/// Next event inside the subtree of `element`. End of input is an error
/// here: the subtree was opened and never closed.
fn next_event<'a>(reader: &mut Reader<&'a [u8]>, element: &str) -> Result<Event<'a>> {
    match reader.read_event() {
        Ok(Event::Eof) => Err(decode_error(element, reader, "unexpected end of input")),
        Ok(event) => Ok(event),
        Err(e) => Err(decode_error(element, reader, e)),
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// Raw inner markup of the element that `start` opened.
fn inner_markup(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<String> {
    match reader.read_text(start.name()) {
        Ok(text) => Ok(text.into_owned()),
        Err(e) => Err(decode_error(&local_name(start), reader, e)),
    }
}

/// Flattened text content of the element that `start` opened.
fn text_content(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<String> {
    let raw = inner_markup(reader, start)?;
    flatten_markup(&raw)
}

fn skip(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<()> {
    reader
        .read_to_end(start.name())
        .map(|_| ())
        .map_err(|e| decode_error(&local_name(start), reader, e))
}

/// Decode `<description>`. The reader must be positioned just after its
/// start tag; on return it is just after the matching end tag.
pub fn decode_description(reader: &mut Reader<&[u8]>) -> Result<DocumentMetadata> {
    let mut metadata = DocumentMetadata::default();
    loop {
        match next_event(reader, "description")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"title-info" => decode_title_info(reader, &mut metadata)?,
                _ => skip(reader, &e)?,
            },
            Event::End(_) => return Ok(metadata),
            _ => {}
        }
    }
}

fn decode_title_info(reader: &mut Reader<&[u8]>, metadata: &mut DocumentMetadata) -> Result<()> {
    let mut seen_author = false;
    loop {
        match next_event(reader, "title-info")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"author" => {
                    let author = decode_author(reader)?;
                    if !seen_author {
                        metadata.author = author;
                        seen_author = true;
                    }
                }
                b"book-title" => metadata.title = text_content(reader, &e)?,
                b"annotation" => metadata.annotation = inner_markup(reader, &e)?,
                b"date" => metadata.date = text_content(reader, &e)?,
                b"genre" => {
                    let genre = text_content(reader, &e)?;
                    if !genre.is_empty() {
                        metadata.genres.push(genre);
                    }
                }
                b"lang" => {
                    let lang = text_content(reader, &e)?;
                    metadata.lang = (!lang.is_empty()).then_some(lang);
                }
                _ => skip(reader, &e)?,
            },
            Event::End(_) => return Ok(()),
            _ => {}
        }
    }
}

fn decode_author(reader: &mut Reader<&[u8]>) -> Result<Author> {
    let mut author = Author::default();
    loop {
        match next_event(reader, "author")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"first-name" => author.first_name = text_content(reader, &e)?,
                b"middle-name" => author.middle_name = text_content(reader, &e)?,
                b"last-name" => author.last_name = text_content(reader, &e)?,
                _ => skip(reader, &e)?,
            },
            Event::End(_) => return Ok(author),
            _ => {}
        }
    }
}

/// Decode `<title>`. Only `<p>` children are kept; `<empty-line/>` and
/// anything else is dropped.
pub fn decode_title(reader: &mut Reader<&[u8]>) -> Result<TitleBlock> {
    let mut block = TitleBlock::default();
    loop {
        match next_event(reader, "title")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => block.paragraphs.push(inner_markup(reader, &e)?),
                _ => skip(reader, &e)?,
            },
            Event::Empty(e) if e.local_name().as_ref() == b"p" => {
                block.paragraphs.push(String::new());
            }
            Event::End(_) => return Ok(block),
            _ => {}
        }
    }
}

/// Decode `<subtitle>` whose start tag is `start`.
pub fn decode_subtitle(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<SubtitleBlock> {
    Ok(SubtitleBlock {
        text: inner_markup(reader, start)?,
    })
}

/// Plain text of a markup fragment: tags dropped, entities resolved,
/// whitespace runs collapsed to single spaces.
pub fn flatten_markup(raw: &str) -> Result<String> {
    let mut reader = Reader::from_str(raw);
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                let unescaped = t.unescape().map_err(|e| decode_error("#text", &reader, e))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(t)) => {
                text.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(decode_error("#text", &reader, e)),
        }
    }
    Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
}
