//! Structured error types for a conversion run.
//!
//! Every variant belongs to exactly one [`Phase`], so callers can tell
//! whether the source could not be opened, the markup was broken, a
//! recognized subtree had the wrong shape, or the output could not be
//! written.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The stage of a conversion in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Open,
    Parse,
    Decode,
    Finalize,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Open => "open",
            Phase::Parse => "parse",
            Phase::Decode => "decode",
            Phase::Finalize => "finalize",
        })
    }
}

/// The unified error type returned by the conversion API.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source book could not be read.
    #[error("[open] failed to open source book {}: {source}", path.display())]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A font file from the font directory could not be loaded.
    #[error("[open] failed to load font {}: {reason}", path.display())]
    FontLoad { path: PathBuf, reason: String },

    /// The token stream is not well-formed XML.
    #[error("[parse] failed to read xml token at byte {position}: {source}")]
    MarkupSyntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// A title, subtitle or description subtree does not have the
    /// expected shape.
    #[error("[decode] failed to decode <{element}> at byte {position}: {reason}")]
    SubtreeDecode {
        element: String,
        position: u64,
        reason: String,
    },

    /// An unrecognized element was found while unknown elements are
    /// not tolerated.
    #[error("[parse] unknown element <{name}> at byte {position}")]
    UnknownElement { name: String, position: u64 },

    /// The finished document could not be written out.
    #[error("[finalize] failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    pub fn phase(&self) -> Phase {
        match self {
            ConvertError::SourceOpen { .. } | ConvertError::FontLoad { .. } => Phase::Open,
            ConvertError::MarkupSyntax { .. } | ConvertError::UnknownElement { .. } => {
                Phase::Parse
            }
            ConvertError::SubtreeDecode { .. } => Phase::Decode,
            ConvertError::OutputWrite { .. } => Phase::Finalize,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
