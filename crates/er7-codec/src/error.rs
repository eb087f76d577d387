//! Error types for ER7 decoding and encoding
//!
//! Every variant here is terminal for the call that produced it. Conditions
//! that are merely "absent" (an optional segment that never arrived, a field
//! that was left empty) are reported through `Option` by the model accessors
//! and never surface as an [`Er7Error`].

use crate::grammar::GrammarError;
use crate::registry::StructureKind;
use crate::Encoding;
use thiserror::Error;

/// Errors that can occur while decoding or encoding ER7 messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Er7Error {
    /// The control segment is missing, too short, or its delimiters are unusable
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// The registry has no grammar for this version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    /// A structure name could not be mapped to a schema
    #[error("Cannot resolve {kind} '{name}' for version {version}")]
    UnresolvableStructure {
        /// What kind of structure was requested
        kind: StructureKind,
        /// Name that was looked up
        name: String,
        /// Version it was looked up for
        version: String,
    },

    /// A segment could not be placed in the grammar and unexpected segments fail
    #[error("Unexpected segment '{name}' at line {line}")]
    UnexpectedSegment {
        /// Three character segment name from the input line
        name: String,
        /// 1-based line number in the message text
        line: usize,
    },

    /// Grammar navigation ran out of positions without placing the segment
    #[error("No position found for segment '{name}' after {steps} steps")]
    IteratorExhausted {
        /// Segment name being searched for
        name: String,
        /// Number of navigation steps taken
        steps: usize,
    },

    /// The iterator's path no longer matches the message tree it fills
    #[error("Message tree has no slot for '{node}' at the iterator position")]
    PathMismatch {
        /// Grammar node or slot that could not be found
        node: String,
    },

    /// A segment line could not be tokenized
    #[error("Malformed segment at line {line}: {reason}")]
    MalformedSegment {
        /// 1-based line number in the message text
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A structure in the message tree cannot be written as ER7 text
    #[error("Cannot encode {location}: {reason}")]
    Unencodable {
        /// Slot or segment that failed
        location: String,
        /// What was wrong with it
        reason: String,
    },

    /// The requested surface encoding is not implemented by this codec
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(Encoding),

    /// Grammar construction failed
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),
}

/// Type alias for ER7 operation results
pub type Result<T> = std::result::Result<T, Er7Error>;
