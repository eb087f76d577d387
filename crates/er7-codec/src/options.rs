//! Parser configuration
//!
//! [`ParserOptions`] carries the knobs that change how a message is placed into
//! its grammar. The defaults match the behavior most interfaces expect:
//! greedy placement, unknown segments kept inline, pipe encoding only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Surface encoding of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Pipe-and-hat delimited text (ER7)
    #[default]
    Pipe,
    /// XML encoding, recognized but not implemented by this codec
    Xml,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipe => write!(f, "pipe"),
            Self::Xml => write!(f, "xml"),
        }
    }
}

/// What to do with a segment that has no place in the grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnexpectedSegmentBehavior {
    /// Insert a non-standard segment right after the current position
    #[default]
    AddInline,
    /// Insert a non-standard segment at the top level of the message
    DropToRoot,
    /// Abort the decode
    Fail,
}

/// Decoder and encoder settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Prefer a new repetition of an earlier repeating group over a later
    /// sibling position when a segment name could go either way
    pub non_greedy: bool,
    /// Handling of segments the grammar does not declare at the current position
    pub unexpected_segments: UnexpectedSegmentBehavior,
    /// Surface encoding requested by the caller
    pub encoding: Encoding,
    /// Decode messages whose structure the registry cannot resolve against a
    /// generic grammar instead of failing
    pub allow_unknown_structures: bool,
}

impl ParserOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable non-greedy placement
    pub fn with_non_greedy(mut self, non_greedy: bool) -> Self {
        self.non_greedy = non_greedy;
        self
    }

    /// Set the unexpected segment behavior
    pub fn with_unexpected_segments(mut self, behavior: UnexpectedSegmentBehavior) -> Self {
        self.unexpected_segments = behavior;
        self
    }

    /// Set the requested surface encoding
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Allow decoding against a generic grammar when the structure is unknown
    pub fn with_unknown_structures(mut self, allow: bool) -> Self {
        self.allow_unknown_structures = allow;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.encoding != Encoding::Pipe {
            return Err(format!("encoding '{}' is not supported", self.encoding));
        }
        if self.allow_unknown_structures
            && self.unexpected_segments == UnexpectedSegmentBehavior::Fail
        {
            return Err(
                "allow_unknown_structures needs unexpected segments to be kept, not failed"
                    .to_string(),
            );
        }
        Ok(())
    }
}
