//! ER7 (pipe-delimited) codec
//!
//! [`PipeParser`] ties the pieces together: it reads the header, resolves the
//! grammar through the registry (caching it), walks the segments with a
//! [`MessageIterator`] and fills in the tree. Encoding walks the tree back out
//! in slot order.

mod decoder;
mod encoder;
mod header;
mod iterator;

pub use header::{HeaderInfo, detect_encoding};
pub use iterator::{MessageIterator, Placement};

use crate::encoding::EncodingCharacters;
use crate::error::{Er7Error, Result};
use crate::grammar::{Grammar, GrammarCache};
use crate::model::{AckCode, Message, Segment};
use crate::options::{Encoding, ParserOptions};
use crate::registry::{StructureRegistry, catalog};
use std::fmt;
use std::sync::Arc;

/// Decoder and encoder for ER7 messages
///
/// Cloning is cheap; clones share the registry and the grammar cache.
#[derive(Clone)]
pub struct PipeParser {
    registry: Arc<dyn StructureRegistry>,
    cache: Arc<GrammarCache>,
    options: ParserOptions,
}

impl fmt::Debug for PipeParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeParser")
            .field("options", &self.options)
            .field("cached_grammars", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Default for PipeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PipeParser {
    /// Parser backed by the built-in catalog
    pub fn new() -> Self {
        Self::with_registry(catalog::standard())
    }

    /// Parser backed by a custom registry
    pub fn with_registry(registry: Arc<dyn StructureRegistry>) -> Self {
        Self {
            registry,
            cache: Arc::new(GrammarCache::new()),
            options: ParserOptions::default(),
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Registry used for structure lookups
    pub fn registry(&self) -> &Arc<dyn StructureRegistry> {
        &self.registry
    }

    /// Number of grammars built so far
    pub fn cached_grammars(&self) -> usize {
        self.cache.len()
    }

    fn check_encoding(encoding: Encoding) -> Result<()> {
        match encoding {
            Encoding::Pipe => Ok(()),
            other => Err(Er7Error::UnsupportedEncoding(other)),
        }
    }

    /// Grammar for a structure and version, built on first use
    pub fn grammar(&self, structure: &str, version: &str, explicit: bool) -> Result<Arc<Grammar>> {
        if !self.registry.supports_version(version) {
            return Err(Er7Error::UnsupportedVersion(version.to_string()));
        }
        let schema = self
            .registry
            .resolve_message_type(structure, version, explicit)?;
        self.cache
            .get_or_build(self.registry.as_ref(), &schema, version)
    }

    /// Decode an ER7 message
    ///
    /// Segments are separated by carriage returns. Blank lines and leading
    /// whitespace before a segment are ignored.
    pub fn decode(&self, text: &str) -> Result<Message> {
        Self::check_encoding(self.options.encoding)?;
        if detect_encoding(text) == Some(Encoding::Xml) {
            return Err(Er7Error::UnsupportedEncoding(Encoding::Xml));
        }
        decoder::decode(text, self.registry.as_ref(), &self.cache, &self.options)
    }

    /// Decode one segment line outside of any message grammar
    pub fn decode_segment(&self, line: &str, chars: &EncodingCharacters) -> Result<Segment> {
        decoder::decode_segment(line, chars)
    }

    /// Encode a message with the configured encoding
    pub fn encode(&self, message: &Message) -> Result<String> {
        self.encode_as(message, self.options.encoding)
    }

    /// Encode a message with an explicit encoding
    pub fn encode_as(&self, message: &Message, encoding: Encoding) -> Result<String> {
        Self::check_encoding(encoding)?;
        encoder::encode(message)
    }

    /// Encode one segment without the segment delimiter
    pub fn encode_segment(&self, segment: &Segment, chars: &EncodingCharacters) -> Result<String> {
        encoder::encode_segment(segment, chars)
    }

    /// Build an acknowledgment for a decoded message
    ///
    /// The `ACK` structure is resolved for the message's version.
    pub fn generate_ack(
        &self,
        message: &Message,
        code: AckCode,
        text: Option<&str>,
    ) -> Result<Message> {
        let grammar = self.grammar("ACK", message.version(), true)?;
        message.generate_ack(&grammar, code, text)
    }
}
