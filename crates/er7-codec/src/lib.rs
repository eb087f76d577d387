//! Grammar-driven codec for HL7 v2 pipe-delimited (ER7) messages
//!
//! This crate decodes ER7 text into a typed message tree and encodes the tree
//! back to text. Segment placement is driven by a grammar built from the
//! message structure's schema, so segments land in the groups and repetitions
//! the standard defines for them.
//!
//! # Components
//!
//! - **Encoding**: delimiter set from the header and the escape rules
//! - **Registry**: schemas for messages, groups, segments and data types,
//!   with a built-in catalog for v2.3 through v2.6
//! - **Grammar**: navigable structure tree with memoized traversal facts,
//!   cached per (structure, version)
//! - **Model**: message, group, segment and field values
//! - **Pipe**: the ER7 decoder, encoder and acknowledgment builder
//!
//! # Example
//!
//! ```
//! use er7_codec::PipeParser;
//!
//! let text = "MSH|^~\\&|LAB|HOSP|EMR|HOSP|20240315083000||ORU^R01^ORU_R01|1|P|2.5\r\
//!             PID|1||12345||Doe^Jane\r\
//!             OBR|1|||GLU\r\
//!             OBX|1|NM|GLU||105\r";
//!
//! let parser = PipeParser::new();
//! let message = parser.decode(text)?;
//! assert_eq!(message.structure(), "ORU_R01");
//!
//! let obx = message.find_segment("OBX").expect("OBX is present");
//! assert_eq!(obx.value(5, 0, 1, 1), Some("105"));
//!
//! assert_eq!(parser.encode(&message)?, text);
//! # Ok::<(), er7_codec::Er7Error>(())
//! ```
//!
//! # Round trips
//!
//! Decoding normalizes values: trailing empty fields, repetitions, components
//! and subcomponents are dropped, and empty segments are not written back.
//! Everything else survives `encode(decode(text))` unchanged.

#![allow(clippy::doc_markdown)] // HL7 terms (ER7, MSH-9) don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::must_use_candidate)] // Accessors
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::missing_errors_doc)] // Errors documented on Er7Error
#![allow(clippy::missing_const_for_fn)] // API stability
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![warn(missing_docs)]

pub mod encoding;
pub mod error;
pub mod grammar;
pub mod model;
pub mod options;
pub mod pipe;
pub mod registry;

pub use encoding::{EncodingCharacters, Escape};
pub use error::{Er7Error, Result};
pub use grammar::{Grammar, GrammarCache, GrammarError};
pub use model::{AckCode, Component, Field, Group, Message, Repetition, Segment, Structure};
pub use options::{Encoding, ParserOptions, UnexpectedSegmentBehavior};
pub use pipe::{HeaderInfo, PipeParser, detect_encoding};
pub use registry::{StaticRegistry, StructureRegistry};
