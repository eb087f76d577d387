//! Message grammars
//!
//! A grammar is the tree of groups and segments a message structure allows,
//! annotated with the facts the decoder needs to place each incoming segment:
//! which names may follow a node and which names may open a group.

mod builder;
mod cache;
mod definition;
mod error;

pub use builder::{MAX_DEPTH, build_grammar};
pub use cache::GrammarCache;
pub use definition::{DefinitionKind, Grammar, NodeId, StructureDefinition};
pub use error::GrammarError;
