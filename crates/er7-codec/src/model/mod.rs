//! Message tree
//!
//! A [`Message`] owns a root [`Group`]. Each group holds one [`Slot`] per
//! child of its grammar node, plus any non-standard slots added while
//! decoding, and each slot holds zero or more repetitions. Segments hold
//! [`Field`]s, which nest [`Repetition`]s, [`Component`]s and subcomponent
//! strings.

mod field;
mod group;
mod message;
mod segment;

pub use field::{Component, Field, Repetition};
pub use group::{Group, Slot, SlotKind, Structure};
pub use message::{AckCode, Message};
pub use segment::Segment;
