//! Delimiters and escape sequences
//!
//! Every ER7 message names its own delimiters in the first two fields of its
//! control segment. [`EncodingCharacters`] holds that set and [`Escape`]
//! converts field text to and from its delimiter-safe form.

mod characters;
mod escape;

pub use characters::{
    CONTROL_SEGMENTS, EncodingCharacters, SEGMENT_DELIMITER, is_control_segment,
};
pub use escape::Escape;
