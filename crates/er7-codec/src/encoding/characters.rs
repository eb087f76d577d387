//! Delimiter set of a single message

use crate::error::{Er7Error, Result};
use crate::model::Segment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Segment names whose first two fields define the delimiters themselves
pub const CONTROL_SEGMENTS: [&str; 3] = ["MSH", "FHS", "BHS"];

/// Segment delimiter used between lines of a message
pub const SEGMENT_DELIMITER: char = '\r';

/// Check whether a segment name is one of the delimiter-defining segments
pub fn is_control_segment(name: &str) -> bool {
    CONTROL_SEGMENTS.contains(&name)
}

/// The five delimiter characters of one message
///
/// Extracted once from the control segment of a message and never mutated.
/// Equal delimiter sets share one escape table (see [`super::Escape`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodingCharacters {
    field: char,
    component: char,
    repetition: char,
    escape: char,
    subcomponent: char,
}

impl Default for EncodingCharacters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl EncodingCharacters {
    /// Build a delimiter set from a field separator and the MSH-2 text
    ///
    /// `encoding` must start with the component, repetition, escape and
    /// subcomponent characters, in that order. Characters after the fourth
    /// (such as the v2.7 truncation character) are ignored.
    pub fn new(field: char, encoding: &str) -> Result<Self> {
        let mut chars = encoding.chars();
        let (Some(component), Some(repetition), Some(escape), Some(subcomponent)) =
            (chars.next(), chars.next(), chars.next(), chars.next())
        else {
            return Err(Er7Error::MalformedHeader(format!(
                "encoding characters '{encoding}' must contain at least 4 characters"
            )));
        };

        let result = Self {
            field,
            component,
            repetition,
            escape,
            subcomponent,
        };
        result.validate()?;
        Ok(result)
    }

    /// Extract the delimiter set from the first line of a message
    ///
    /// The text must start with a control segment name; the 4th character is
    /// the field separator and the next four are the encoding characters.
    pub fn from_header(text: &str) -> Result<Self> {
        let text = text.trim_start();
        let name: String = text.chars().take(3).collect();
        if !is_control_segment(&name) {
            return Err(Er7Error::MalformedHeader(format!(
                "message must start with one of {CONTROL_SEGMENTS:?}, found '{name}'"
            )));
        }

        let mut rest = text.chars().skip(3);
        let field = rest.next().ok_or_else(|| {
            Er7Error::MalformedHeader(format!("{name} segment has no field separator"))
        })?;
        let encoding: String = rest
            .take_while(|c| *c != field && *c != '\r' && *c != '\n')
            .collect();
        Self::new(field, &encoding)
    }

    /// Read the delimiter set back out of a control segment (MSH-1 and MSH-2)
    pub fn from_segment(segment: &Segment) -> Result<Self> {
        if !is_control_segment(segment.name()) {
            return Err(Er7Error::MalformedHeader(format!(
                "'{}' is not a control segment",
                segment.name()
            )));
        }

        let separator = segment.value(1, 0, 1, 1).unwrap_or_default();
        let mut separator_chars = separator.chars();
        let field = match (separator_chars.next(), separator_chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(Er7Error::MalformedHeader(format!(
                    "{}-1 must be exactly one character, found '{separator}'",
                    segment.name()
                )));
            }
        };
        let encoding = segment.value(2, 0, 1, 1).unwrap_or_default();
        Self::new(field, encoding)
    }

    fn validate(&self) -> Result<()> {
        let all = self.as_array();
        for (i, c) in all.iter().enumerate() {
            if c.is_ascii_alphanumeric() || c.is_whitespace() {
                return Err(Er7Error::MalformedHeader(format!(
                    "'{c}' cannot be used as a delimiter"
                )));
            }
            if all[i + 1..].contains(c) {
                return Err(Er7Error::MalformedHeader(format!(
                    "delimiter '{c}' is used more than once"
                )));
            }
        }
        Ok(())
    }

    /// Field separator (MSH-1)
    pub const fn field_separator(&self) -> char {
        self.field
    }

    /// Component separator
    pub const fn component_separator(&self) -> char {
        self.component
    }

    /// Repetition separator
    pub const fn repetition_separator(&self) -> char {
        self.repetition
    }

    /// Escape character
    pub const fn escape_character(&self) -> char {
        self.escape
    }

    /// Subcomponent separator
    pub const fn subcomponent_separator(&self) -> char {
        self.subcomponent
    }

    /// All five characters: field, component, repetition, escape, subcomponent
    pub const fn as_array(&self) -> [char; 5] {
        [
            self.field,
            self.component,
            self.repetition,
            self.escape,
            self.subcomponent,
        ]
    }

    /// Check whether a character is one of the five delimiters
    pub fn is_delimiter(&self, c: char) -> bool {
        self.as_array().contains(&c)
    }
}

/// Renders the MSH-2 form, e.g. `^~\&`
impl fmt::Display for EncodingCharacters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.component, self.repetition, self.escape, self.subcomponent
        )
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_standard() {
        let chars = EncodingCharacters::from_header("MSH|^~\\&|SENDER|FAC")
            .expect("Test operation should succeed");
        assert_eq!(chars.field_separator(), '|');
        assert_eq!(chars.component_separator(), '^');
        assert_eq!(chars.repetition_separator(), '~');
        assert_eq!(chars.escape_character(), '\\');
        assert_eq!(chars.subcomponent_separator(), '&');
        assert_eq!(chars, EncodingCharacters::default());
    }

    #[test]
    fn test_from_header_custom_delimiters() {
        let chars =
            EncodingCharacters::from_header("MSH*%$!@*APP").expect("Test operation should succeed");
        assert_eq!(chars.as_array(), ['*', '%', '$', '!', '@']);
        assert_eq!(chars.to_string(), "%$!@");
    }

    #[test]
    fn test_from_header_truncation_character_ignored() {
        let chars = EncodingCharacters::from_header("MSH|^~\\&#|APP")
            .expect("Test operation should succeed");
        assert_eq!(chars, EncodingCharacters::default());
    }

    #[test]
    fn test_from_header_leading_whitespace() {
        let chars = EncodingCharacters::from_header("\n MSH|^~\\&|APP")
            .expect("Test operation should succeed");
        assert_eq!(chars.field_separator(), '|');
    }

    #[test]
    fn test_from_header_rejects_short_block() {
        let result = EncodingCharacters::from_header("MSH|^~\\|APP");
        assert!(matches!(result, Err(Er7Error::MalformedHeader(_))));

        let result = EncodingCharacters::from_header("MSH");
        assert!(matches!(result, Err(Er7Error::MalformedHeader(_))));
    }

    #[test]
    fn test_from_header_rejects_non_control_segment() {
        let result = EncodingCharacters::from_header("PID|^~\\&|");
        assert!(matches!(result, Err(Er7Error::MalformedHeader(_))));
    }

    #[test]
    fn test_duplicate_delimiters_rejected() {
        let result = EncodingCharacters::new('|', "^^\\&");
        assert!(matches!(result, Err(Er7Error::MalformedHeader(_))));

        let result = EncodingCharacters::new('A', "^~\\&");
        assert!(matches!(result, Err(Er7Error::MalformedHeader(_))));
    }

    #[test]
    fn test_control_segment_names() {
        assert!(is_control_segment("MSH"));
        assert!(is_control_segment("FHS"));
        assert!(is_control_segment("BHS"));
        assert!(!is_control_segment("PID"));
    }
}
