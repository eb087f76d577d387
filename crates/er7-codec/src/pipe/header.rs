//! Message header inspection
//!
//! Reads just enough of the first segment to pick a grammar: the delimiters,
//! the message type (MSH-9) and the version (MSH-12).

use crate::encoding::{EncodingCharacters, is_control_segment};
use crate::error::{Er7Error, Result};
use crate::options::Encoding;
use serde::Serialize;

/// Number of fields a control segment needs to name its version
const REQUIRED_HEADER_FIELDS: usize = 12;

/// Routing data of a message, read without decoding it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderInfo {
    /// Control segment name (`MSH`, `FHS` or `BHS`)
    pub segment: String,
    /// Delimiters from the first two fields
    pub encoding_characters: EncodingCharacters,
    /// Message code, MSH-9.1 (e.g. `ADT`)
    pub message_code: String,
    /// Trigger event, MSH-9.2 (e.g. `A04`)
    pub trigger_event: Option<String>,
    /// Structure name to resolve: MSH-9.3 if present, otherwise code and
    /// event joined with `_`
    pub structure: String,
    /// Whether `structure` came from MSH-9.3
    pub explicit: bool,
    /// Message control ID, MSH-10
    pub control_id: Option<String>,
    /// Processing ID, MSH-11.1 (e.g. `P`)
    pub processing_id: Option<String>,
    /// Version ID, MSH-12.1
    pub version: String,
}

impl HeaderInfo {
    /// Read the header of an ER7 message
    pub fn peek(text: &str) -> Result<Self> {
        let encoding_characters = EncodingCharacters::from_header(text)?;
        let line = text
            .trim_start()
            .split(['\r', '\n'])
            .next()
            .unwrap_or_default();

        let tokens: Vec<&str> = line
            .split(encoding_characters.field_separator())
            .collect();
        // tokens[0] is the segment name and tokens[i] is field i + 1
        if tokens.len() < REQUIRED_HEADER_FIELDS {
            return Err(Er7Error::MalformedHeader(format!(
                "{} has {} fields, at least {REQUIRED_HEADER_FIELDS} are required",
                tokens[0],
                tokens.len()
            )));
        }
        let field = |number: usize| tokens.get(number - 1).copied().unwrap_or_default();
        let first_repetition = |value: &str| {
            value
                .split(encoding_characters.repetition_separator())
                .next()
                .unwrap_or_default()
                .to_string()
        };

        let message_type = first_repetition(field(9));
        let components: Vec<&str> = message_type
            .split(encoding_characters.component_separator())
            .map(str::trim)
            .collect();
        let (structure, explicit) = match components.as_slice() {
            [_, _, structure, ..] if !structure.is_empty() => ((*structure).to_string(), true),
            [code, ..] if *code == "ACK" => ("ACK".to_string(), true),
            [code, event, ..] if !code.is_empty() && !event.is_empty() => {
                (format!("{code}_{event}"), false)
            }
            _ => {
                return Err(Er7Error::MalformedHeader(format!(
                    "cannot determine message structure from '{message_type}'"
                )));
            }
        };

        let version = first_repetition(field(12))
            .split(encoding_characters.component_separator())
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        if version.is_empty() {
            return Err(Er7Error::MalformedHeader(format!(
                "{}-12 (version ID) is empty",
                tokens[0]
            )));
        }

        let control_id = Some(field(10).trim().to_string()).filter(|id| !id.is_empty());
        let processing_id = first_repetition(field(11))
            .split(encoding_characters.component_separator())
            .next()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let trigger_event = components
            .get(1)
            .filter(|event| !event.is_empty())
            .map(|event| (*event).to_string());

        Ok(Self {
            segment: tokens[0].to_string(),
            encoding_characters,
            message_code: components.first().copied().unwrap_or_default().to_string(),
            trigger_event,
            structure,
            explicit,
            control_id,
            processing_id,
            version,
        })
    }
}

/// Guess the surface encoding of a message from its first characters
///
/// Returns `None` when the text is neither an ER7 message nor XML.
pub fn detect_encoding(text: &str) -> Option<Encoding> {
    let text = text.trim_start();
    if text.starts_with('<') {
        return Some(Encoding::Xml);
    }
    let name = text.get(..3)?;
    if is_control_segment(name) && EncodingCharacters::from_header(text).is_ok() {
        Some(Encoding::Pipe)
    } else {
        None
    }
}
