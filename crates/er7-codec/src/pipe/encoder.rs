//! Message tree to ER7 text

use crate::encoding::{EncodingCharacters, Escape, SEGMENT_DELIMITER, is_control_segment};
use crate::error::{Er7Error, Result};
use crate::model::{Component, Field, Group, Message, Repetition, Segment, Structure};
use tracing::debug;

/// Shortest encoded segment worth writing: a name and a separator
const MIN_SEGMENT_LENGTH: usize = 4;

pub(crate) fn encode(message: &Message) -> Result<String> {
    let chars = message.encoding_characters()?;
    let mut out = String::new();
    let written = encode_group(message.root(), &chars, &mut out)?;
    debug!(structure = message.structure(), segments = written, "Encoded message");
    Ok(out)
}

/// Write every repetition of every slot in order; returns the number of
/// segments written
fn encode_group(group: &Group, chars: &EncodingCharacters, out: &mut String) -> Result<usize> {
    let mut written = 0;
    for slot in group.slots() {
        for structure in slot.repetitions() {
            match structure {
                Structure::Segment(segment) => {
                    let text = encode_segment(segment, chars)?;
                    if text.chars().count() >= MIN_SEGMENT_LENGTH {
                        out.push_str(&text);
                        out.push(SEGMENT_DELIMITER);
                        written += 1;
                    }
                }
                Structure::Group(group) => written += encode_group(group, chars, out)?,
            }
        }
    }
    Ok(written)
}

/// Join parts with a separator, leaving out empty parts at the end
fn join_trimmed(mut parts: Vec<String>, separator: char) -> String {
    while parts.last().is_some_and(String::is_empty) {
        parts.pop();
    }
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(part);
    }
    out
}

fn encode_component(component: &Component, chars: &EncodingCharacters) -> String {
    join_trimmed(
        component
            .subcomponents()
            .iter()
            .map(|sub| Escape::escape(sub, chars))
            .collect(),
        chars.subcomponent_separator(),
    )
}

fn encode_repetition(repetition: &Repetition, chars: &EncodingCharacters) -> String {
    join_trimmed(
        repetition
            .components()
            .iter()
            .map(|component| encode_component(component, chars))
            .collect(),
        chars.component_separator(),
    )
}

fn encode_field(field: &Field, chars: &EncodingCharacters) -> String {
    join_trimmed(
        field
            .repetitions()
            .iter()
            .map(|repetition| encode_repetition(repetition, chars))
            .collect(),
        chars.repetition_separator(),
    )
}

/// Encode one segment without the trailing segment delimiter
pub(crate) fn encode_segment(segment: &Segment, chars: &EncodingCharacters) -> Result<String> {
    let name = segment.name();
    if name.len() != 3
        || !name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(Er7Error::Unencodable {
            location: name.to_string(),
            reason: "segment names must be three upper case letters or digits".to_string(),
        });
    }

    let separator = chars.field_separator();
    let mut out = String::from(name);
    let fields = segment.fields();

    let rest = if is_control_segment(name) {
        out.push(separator);
        match segment.value(2, 0, 1, 1) {
            Some(literal) => out.push_str(literal),
            None => out.push_str(&chars.to_string()),
        }
        fields.get(2..).unwrap_or_default()
    } else {
        fields
    };

    let encoded: Vec<String> = rest.iter().map(|field| encode_field(field, chars)).collect();
    let body = join_trimmed(encoded, separator);
    if !body.is_empty() {
        out.push(separator);
        out.push_str(&body);
    }
    Ok(out)
}
