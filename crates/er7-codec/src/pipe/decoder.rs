//! ER7 text to message tree

use super::header::HeaderInfo;
use super::iterator::MessageIterator;
use crate::encoding::{EncodingCharacters, Escape, SEGMENT_DELIMITER, is_control_segment};
use crate::error::{Er7Error, Result};
use crate::grammar::{Grammar, GrammarCache};
use crate::model::{Component, Field, Message, Repetition, Segment};
use crate::options::ParserOptions;
use crate::registry::StructureRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Pick the grammar named by the header
pub(crate) fn grammar_for(
    header: &HeaderInfo,
    registry: &dyn StructureRegistry,
    cache: &GrammarCache,
    options: &ParserOptions,
) -> Result<Arc<Grammar>> {
    if !registry.supports_version(&header.version) {
        return Err(Er7Error::UnsupportedVersion(header.version.clone()));
    }

    match registry.resolve_message_type(&header.structure, &header.version, header.explicit) {
        Ok(schema) => cache.get_or_build(registry, &schema, &header.version),
        Err(e @ Er7Error::UnresolvableStructure { .. }) if options.allow_unknown_structures => {
            warn!(
                structure = %header.structure,
                version = %header.version,
                error = %e,
                "Unknown message structure, decoding with generic grammar"
            );
            cache.generic(registry, &header.structure, &header.version, &header.segment)
        }
        Err(e) => Err(e),
    }
}

/// Decode a whole message
pub(crate) fn decode(
    text: &str,
    registry: &dyn StructureRegistry,
    cache: &GrammarCache,
    options: &ParserOptions,
) -> Result<Message> {
    let header = HeaderInfo::peek(text)?;
    let grammar = grammar_for(&header, registry, cache, options)?;
    let chars = header.encoding_characters;

    let mut message = Message::new(&grammar);
    let mut iterator = MessageIterator::new(&grammar, message.root_mut(), options);
    let mut count = 0;

    for (index, line) in text.split(SEGMENT_DELIMITER).enumerate() {
        let line_number = index + 1;
        let line = line.trim_start();
        if line.is_empty() {
            continue;
        }

        let name = segment_name(line, &chars, line_number)?;
        iterator.advance(name).map_err(|e| match e {
            Er7Error::UnexpectedSegment { name, .. } => Er7Error::UnexpectedSegment {
                name,
                line: line_number,
            },
            other => other,
        })?;

        let segment = iterator.current_segment()?;
        segment.set_fields(parse_fields(line, name, &chars));
        check_repetitions(segment, line_number);
        resolve_varies(segment, registry, &header.version);
        count += 1;
    }

    debug!(
        structure = %header.structure,
        version = %header.version,
        segments = count,
        "Decoded message"
    );
    Ok(message)
}

/// Decode one segment line without placing it in a grammar
pub(crate) fn decode_segment(line: &str, chars: &EncodingCharacters) -> Result<Segment> {
    let line = line.trim_start();
    let name = segment_name(line, chars, 1)?;
    let mut segment = Segment::new(name);
    segment.set_fields(parse_fields(line, name, chars));
    Ok(segment)
}

/// Validate and return the three character segment name of a line
fn segment_name<'t>(line: &'t str, chars: &EncodingCharacters, line_number: usize) -> Result<&'t str> {
    let malformed = |reason: String| Er7Error::MalformedSegment {
        line: line_number,
        reason,
    };

    let name = line
        .get(..3)
        .ok_or_else(|| malformed(format!("'{line}' is shorter than a segment name")))?;
    if !name
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(malformed(format!("'{name}' is not a valid segment name")));
    }
    match line[3..].chars().next() {
        None => Ok(name),
        Some(c) if c == chars.field_separator() => Ok(name),
        Some(c) => Err(malformed(format!(
            "expected '{}' after '{name}', found '{c}'",
            chars.field_separator()
        ))),
    }
}

/// Split a segment line into fields
///
/// For control segments field 1 is the field separator itself and field 2
/// the literal encoding characters; neither is unescaped.
fn parse_fields(line: &str, name: &str, chars: &EncodingCharacters) -> Vec<Field> {
    let body = line[name.len()..]
        .strip_prefix(chars.field_separator())
        .unwrap_or_default();
    let mut tokens = body.split(chars.field_separator());

    let mut fields = Vec::new();
    if is_control_segment(name) {
        fields.push(Field::new(chars.field_separator().to_string()));
        fields.push(Field::new(tokens.next().unwrap_or_default()));
    } else if body.is_empty() {
        return fields;
    }
    fields.extend(tokens.map(|token| parse_field(token, chars)));
    fields
}

fn parse_field(text: &str, chars: &EncodingCharacters) -> Field {
    Field::from_repetitions(
        text.split(chars.repetition_separator())
            .map(|repetition| {
                Repetition::from_components(
                    repetition
                        .split(chars.component_separator())
                        .map(|component| {
                            Component::from_subcomponents(
                                component
                                    .split(chars.subcomponent_separator())
                                    .map(|sub| Escape::unescape(sub, chars))
                                    .collect(),
                            )
                        })
                        .collect(),
                )
            })
            .collect(),
    )
}

/// Repetitions beyond the declared limit are kept; the sender is told about it
/// in the log only
fn check_repetitions(segment: &Segment, line_number: usize) {
    for (index, field) in segment.fields().iter().enumerate() {
        let number = index + 1;
        if let Some(max) = segment.max_repetitions(number)
            && max > 0
            && field.repetitions().len() > max
        {
            warn!(
                segment = segment.name(),
                field = number,
                repetitions = field.repetitions().len(),
                max,
                line = line_number,
                "Field repeats more often than allowed"
            );
        }
    }
}

/// Attach the data type named by each `varies` field's selector field
fn resolve_varies(segment: &mut Segment, registry: &dyn StructureRegistry, version: &str) {
    let Some(schema) = segment.schema().cloned() else {
        return;
    };
    for (index, field) in schema.fields.iter().enumerate() {
        let Some(selector) = field.type_selector else {
            continue;
        };
        let number = index + 1;
        if segment.field(number).is_none_or(Field::is_empty) {
            continue;
        }
        let Some(type_name) = segment.value(selector, 0, 1, 1).map(str::to_string) else {
            debug!(
                segment = segment.name(),
                field = number,
                "Varies field has no type selector value"
            );
            continue;
        };
        match registry.resolve_data_type(&type_name, version) {
            Ok(data_type) => segment.set_resolved_type(number, data_type),
            Err(e) => warn!(
                segment = segment.name(),
                field = number,
                data_type = %type_name,
                error = %e,
                "Varies field keeps raw values"
            ),
        }
    }
}
