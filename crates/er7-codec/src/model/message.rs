//! Whole messages and acknowledgments

use super::{Group, Segment};
use crate::encoding::{EncodingCharacters, is_control_segment};
use crate::error::{Er7Error, Result};
use crate::grammar::Grammar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A decoded or programmatically built message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    structure: String,
    version: String,
    root: Group,
}

impl Message {
    /// Empty message shaped by a grammar
    pub fn new(grammar: &Grammar) -> Self {
        Self {
            structure: grammar.structure().to_string(),
            version: grammar.version().to_string(),
            root: grammar.instantiate(),
        }
    }

    /// Message from an already built tree
    pub fn from_parts(structure: impl Into<String>, version: impl Into<String>, root: Group) -> Self {
        Self {
            structure: structure.into(),
            version: version.into(),
            root,
        }
    }

    /// Message structure name (e.g. `ADT_A01`)
    pub fn structure(&self) -> &str {
        &self.structure
    }

    /// HL7 version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Top-level group
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Top-level group
    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    /// Every segment in message order
    pub fn segments(&self) -> Vec<&Segment> {
        self.root.segments()
    }

    /// First segment named `name`
    pub fn find_segment(&self, name: &str) -> Option<&Segment> {
        self.root.find_segment(name)
    }

    /// The control segment that opens the message
    pub fn header(&self) -> Option<&Segment> {
        self.root
            .segments()
            .into_iter()
            .next()
            .filter(|segment| is_control_segment(segment.name()))
    }

    /// The control segment that opens the message
    pub fn header_mut(&mut self) -> Option<&mut Segment> {
        let name = self.header()?.name().to_string();
        self.root.segment_mut(&name, 0)
    }

    /// Delimiters declared by the control segment
    pub fn encoding_characters(&self) -> Result<EncodingCharacters> {
        let header = self
            .header()
            .ok_or_else(|| Er7Error::MalformedHeader("message has no control segment".to_string()))?;
        EncodingCharacters::from_segment(header)
    }

    /// Message control ID (MSH-10)
    pub fn control_id(&self) -> Option<&str> {
        self.header()?.value(10, 0, 1, 1)
    }

    /// Build an acknowledgment for this message
    ///
    /// `grammar` is the grammar of the `ACK` structure. The header swaps the
    /// sending and receiving application and facility, copies delimiters,
    /// processing ID and version, and sets MSH-9 to `ACK^<event>^ACK`. MSA
    /// carries the acknowledgment code, this message's control ID and the
    /// optional text.
    pub fn generate_ack(
        &self,
        grammar: &Grammar,
        code: AckCode,
        text: Option<&str>,
    ) -> Result<Self> {
        let original = self
            .header()
            .ok_or_else(|| Er7Error::MalformedHeader("message has no control segment".to_string()))?;
        let copy = |field: usize| {
            original
                .field(field)
                .cloned()
                .unwrap_or_default()
        };

        let mut ack = Self::new(grammar);
        let control_id = format!(
            "{}{}",
            self.control_id().unwrap_or("ACK"),
            code.as_str()
        );

        let header = ack
            .root
            .ensure_segment(original.name(), 0)
            .ok_or_else(|| Er7Error::Unencodable {
                location: grammar.structure().to_string(),
                reason: format!("grammar has no {} slot", original.name()),
            })?;
        header.set_field(1, copy(1));
        header.set_field(2, copy(2));
        header.set_field(3, copy(5));
        header.set_field(4, copy(6));
        header.set_field(5, copy(3));
        header.set_field(6, copy(4));
        header.set_value(7, 0, 1, 1, chrono::Utc::now().format("%Y%m%d%H%M%S").to_string());
        header.set_value(9, 0, 1, 1, "ACK");
        if let Some(event) = original.value(9, 0, 2, 1) {
            header.set_value(9, 0, 2, 1, event);
        }
        header.set_value(9, 0, 3, 1, "ACK");
        header.set_value(10, 0, 1, 1, control_id);
        header.set_field(11, copy(11));
        header.set_field(12, copy(12));

        let msa = ack
            .root
            .ensure_segment("MSA", 0)
            .ok_or_else(|| Er7Error::Unencodable {
                location: grammar.structure().to_string(),
                reason: "grammar has no MSA slot".to_string(),
            })?;
        msa.set_value(1, 0, 1, 1, code.as_str());
        if let Some(id) = self.control_id() {
            msa.set_value(2, 0, 1, 1, id);
        }
        if let Some(text) = text {
            msa.set_value(3, 0, 1, 1, text);
        }

        Ok(ack)
    }
}

/// MSA-1 acknowledgment codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckCode {
    /// Application accept
    AA,
    /// Application error
    AE,
    /// Application reject
    AR,
    /// Commit accept
    CA,
    /// Commit error
    CE,
    /// Commit reject
    CR,
}

impl AckCode {
    /// Two letter code
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AA => "AA",
            Self::AE => "AE",
            Self::AR => "AR",
            Self::CA => "CA",
            Self::CE => "CE",
            Self::CR => "CR",
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AckCode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AA" => Ok(Self::AA),
            "AE" => Ok(Self::AE),
            "AR" => Ok(Self::AR),
            "CA" => Ok(Self::CA),
            "CE" => Ok(Self::CE),
            "CR" => Ok(Self::CR),
            other => Err(format!("unknown acknowledgment code '{other}'")),
        }
    }
}
