//! Schema data handed out by a registry
//!
//! These types carry no behavior of their own. A [`GroupSchema`] describes the
//! ordered children of a message or group, a [`SegmentSchema`] the fields of a
//! segment, and a [`DataTypeSchema`] the components of a data type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of structure a registry can resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructureKind {
    /// Top-level message structure (e.g. `ADT_A01`)
    Message,
    /// Named group inside a message (e.g. `ORU_R01_PATIENT_RESULT`)
    Group,
    /// Segment (e.g. `PID`)
    Segment,
    /// Field data type (e.g. `CE`)
    DataType,
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::Group => write!(f, "group"),
            Self::Segment => write!(f, "segment"),
            Self::DataType => write!(f, "data type"),
        }
    }
}

/// Whether a child of a group is a segment or a nested group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildKind {
    /// Segment child; the child name is the segment name
    Segment,
    /// Group child resolved through the registry under `type_name`
    Group {
        /// Registry name of the group type
        type_name: String,
    },
}

/// One child in a message or group definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSpec {
    /// Name as it appears in the parent
    pub name: String,
    /// Segment or group
    pub kind: ChildKind,
    /// Whether more than one repetition is allowed
    pub repeating: bool,
    /// Whether at least one repetition is expected
    pub required: bool,
    /// Whether this child is one alternative of a choice
    pub choice: bool,
}

impl ChildSpec {
    /// A required, non-repeating segment child
    pub fn segment(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChildKind::Segment,
            repeating: false,
            required: true,
            choice: false,
        }
    }

    /// A required, non-repeating group child
    pub fn group(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChildKind::Group {
                type_name: type_name.into(),
            },
            repeating: false,
            required: true,
            choice: false,
        }
    }

    /// Mark the child as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark the child as repeating
    pub fn repeating(mut self) -> Self {
        self.repeating = true;
        self
    }

    /// Mark the child as one alternative of a choice
    pub fn choice(mut self) -> Self {
        self.choice = true;
        self
    }

    /// Name used for registry lookups
    pub fn type_name(&self) -> &str {
        match &self.kind {
            ChildKind::Segment => &self.name,
            ChildKind::Group { type_name } => type_name,
        }
    }

    /// Whether this child is a segment
    pub fn is_segment(&self) -> bool {
        matches!(self.kind, ChildKind::Segment)
    }
}

/// Ordered children of a message or group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSchema {
    /// Registry name of the structure
    pub name: String,
    /// Children in grammar order
    pub children: Vec<ChildSpec>,
}

/// Message structures share the group layout
pub type MessageSchema = GroupSchema;

impl GroupSchema {
    /// Create a schema from its children
    pub fn new(name: impl Into<String>, children: Vec<ChildSpec>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }
}

/// Description of one field position in a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Human readable field name
    pub name: String,
    /// Declared data type, `varies` when another field selects it
    pub data_type: String,
    /// Maximum number of repetitions, 0 for unbounded
    pub max_repetitions: usize,
    /// Whether the field is required
    pub required: bool,
    /// 1-based number of the field that names this field's data type
    pub type_selector: Option<usize>,
}

impl FieldSchema {
    /// Create an optional, non-repeating field
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            max_repetitions: 1,
            required: false,
            type_selector: None,
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the repetition limit (0 for unbounded)
    pub fn repetitions(mut self, max: usize) -> Self {
        self.max_repetitions = max;
        self
    }

    /// Let field `selector` name the data type of this field
    pub fn varies_by(mut self, selector: usize) -> Self {
        self.data_type = "varies".to_string();
        self.type_selector = Some(selector);
        self
    }
}

/// Field layout of a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSchema {
    /// Three character segment name
    pub name: String,
    /// Field descriptions, index 0 is field 1
    pub fields: Vec<FieldSchema>,
}

impl SegmentSchema {
    /// Create a schema from its fields
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Field description by 1-based number
    pub fn field(&self, number: usize) -> Option<&FieldSchema> {
        number.checked_sub(1).and_then(|i| self.fields.get(i))
    }
}

/// Component layout of a data type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTypeSchema {
    /// Data type name
    pub name: String,
    /// Data type names of the components; empty for primitives
    pub components: Vec<String>,
}

impl DataTypeSchema {
    /// Create a data type from its component type names
    pub fn new(name: impl Into<String>, components: &[&str]) -> Self {
        Self {
            name: name.into(),
            components: components.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Whether the type has no components
    pub fn is_primitive(&self) -> bool {
        self.components.is_empty()
    }
}
