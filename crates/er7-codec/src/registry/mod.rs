//! Structure registry
//!
//! The codec never hard-codes message layouts. A [`StructureRegistry`] maps a
//! (structure name, version) pair to the schema describing it. The grammar
//! builder asks for message and group schemas; the decoder asks for segment and
//! data type schemas when it attaches field metadata.
//!
//! [`StaticRegistry`] is a table-driven implementation, and
//! [`catalog::standard`] fills one with the common structures of HL7 v2.3
//! through v2.6.

pub mod catalog;
mod schema;
mod static_registry;

pub use schema::{
    ChildKind, ChildSpec, DataTypeSchema, FieldSchema, GroupSchema, MessageSchema, SegmentSchema,
    StructureKind,
};
pub use static_registry::StaticRegistry;

use crate::error::Result;
use std::sync::Arc;

/// A resolved structure of any kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureType {
    /// Message layout
    Message(Arc<MessageSchema>),
    /// Group layout
    Group(Arc<GroupSchema>),
    /// Segment field layout
    Segment(Arc<SegmentSchema>),
    /// Data type component layout
    DataType(Arc<DataTypeSchema>),
}

impl StructureType {
    /// Kind of the wrapped schema
    pub fn kind(&self) -> StructureKind {
        match self {
            Self::Message(_) => StructureKind::Message,
            Self::Group(_) => StructureKind::Group,
            Self::Segment(_) => StructureKind::Segment,
            Self::DataType(_) => StructureKind::DataType,
        }
    }

    /// Registry name of the wrapped schema
    pub fn name(&self) -> &str {
        match self {
            Self::Message(s) | Self::Group(s) => &s.name,
            Self::Segment(s) => &s.name,
            Self::DataType(s) => &s.name,
        }
    }
}

/// Maps structure names to schemas for a given HL7 version
///
/// Implementations are shared between threads by the parser, so lookups take
/// `&self` and return reference-counted schemas.
pub trait StructureRegistry: Send + Sync {
    /// Whether any structures are known for `version`
    fn supports_version(&self, version: &str) -> bool;

    /// Resolve a message structure
    ///
    /// When `explicit` is false the name was assembled from the message code
    /// and trigger event (e.g. `ADT_A04`) and may be an alias for a shared
    /// structure (`ADT_A01`).
    fn resolve_message_type(
        &self,
        name: &str,
        version: &str,
        explicit: bool,
    ) -> Result<Arc<MessageSchema>>;

    /// Resolve a group structure by its registry name
    fn resolve_group_type(&self, name: &str, version: &str) -> Result<Arc<GroupSchema>>;

    /// Resolve a segment structure
    fn resolve_segment_type(&self, name: &str, version: &str) -> Result<Arc<SegmentSchema>>;

    /// Resolve a data type
    fn resolve_data_type(&self, name: &str, version: &str) -> Result<Arc<DataTypeSchema>>;
}

impl<T: StructureRegistry + ?Sized> StructureRegistry for Arc<T> {
    fn supports_version(&self, version: &str) -> bool {
        (**self).supports_version(version)
    }

    fn resolve_message_type(
        &self,
        name: &str,
        version: &str,
        explicit: bool,
    ) -> Result<Arc<MessageSchema>> {
        (**self).resolve_message_type(name, version, explicit)
    }

    fn resolve_group_type(&self, name: &str, version: &str) -> Result<Arc<GroupSchema>> {
        (**self).resolve_group_type(name, version)
    }

    fn resolve_segment_type(&self, name: &str, version: &str) -> Result<Arc<SegmentSchema>> {
        (**self).resolve_segment_type(name, version)
    }

    fn resolve_data_type(&self, name: &str, version: &str) -> Result<Arc<DataTypeSchema>> {
        (**self).resolve_data_type(name, version)
    }
}
