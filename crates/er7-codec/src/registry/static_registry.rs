//! Table-driven registry

use super::{
    DataTypeSchema, GroupSchema, MessageSchema, SegmentSchema, StructureKind, StructureRegistry,
    StructureType,
};
use crate::error::{Er7Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Registry backed by in-memory lookup tables
///
/// Structures are keyed by (kind, version, name). Message aliases map an
/// event-derived name such as `ADT_A04` to the structure that defines it.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    versions: BTreeSet<String>,
    structures: HashMap<(StructureKind, String, String), StructureType>,
    aliases: HashMap<(String, String), String>,
}

impl StaticRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a version as supported even if it has no structures yet
    pub fn add_version(&mut self, version: &str) -> &mut Self {
        self.versions.insert(version.to_string());
        self
    }

    /// Register a structure for a version
    pub fn register(&mut self, version: &str, structure: StructureType) -> &mut Self {
        self.add_version(version);
        let key = (
            structure.kind(),
            version.to_string(),
            structure.name().to_string(),
        );
        self.structures.insert(key, structure);
        self
    }

    /// Register a message schema
    pub fn message(&mut self, version: &str, schema: MessageSchema) -> &mut Self {
        self.register(version, StructureType::Message(Arc::new(schema)))
    }

    /// Register a group schema
    pub fn group(&mut self, version: &str, schema: GroupSchema) -> &mut Self {
        self.register(version, StructureType::Group(Arc::new(schema)))
    }

    /// Register a segment schema
    pub fn segment(&mut self, version: &str, schema: SegmentSchema) -> &mut Self {
        self.register(version, StructureType::Segment(Arc::new(schema)))
    }

    /// Register a data type schema
    pub fn data_type(&mut self, version: &str, schema: DataTypeSchema) -> &mut Self {
        self.register(version, StructureType::DataType(Arc::new(schema)))
    }

    /// Map an event-derived message name onto a registered structure
    pub fn alias(&mut self, version: &str, event: &str, structure: &str) -> &mut Self {
        self.aliases
            .insert((version.to_string(), event.to_string()), structure.to_string());
        self
    }

    /// Supported versions in ascending order
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(String::as_str)
    }

    /// Number of registered structures across all versions
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    /// Whether no structures are registered
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    fn lookup(&self, kind: StructureKind, name: &str, version: &str) -> Result<&StructureType> {
        if !self.versions.contains(version) {
            return Err(Er7Error::UnsupportedVersion(version.to_string()));
        }
        self.structures
            .get(&(kind, version.to_string(), name.to_string()))
            .ok_or_else(|| Er7Error::UnresolvableStructure {
                kind,
                name: name.to_string(),
                version: version.to_string(),
            })
    }
}

fn kind_mismatch(structure: &StructureType, version: &str) -> Er7Error {
    Er7Error::UnresolvableStructure {
        kind: structure.kind(),
        name: structure.name().to_string(),
        version: version.to_string(),
    }
}

impl StructureRegistry for StaticRegistry {
    fn supports_version(&self, version: &str) -> bool {
        self.versions.contains(version)
    }

    fn resolve_message_type(
        &self,
        name: &str,
        version: &str,
        explicit: bool,
    ) -> Result<Arc<MessageSchema>> {
        let target = if explicit {
            name
        } else {
            self.aliases
                .get(&(version.to_string(), name.to_string()))
                .map_or(name, String::as_str)
        };
        match self.lookup(StructureKind::Message, target, version)? {
            StructureType::Message(schema) => Ok(Arc::clone(schema)),
            other => Err(kind_mismatch(other, version)),
        }
    }

    fn resolve_group_type(&self, name: &str, version: &str) -> Result<Arc<GroupSchema>> {
        match self.lookup(StructureKind::Group, name, version)? {
            StructureType::Group(schema) => Ok(Arc::clone(schema)),
            other => Err(kind_mismatch(other, version)),
        }
    }

    fn resolve_segment_type(&self, name: &str, version: &str) -> Result<Arc<SegmentSchema>> {
        match self.lookup(StructureKind::Segment, name, version)? {
            StructureType::Segment(schema) => Ok(Arc::clone(schema)),
            other => Err(kind_mismatch(other, version)),
        }
    }

    fn resolve_data_type(&self, name: &str, version: &str) -> Result<Arc<DataTypeSchema>> {
        match self.lookup(StructureKind::DataType, name, version)? {
            StructureType::DataType(schema) => Ok(Arc::clone(schema)),
            other => Err(kind_mismatch(other, version)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::{ChildSpec, FieldSchema};

    fn registry() -> StaticRegistry {
        let mut registry = StaticRegistry::new();
        registry
            .message(
                "2.5",
                GroupSchema::new(
                    "ADT_A01",
                    vec![ChildSpec::segment("MSH"), ChildSpec::segment("PID")],
                ),
            )
            .segment(
                "2.5",
                SegmentSchema::new("PID", vec![FieldSchema::new("Set ID", "SI")]),
            )
            .data_type("2.5", DataTypeSchema::new("ST", &[]))
            .alias("2.5", "ADT_A04", "ADT_A01");
        registry
    }

    #[test]
    fn test_resolve_message_direct() {
        let schema = registry()
            .resolve_message_type("ADT_A01", "2.5", true)
            .expect("Test operation should succeed");
        assert_eq!(schema.children.len(), 2);
    }

    #[test]
    fn test_alias_only_for_event_names() {
        let registry = registry();
        let schema = registry
            .resolve_message_type("ADT_A04", "2.5", false)
            .expect("Test operation should succeed");
        assert_eq!(schema.name, "ADT_A01");

        // An explicit structure name is taken literally
        let result = registry.resolve_message_type("ADT_A04", "2.5", true);
        assert!(matches!(
            result,
            Err(Er7Error::UnresolvableStructure {
                kind: StructureKind::Message,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_version() {
        let registry = registry();
        assert!(!registry.supports_version("2.9"));
        let result = registry.resolve_segment_type("PID", "2.9");
        assert_eq!(result, Err(Er7Error::UnsupportedVersion("2.9".to_string())));
    }

    #[test]
    fn test_kinds_are_separate_namespaces() {
        let registry = registry();
        assert!(registry.resolve_segment_type("PID", "2.5").is_ok());
        assert!(registry.resolve_group_type("PID", "2.5").is_err());
        assert!(registry.resolve_data_type("ST", "2.5").is_ok());
        assert!(registry.resolve_segment_type("ST", "2.5").is_err());
    }

    #[test]
    fn test_versions_listed_in_order() {
        let mut registry = registry();
        registry.add_version("2.3");
        let versions: Vec<&str> = registry.versions().collect();
        assert_eq!(versions, vec!["2.3", "2.5"]);
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_shared_through_arc() {
        let registry: Arc<dyn StructureRegistry> = Arc::new(registry());
        assert!(registry.supports_version("2.5"));
        assert!(registry.resolve_message_type("ADT_A01", "2.5", true).is_ok());
    }
}
