//! Segment values

use super::field::{Field, trim_trailing};
use crate::registry::{DataTypeSchema, FieldSchema, SegmentSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One segment: a name and its fields
///
/// Field numbers are 1-based as in the HL7 standard. For control segments
/// field 1 holds the field separator and field 2 the literal encoding
/// characters.
///
/// The segment schema and the data types resolved for `varies` fields are
/// metadata; they are not part of equality or serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    name: String,
    fields: Vec<Field>,
    #[serde(skip)]
    schema: Option<Arc<SegmentSchema>>,
    #[serde(skip)]
    resolved_types: BTreeMap<usize, Arc<DataTypeSchema>>,
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl Eq for Segment {}

impl Segment {
    /// Create an empty segment without field metadata
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_schema(name, None)
    }

    /// Create an empty segment with field metadata
    pub fn from_schema(name: impl Into<String>, schema: Option<Arc<SegmentSchema>>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            schema,
            resolved_types: BTreeMap::new(),
        }
    }

    /// Three character segment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields; index 0 is field 1
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields up to the last non-empty one
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Field by 1-based number
    pub fn field(&self, number: usize) -> Option<&Field> {
        number.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    /// Replace a field by 1-based number
    pub fn set_field(&mut self, number: usize, field: Field) {
        let index = number.saturating_sub(1);
        if self.fields.len() <= index {
            self.fields.resize_with(index + 1, Field::default);
        }
        self.fields[index] = field;
        self.normalize();
    }

    /// Value at field (1-based), repetition (0-based), component and
    /// subcomponent (1-based)
    pub fn value(
        &self,
        field: usize,
        repetition: usize,
        component: usize,
        subcomponent: usize,
    ) -> Option<&str> {
        self.field(field)?.value(repetition, component, subcomponent)
    }

    /// Set the value at field (1-based), repetition (0-based), component and
    /// subcomponent (1-based)
    ///
    /// Missing positions are created empty. A 0 field, component or
    /// subcomponent number addresses the first one.
    pub fn set_value(
        &mut self,
        field: usize,
        repetition: usize,
        component: usize,
        subcomponent: usize,
        value: impl Into<String>,
    ) {
        let index = field.saturating_sub(1);
        if self.fields.len() <= index {
            self.fields.resize_with(index + 1, Field::default);
        }
        self.fields[index].set_value(repetition, component, subcomponent, value);
        self.normalize();
    }

    /// Whether the segment carries no field content
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field layout from the registry, if known
    pub fn schema(&self) -> Option<&Arc<SegmentSchema>> {
        self.schema.as_ref()
    }

    fn field_schema(&self, number: usize) -> Option<&FieldSchema> {
        self.schema.as_ref()?.field(number)
    }

    /// Field name from the registry
    pub fn field_name(&self, number: usize) -> Option<&str> {
        self.field_schema(number).map(|f| f.name.as_str())
    }

    /// Effective data type of a field
    ///
    /// For `varies` fields this is the type resolved during decoding, or
    /// `None` if the selecting field named no known type.
    pub fn field_data_type(&self, number: usize) -> Option<&str> {
        if let Some(resolved) = self.resolved_types.get(&number) {
            return Some(&resolved.name);
        }
        self.field_schema(number)
            .filter(|f| f.type_selector.is_none())
            .map(|f| f.data_type.as_str())
    }

    /// Component layout resolved for a `varies` field
    pub fn resolved_type(&self, number: usize) -> Option<&Arc<DataTypeSchema>> {
        self.resolved_types.get(&number)
    }

    /// Repetition limit of a field, 0 for unbounded, `None` if unknown
    pub fn max_repetitions(&self, number: usize) -> Option<usize> {
        self.field_schema(number).map(|f| f.max_repetitions)
    }

    pub(crate) fn set_resolved_type(&mut self, number: usize, data_type: Arc<DataTypeSchema>) {
        self.resolved_types.insert(number, data_type);
    }

    pub(crate) fn set_fields(&mut self, fields: Vec<Field>) {
        self.fields = fields;
        self.normalize();
    }

    fn normalize(&mut self) {
        trim_trailing(&mut self.fields, Field::is_empty);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Repetition;

    fn obx_schema() -> Arc<SegmentSchema> {
        Arc::new(SegmentSchema::new(
            "OBX",
            vec![
                FieldSchema::new("Set ID", "SI"),
                FieldSchema::new("Value Type", "ID"),
                FieldSchema::new("Observation Identifier", "CE"),
                FieldSchema::new("Observation Sub-ID", "ST"),
                FieldSchema::new("Observation Value", "varies")
                    .varies_by(2)
                    .repetitions(0),
            ],
        ))
    }

    #[test]
    fn test_set_and_get_values() {
        let mut segment = Segment::new("PID");
        segment.set_value(5, 0, 1, 1, "Smith");
        segment.set_value(5, 0, 2, 1, "John");
        segment.set_value(3, 1, 1, 1, "MRN2");

        assert_eq!(segment.value(5, 0, 1, 1), Some("Smith"));
        assert_eq!(segment.value(5, 0, 2, 1), Some("John"));
        assert_eq!(segment.value(3, 0, 1, 1), None);
        assert_eq!(segment.value(3, 1, 1, 1), Some("MRN2"));
        assert_eq!(segment.field_count(), 5);
        assert!(segment.field(4).is_some_and(Field::is_empty));
    }

    #[test]
    fn test_clearing_last_field_shrinks() {
        let mut segment = Segment::new("NTE");
        segment.set_value(1, 0, 1, 1, "1");
        segment.set_value(3, 0, 1, 1, "comment");
        segment.set_value(3, 0, 1, 1, "");
        assert_eq!(segment.field_count(), 1);
        segment.set_field(1, Field::default());
        assert!(segment.is_empty());
    }

    #[test]
    fn test_equality_ignores_metadata() {
        let mut plain = Segment::new("OBX");
        let mut typed = Segment::from_schema("OBX", Some(obx_schema()));
        plain.set_value(2, 0, 1, 1, "ST");
        typed.set_value(2, 0, 1, 1, "ST");
        typed.set_resolved_type(5, Arc::new(DataTypeSchema::new("ST", &[])));
        assert_eq!(plain, typed);
    }

    #[test]
    fn test_field_metadata() {
        let mut segment = Segment::from_schema("OBX", Some(obx_schema()));
        assert_eq!(segment.field_name(3), Some("Observation Identifier"));
        assert_eq!(segment.field_data_type(3), Some("CE"));
        assert_eq!(segment.field_data_type(5), None);
        assert_eq!(segment.max_repetitions(5), Some(0));
        assert_eq!(segment.field_name(20), None);

        segment.set_resolved_type(5, Arc::new(DataTypeSchema::new("NM", &[])));
        assert_eq!(segment.field_data_type(5), Some("NM"));
        assert!(segment.resolved_type(5).is_some_and(|t| t.is_primitive()));
    }

    #[test]
    fn test_serde_skips_metadata() {
        let mut segment = Segment::from_schema("OBX", Some(obx_schema()));
        segment.set_field(
            5,
            Field::from_repetitions(vec![Repetition::new("1"), Repetition::new("2")]),
        );
        let json = serde_json::to_string(&segment).expect("Serialization should succeed");
        assert!(!json.contains("schema"));
        let back: Segment = serde_json::from_str(&json).expect("Deserialization should succeed");
        assert_eq!(back, segment);
        assert!(back.schema().is_none());
    }
}
