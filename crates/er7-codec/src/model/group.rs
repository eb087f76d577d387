//! Groups, slots and the message tree

use super::Segment;
use crate::grammar::StructureDefinition;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A segment or a nested group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Structure {
    /// Leaf
    Segment(Segment),
    /// Interior node
    Group(Group),
}

impl Structure {
    /// Segment or group name
    pub fn name(&self) -> &str {
        match self {
            Self::Segment(segment) => segment.name(),
            Self::Group(group) => group.name(),
        }
    }

    /// The segment, if this is one
    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Self::Segment(segment) => Some(segment),
            Self::Group(_) => None,
        }
    }

    /// The segment, if this is one
    pub fn as_segment_mut(&mut self) -> Option<&mut Segment> {
        match self {
            Self::Segment(segment) => Some(segment),
            Self::Group(_) => None,
        }
    }

    /// The group, if this is one
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Segment(_) => None,
        }
    }

    /// The group, if this is one
    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Segment(_) => None,
        }
    }

    /// Whether no segment below this structure carries content
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Segment(segment) => segment.is_empty(),
            Self::Group(group) => group.is_empty(),
        }
    }
}

/// Whether a slot holds segments or groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// Segment repetitions
    Segment,
    /// Group repetitions
    Group,
}

/// One named child position of a group and its repetitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    name: String,
    structure: String,
    kind: SlotKind,
    repeating: bool,
    required: bool,
    non_standard: bool,
    repetitions: Vec<Structure>,
    #[serde(skip)]
    prototype: Option<Arc<Structure>>,
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.structure == other.structure
            && self.kind == other.kind
            && self.repeating == other.repeating
            && self.required == other.required
            && self.non_standard == other.non_standard
            && self.repetitions == other.repetitions
    }
}

impl Eq for Slot {}

impl Slot {
    pub(crate) fn from_definition(
        definition: &StructureDefinition,
        prototype: Arc<Structure>,
    ) -> Self {
        Self {
            name: definition.name_in_parent().to_string(),
            structure: definition.name().to_string(),
            kind: if definition.is_segment() {
                SlotKind::Segment
            } else {
                SlotKind::Group
            },
            repeating: definition.is_repeating(),
            required: definition.is_required(),
            non_standard: false,
            repetitions: Vec::new(),
            prototype: Some(prototype),
        }
    }

    /// Slot for a segment the grammar does not declare
    ///
    /// Non-standard slots accept any number of repetitions.
    pub fn non_standard(name: impl Into<String>, segment: &str) -> Self {
        Self {
            name: name.into(),
            structure: segment.to_string(),
            kind: SlotKind::Segment,
            repeating: true,
            required: false,
            non_standard: true,
            repetitions: Vec::new(),
            prototype: Some(Arc::new(Structure::Segment(Segment::new(segment)))),
        }
    }

    /// Name unique within the parent (`NTE`, `NTE2`, ...)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Segment name or group name of the repetitions
    pub fn structure_name(&self) -> &str {
        &self.structure
    }

    /// Segment or group
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Whether more than one repetition is allowed
    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    /// Whether the grammar requires at least one repetition
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the slot was added for a segment the grammar does not declare
    pub fn is_non_standard(&self) -> bool {
        self.non_standard
    }

    /// Repetitions in order
    pub fn repetitions(&self) -> &[Structure] {
        &self.repetitions
    }

    fn new_instance(&self) -> Structure {
        match (&self.prototype, self.kind) {
            (Some(prototype), _) => (**prototype).clone(),
            (None, SlotKind::Segment) => Structure::Segment(Segment::new(&self.structure)),
            (None, SlotKind::Group) => Structure::Group(Group::new(&self.structure)),
        }
    }

    /// Repetition `index`, creating empty repetitions up to it
    pub fn ensure(&mut self, index: usize) -> &mut Structure {
        while self.repetitions.len() <= index {
            let instance = self.new_instance();
            self.repetitions.push(instance);
        }
        &mut self.repetitions[index]
    }

    /// Append an empty repetition
    pub fn push(&mut self) -> &mut Structure {
        let index = self.repetitions.len();
        self.ensure(index)
    }
}

/// A group: ordered slots, one per child of its grammar node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    name: String,
    slots: Vec<Slot>,
}

impl Group {
    /// Group without slots
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_slots(name, Vec::new())
    }

    /// Group with the given slots
    pub fn with_slots(name: impl Into<String>, slots: Vec<Slot>) -> Self {
        Self {
            name: name.into(),
            slots,
        }
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slots in order
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slot by name
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// Slot by name
    pub fn slot_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|slot| slot.name == name)
    }

    /// Position of a slot
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name == name)
    }

    /// Repetition `repetition` of slot `name`
    pub fn get(&self, name: &str, repetition: usize) -> Option<&Structure> {
        self.slot(name)?.repetitions.get(repetition)
    }

    /// Repetition `repetition` of slot `name`
    pub fn get_mut(&mut self, name: &str, repetition: usize) -> Option<&mut Structure> {
        self.slot_mut(name)?.repetitions.get_mut(repetition)
    }

    /// All repetitions of slot `name`; empty if there is no such slot
    pub fn get_all(&self, name: &str) -> &[Structure] {
        self.slot(name).map_or(&[], |slot| slot.repetitions.as_slice())
    }

    /// Segment repetition of slot `name`
    pub fn segment(&self, name: &str, repetition: usize) -> Option<&Segment> {
        self.get(name, repetition)?.as_segment()
    }

    /// Segment repetition of slot `name`
    pub fn segment_mut(&mut self, name: &str, repetition: usize) -> Option<&mut Segment> {
        self.get_mut(name, repetition)?.as_segment_mut()
    }

    /// Group repetition of slot `name`
    pub fn group(&self, name: &str, repetition: usize) -> Option<&Group> {
        self.get(name, repetition)?.as_group()
    }

    /// Group repetition of slot `name`
    pub fn group_mut(&mut self, name: &str, repetition: usize) -> Option<&mut Group> {
        self.get_mut(name, repetition)?.as_group_mut()
    }

    /// Segment repetition of slot `name`, creating empty repetitions up to it
    pub fn ensure_segment(&mut self, name: &str, repetition: usize) -> Option<&mut Segment> {
        self.slot_mut(name)?.ensure(repetition).as_segment_mut()
    }

    /// Group repetition of slot `name`, creating empty repetitions up to it
    pub fn ensure_group(&mut self, name: &str, repetition: usize) -> Option<&mut Group> {
        self.slot_mut(name)?.ensure(repetition).as_group_mut()
    }

    /// Slot name not yet used in this group: `base`, then `base2`, `base3`...
    pub fn unique_name(&self, base: &str) -> String {
        if self.slot(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| self.slot(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Insert a slot for a segment the grammar does not declare
    ///
    /// The slot lands at `index` (clamped to the number of slots) and gets a
    /// name unique in this group, which is returned.
    pub fn add_non_standard_segment(&mut self, segment: &str, index: usize) -> String {
        let name = self.unique_name(segment);
        let index = index.min(self.slots.len());
        self.slots
            .insert(index, Slot::non_standard(name.clone(), segment));
        name
    }

    /// Every segment below this group in message order
    pub fn segments(&self) -> Vec<&Segment> {
        let mut out = Vec::new();
        self.collect_segments(&mut out);
        out
    }

    fn collect_segments<'a>(&'a self, out: &mut Vec<&'a Segment>) {
        for slot in &self.slots {
            for structure in &slot.repetitions {
                match structure {
                    Structure::Segment(segment) => out.push(segment),
                    Structure::Group(group) => group.collect_segments(out),
                }
            }
        }
    }

    /// First segment named `name` below this group, depth first
    pub fn find_segment(&self, name: &str) -> Option<&Segment> {
        self.segments()
            .into_iter()
            .find(|segment| segment.name() == name)
    }

    /// Whether no segment below this group carries content
    pub fn is_empty(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| slot.repetitions.iter().all(Structure::is_empty))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Group {
        let mut inner = Group::with_slots(
            "OBSERVATION",
            vec![Slot::non_standard("OBX", "OBX"), Slot::non_standard("NTE", "NTE")],
        );
        inner
            .ensure_segment("OBX", 0)
            .expect("Test operation should succeed")
            .set_value(1, 0, 1, 1, "1");

        let mut group = Group::with_slots(
            "ORU_R01",
            vec![
                Slot::non_standard("MSH", "MSH"),
                Slot {
                    name: "OBSERVATION".to_string(),
                    structure: "OBSERVATION".to_string(),
                    kind: SlotKind::Group,
                    repeating: true,
                    required: false,
                    non_standard: false,
                    repetitions: Vec::new(),
                    prototype: Some(Arc::new(Structure::Group(inner))),
                },
            ],
        );
        group
            .ensure_segment("MSH", 0)
            .expect("Test operation should succeed")
            .set_value(3, 0, 1, 1, "APP");
        group
    }

    #[test]
    fn test_ensure_creates_repetitions() {
        let mut group = sample();
        assert!(group.get_all("OBSERVATION").is_empty());

        let second = group
            .ensure_group("OBSERVATION", 1)
            .expect("Test operation should succeed");
        assert_eq!(second.name(), "OBSERVATION");
        assert_eq!(group.get_all("OBSERVATION").len(), 2);
        // Each repetition starts from the prototype's content
        assert_eq!(
            group
                .group("OBSERVATION", 0)
                .and_then(|g| g.segment("OBX", 0))
                .and_then(|s| s.value(1, 0, 1, 1)),
            Some("1")
        );
    }

    #[test]
    fn test_wrong_kind_returns_none() {
        let mut group = sample();
        assert!(group.ensure_group("MSH", 0).is_none());
        assert!(group.ensure_segment("OBSERVATION", 0).is_none());
        assert!(group.ensure_segment("PID", 0).is_none());
        assert!(group.get_all("PID").is_empty());
    }

    #[test]
    fn test_non_standard_names_are_unique() {
        let mut group = sample();
        let first = group.add_non_standard_segment("ZPI", 1);
        let second = group.add_non_standard_segment("ZPI", 99);
        let third = group.add_non_standard_segment("MSH", 0);
        assert_eq!(first, "ZPI");
        assert_eq!(second, "ZPI2");
        assert_eq!(third, "MSH2");

        let names: Vec<&str> = group.slots().iter().map(Slot::name).collect();
        assert_eq!(names, vec!["MSH2", "MSH", "ZPI", "OBSERVATION", "ZPI2"]);
        assert!(group.slot("ZPI2").is_some_and(Slot::is_non_standard));
        assert!(group.slot("ZPI2").is_some_and(Slot::is_repeating));
    }

    #[test]
    fn test_segments_in_order() {
        let mut group = sample();
        group
            .ensure_group("OBSERVATION", 1)
            .and_then(|g| g.ensure_segment("NTE", 0))
            .expect("Test operation should succeed")
            .set_value(3, 0, 1, 1, "note");

        let names: Vec<&str> = group.segments().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["MSH", "OBX", "OBX", "NTE"]);
        assert!(group.find_segment("NTE").is_some());
        assert!(group.find_segment("PID").is_none());
        assert!(!group.is_empty());
    }

    #[test]
    fn test_empty_group() {
        let mut group = Group::with_slots("G", vec![Slot::non_standard("NTE", "NTE")]);
        assert!(group.is_empty());
        group.ensure_segment("NTE", 0);
        assert!(group.is_empty());
    }
}
