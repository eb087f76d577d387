//! Grammar tree and its traversal facts
//!
//! A [`Grammar`] stores its nodes in a flat arena indexed by [`NodeId`]. Parent
//! and sibling links are plain indices, so navigation never needs shared
//! ownership or interior pointers. The facts the message iterator asks for on
//! every step (following leaves, possible first children) are computed on
//! first use and kept in per-node [`OnceLock`] cells; a grammar can be shared
//! between threads as soon as it is built.

use crate::model::{Group, Segment, Slot, Structure};
use crate::registry::{ChildSpec, SegmentSchema};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

/// Index of a node in its grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The message node every grammar starts with
    pub const ROOT: Self = Self(0);

    /// Position in the arena
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Segment or group
#[derive(Debug, Clone)]
pub enum DefinitionKind {
    /// Leaf node, with the field layout if the registry knows it
    Segment {
        /// Field layout from the registry
        schema: Option<Arc<SegmentSchema>>,
    },
    /// Interior node
    Group,
}

/// One node of a message grammar
#[derive(Debug)]
pub struct StructureDefinition {
    name: String,
    name_in_parent: String,
    type_name: String,
    kind: DefinitionKind,
    repeating: bool,
    required: bool,
    choice: bool,
    parent: Option<NodeId>,
    position: usize,
    children: Vec<NodeId>,

    next_leaf: OnceLock<Option<NodeId>>,
    following: OnceLock<BTreeSet<String>>,
    first_children: OnceLock<BTreeSet<String>>,
    all_child_names: OnceLock<BTreeSet<String>>,
    prototype: OnceLock<Arc<Structure>>,
}

impl StructureDefinition {
    fn new(
        name: String,
        name_in_parent: String,
        type_name: String,
        kind: DefinitionKind,
        parent: Option<NodeId>,
        position: usize,
    ) -> Self {
        Self {
            name,
            name_in_parent,
            type_name,
            kind,
            repeating: false,
            required: true,
            choice: false,
            parent,
            position,
            children: Vec::new(),
            next_leaf: OnceLock::new(),
            following: OnceLock::new(),
            first_children: OnceLock::new(),
            all_child_names: OnceLock::new(),
            prototype: OnceLock::new(),
        }
    }

    /// Segment name, or group name for interior nodes
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name unique among siblings (`ROL`, `ROL2`, ...)
    pub fn name_in_parent(&self) -> &str {
        &self.name_in_parent
    }

    /// Registry name the node was resolved from
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether this node is a leaf
    pub fn is_segment(&self) -> bool {
        matches!(self.kind, DefinitionKind::Segment { .. })
    }

    /// Segment field layout, for leaves the registry knows
    pub fn segment_schema(&self) -> Option<&Arc<SegmentSchema>> {
        match &self.kind {
            DefinitionKind::Segment { schema } => schema.as_ref(),
            DefinitionKind::Group => None,
        }
    }

    /// Whether more than one repetition is allowed
    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    /// Whether at least one repetition is expected
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether this node is one alternative of a choice
    pub fn is_choice_element(&self) -> bool {
        self.choice
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Index among the parent's children
    pub fn position(&self) -> usize {
        self.position
    }

    /// Child nodes in grammar order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Immutable grammar of one message structure and version
#[derive(Debug)]
pub struct Grammar {
    structure: String,
    version: String,
    generic: bool,
    nodes: Vec<StructureDefinition>,
}

impl Grammar {
    /// Create a grammar holding only its root node
    pub(crate) fn new(structure: &str, version: &str) -> Self {
        let root = StructureDefinition::new(
            structure.to_string(),
            structure.to_string(),
            structure.to_string(),
            DefinitionKind::Group,
            None,
            0,
        );
        Self {
            structure: structure.to_string(),
            version: version.to_string(),
            generic: false,
            nodes: vec![root],
        }
    }

    /// Grammar for a message whose structure is unknown: the header segment
    /// and nothing else
    ///
    /// Every other segment is placed as a non-standard segment at the top
    /// level.
    pub fn generic(
        structure: &str,
        version: &str,
        header: &str,
        schema: Option<Arc<SegmentSchema>>,
    ) -> Self {
        let mut grammar = Self::new(structure, version);
        grammar.generic = true;
        grammar.add_child(
            NodeId::ROOT,
            &ChildSpec::segment(header),
            header.to_string(),
            schema,
        );
        grammar
    }

    /// Append a child under `parent`
    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        child: &ChildSpec,
        name_in_parent: String,
        schema: Option<Arc<SegmentSchema>>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let position = self.nodes[parent.0].children.len();
        let kind = if child.is_segment() {
            DefinitionKind::Segment { schema }
        } else {
            DefinitionKind::Group
        };

        let mut node = StructureDefinition::new(
            child.name.clone(),
            name_in_parent,
            child.type_name().to_string(),
            kind,
            Some(parent),
            position,
        );
        node.repeating = child.repeating;
        node.required = child.required;
        node.choice = child.choice;

        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Message structure name (e.g. `ORU_R01`)
    pub fn structure(&self) -> &str {
        &self.structure
    }

    /// HL7 version the grammar was built for
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether this is a placeholder grammar for an unknown structure
    pub fn is_generic(&self) -> bool {
        self.generic
    }

    /// The message node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Node by id
    ///
    /// Ids are only valid for the grammar that issued them.
    pub fn node(&self, id: NodeId) -> &StructureDefinition {
        &self.nodes[id.0]
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the grammar has only its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// All node ids in depth-first order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// First node whose name matches, in depth-first order
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.node_ids().find(|id| self.node(*id).name == name)
    }

    /// First child of a group
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    /// First child of this node's parent; the node itself for the root
    pub fn first_sibling(&self, id: NodeId) -> NodeId {
        self.node(id)
            .parent
            .and_then(|parent| self.first_child(parent))
            .unwrap_or(id)
    }

    /// Sibling directly after this node
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let parent = self.node(node.parent?);
        parent.children.get(node.position + 1).copied()
    }

    /// Whether no sibling follows this node; true for the root
    pub fn is_final_child_of_parent(&self, id: NodeId) -> bool {
        self.next_sibling(id).is_none()
    }

    /// Nearest leaf after this segment inside its parent, descending into
    /// later sibling groups; `None` for groups
    pub fn next_leaf(&self, id: NodeId) -> Option<NodeId> {
        if !self.node(id).is_segment() {
            return None;
        }
        *self.node(id).next_leaf.get_or_init(|| self.leaf_after(id))
    }

    fn leaf_after(&self, id: NodeId) -> Option<NodeId> {
        let mut sibling = self.next_sibling(id);
        while let Some(candidate) = sibling {
            if let Some(leaf) = self.first_leaf(candidate) {
                return Some(leaf);
            }
            sibling = self.next_sibling(candidate);
        }
        None
    }

    fn first_leaf(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        if node.is_segment() {
            return Some(id);
        }
        node.children.iter().find_map(|child| self.first_leaf(*child))
    }

    /// Segment names that may legally appear after this node
    ///
    /// Includes every leaf later in the enclosing groups up to the top level,
    /// plus the possible first children of every repeating ancestor (which may
    /// start another repetition).
    pub fn names_of_all_possible_following_leaves(&self, id: NodeId) -> &BTreeSet<String> {
        self.node(id).following.get_or_init(|| {
            let node = self.node(id);
            let mut names = BTreeSet::new();

            let after = if node.is_segment() {
                self.next_leaf(id)
            } else {
                self.leaf_after(id)
            };
            match after {
                Some(leaf) => {
                    names.insert(self.node(leaf).name.clone());
                    names.extend(
                        self.names_of_all_possible_following_leaves(leaf)
                            .iter()
                            .cloned(),
                    );
                }
                None => {
                    if let Some(parent) = node.parent
                        && parent != NodeId::ROOT
                    {
                        names.extend(
                            self.names_of_all_possible_following_leaves(parent)
                                .iter()
                                .cloned(),
                        );
                    }
                }
            }

            let mut ancestor = node.parent;
            while let Some(current) = ancestor {
                if self.node(current).repeating {
                    names.extend(self.all_possible_first_children(current).iter().cloned());
                }
                ancestor = self.node(current).parent;
            }
            names
        })
    }

    /// Segment names that can open this node
    ///
    /// For a segment this is its own name. For a group, children are walked
    /// in order until the first required child that is not a choice element.
    pub fn all_possible_first_children(&self, id: NodeId) -> &BTreeSet<String> {
        self.node(id).first_children.get_or_init(|| {
            let node = self.node(id);
            let mut names = BTreeSet::new();
            if node.is_segment() {
                names.insert(node.name.clone());
                return names;
            }
            for child in &node.children {
                names.extend(self.all_possible_first_children(*child).iter().cloned());
                let child = self.node(*child);
                if child.required && !child.choice {
                    break;
                }
            }
            names
        })
    }

    /// Every segment name anywhere under this node
    pub fn all_child_names(&self, id: NodeId) -> &BTreeSet<String> {
        self.node(id).all_child_names.get_or_init(|| {
            let node = self.node(id);
            let mut names = BTreeSet::new();
            if node.is_segment() {
                names.insert(node.name.clone());
            }
            for child in &node.children {
                names.extend(self.all_child_names(*child).iter().cloned());
            }
            names
        })
    }

    /// Empty instance of a node, shared by every message built from this
    /// grammar
    pub(crate) fn prototype(&self, id: NodeId) -> Arc<Structure> {
        Arc::clone(self.node(id).prototype.get_or_init(|| {
            let node = self.node(id);
            Arc::new(match &node.kind {
                DefinitionKind::Segment { schema } => {
                    Structure::Segment(Segment::from_schema(&node.name, schema.clone()))
                }
                DefinitionKind::Group => Structure::Group(self.empty_group(id)),
            })
        }))
    }

    fn empty_group(&self, id: NodeId) -> Group {
        let node = self.node(id);
        let slots = node
            .children
            .iter()
            .map(|child| Slot::from_definition(self.node(*child), self.prototype(*child)))
            .collect();
        Group::with_slots(&node.name, slots)
    }

    /// Empty message tree with one slot per top-level child
    pub fn instantiate(&self) -> Group {
        self.empty_group(NodeId::ROOT)
    }

    /// Render the grammar in the bracket notation of the HL7 standard:
    /// `[ ]` optional, `{ }` repeating, `< >` choice
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({})", self.structure, self.version);
        for child in &self.node(NodeId::ROOT).children {
            self.render_node(*child, 1, &mut out);
        }
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let mut label = node.name_in_parent.clone();
        if node.repeating {
            label = format!("{{ {label} }}");
        }
        if !node.required {
            label = format!("[ {label} ]");
        }
        if node.choice {
            label = format!("< {label} >");
        }
        let _ = writeln!(out, "{:indent$}{label}", "", indent = depth * 2);
        for child in &node.children {
            self.render_node(*child, depth + 1, out);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    /// MSH, GROUP1{ AAA, BBB, GROUP2{ AAA } } repeating, ZZZ optional
    fn sample() -> Grammar {
        let mut g = Grammar::new("TST_T01", "2.5");
        g.add_child(NodeId::ROOT, &ChildSpec::segment("MSH"), "MSH".into(), None);
        let group1 = g.add_child(
            NodeId::ROOT,
            &ChildSpec::group("GROUP1", "TST_T01_GROUP1").repeating(),
            "GROUP1".into(),
            None,
        );
        g.add_child(
            NodeId::ROOT,
            &ChildSpec::segment("ZZZ").optional(),
            "ZZZ".into(),
            None,
        );
        g.add_child(group1, &ChildSpec::segment("AAA"), "AAA".into(), None);
        g.add_child(
            group1,
            &ChildSpec::segment("BBB").optional(),
            "BBB".into(),
            None,
        );
        let group2 = g.add_child(
            group1,
            &ChildSpec::group("GROUP2", "TST_T01_GROUP2").optional(),
            "GROUP2".into(),
            None,
        );
        g.add_child(group2, &ChildSpec::segment("AAA"), "AAA".into(), None);
        g
    }

    #[test]
    fn test_navigation() {
        let g = sample();
        let msh = g.find("MSH").expect("Test operation should succeed");
        let group1 = g.find("GROUP1").expect("Test operation should succeed");
        let zzz = g.find("ZZZ").expect("Test operation should succeed");

        assert_eq!(g.next_sibling(msh), Some(group1));
        assert_eq!(g.next_sibling(group1), Some(zzz));
        assert!(g.is_final_child_of_parent(zzz));
        assert!(g.is_final_child_of_parent(NodeId::ROOT));
        assert_eq!(g.first_sibling(zzz), msh);
        assert_eq!(g.first_sibling(NodeId::ROOT), NodeId::ROOT);
        assert_eq!(g.node(zzz).position(), 2);
        assert_eq!(g.node(zzz).parent(), Some(NodeId::ROOT));
        assert_eq!(g.len(), 7);
    }

    #[test]
    fn test_next_leaf_descends_into_groups() {
        let g = sample();
        let msh = g.find("MSH").expect("Test operation should succeed");
        let group1 = g.find("GROUP1").expect("Test operation should succeed");
        let first_aaa = g.node(group1).children()[0];

        assert_eq!(g.next_leaf(msh), Some(first_aaa));
        assert_eq!(g.next_leaf(group1), None);

        let group2 = g.find("GROUP2").expect("Test operation should succeed");
        let inner_aaa = g.node(group2).children()[0];
        // Last leaf of a group has no next leaf inside that group
        assert_eq!(g.next_leaf(inner_aaa), None);
    }

    #[test]
    fn test_first_children_stop_at_required() {
        let g = sample();
        let group1 = g.find("GROUP1").expect("Test operation should succeed");
        assert_eq!(names(g.all_possible_first_children(group1)), vec!["AAA"]);
        assert_eq!(names(g.all_possible_first_children(NodeId::ROOT)), vec!["MSH"]);
    }

    #[test]
    fn test_first_children_through_optional_and_choice() {
        let mut g = Grammar::new("X", "2.5");
        let group = g.add_child(
            NodeId::ROOT,
            &ChildSpec::group("G", "X_G"),
            "G".into(),
            None,
        );
        g.add_child(group, &ChildSpec::segment("NTE").optional(), "NTE".into(), None);
        g.add_child(group, &ChildSpec::segment("OBR").choice(), "OBR".into(), None);
        g.add_child(group, &ChildSpec::segment("RXO").choice(), "RXO".into(), None);
        g.add_child(group, &ChildSpec::segment("ORC"), "ORC".into(), None);
        g.add_child(group, &ChildSpec::segment("OBX"), "OBX".into(), None);

        assert_eq!(
            names(g.all_possible_first_children(group)),
            vec!["NTE", "OBR", "ORC", "RXO"]
        );
    }

    #[test]
    fn test_following_leaves() {
        let g = sample();
        let msh = g.find("MSH").expect("Test operation should succeed");
        assert_eq!(
            names(g.names_of_all_possible_following_leaves(msh)),
            vec!["AAA", "BBB", "ZZZ"]
        );

        let group2 = g.find("GROUP2").expect("Test operation should succeed");
        let inner_aaa = g.node(group2).children()[0];
        // After the nested AAA only a new GROUP1 repetition or ZZZ can follow
        assert_eq!(
            names(g.names_of_all_possible_following_leaves(inner_aaa)),
            vec!["AAA", "ZZZ"]
        );

        let zzz = g.find("ZZZ").expect("Test operation should succeed");
        assert!(g.names_of_all_possible_following_leaves(zzz).is_empty());
    }

    #[test]
    fn test_all_child_names() {
        let g = sample();
        let group1 = g.find("GROUP1").expect("Test operation should succeed");
        assert_eq!(names(g.all_child_names(group1)), vec!["AAA", "BBB"]);
        assert_eq!(
            names(g.all_child_names(NodeId::ROOT)),
            vec!["AAA", "BBB", "MSH", "ZZZ"]
        );
    }

    #[test]
    fn test_facts_are_memoized() {
        let g = sample();
        let msh = g.find("MSH").expect("Test operation should succeed");
        let first = g.names_of_all_possible_following_leaves(msh) as *const _;
        let second = g.names_of_all_possible_following_leaves(msh) as *const _;
        assert_eq!(first, second);
    }

    #[test]
    fn test_render() {
        let g = sample();
        let expected = "TST_T01 (2.5)\n  MSH\n  { GROUP1 }\n    AAA\n    [ BBB ]\n    [ GROUP2 ]\n      AAA\n  [ ZZZ ]\n";
        assert_eq!(g.render(), expected);
    }

    #[test]
    fn test_generic_grammar() {
        let g = Grammar::generic("ZZZ_Z01", "2.5", "MSH", None);
        assert!(g.is_generic());
        assert_eq!(g.len(), 2);
        assert_eq!(names(g.all_possible_first_children(NodeId::ROOT)), vec!["MSH"]);
    }

    #[test]
    fn test_instantiate_has_one_slot_per_child() {
        let g = sample();
        let root = g.instantiate();
        let slot_names: Vec<&str> = root.slots().iter().map(Slot::name).collect();
        assert_eq!(slot_names, vec!["MSH", "GROUP1", "ZZZ"]);
        assert!(root.slots().iter().all(|slot| slot.repetitions().is_empty()));
    }
}
