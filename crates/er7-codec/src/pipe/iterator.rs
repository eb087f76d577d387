//! Grammar-directed placement of incoming segments
//!
//! The iterator keeps a path from the message root to the current grammar
//! position. Each path element records a node and the repetition of it that
//! is currently open (`None` while the position has been reached but not yet
//! entered). Given the name of the next segment in the text, [`advance`]
//! walks the grammar forward from the current position until it finds a node
//! that can take it:
//!
//! 1. a segment of that name that repeats or has not been entered yet;
//! 2. a group whose possible first children include the name and that
//!    repeats or has not been entered yet, which is entered;
//! 3. otherwise the next sibling, or the parent once the last sibling is
//!    passed.
//!
//! A position whose following leaves cannot contain the name ends the search
//! early. The segment is then unexpected and, depending on
//! [`UnexpectedSegmentBehavior`], either fails the decode or gets a
//! non-standard slot next to the current position (or at the top level).
//!
//! In non-greedy mode a nearer repeating ancestor whose first children
//! include the name is preferred over later sibling positions, so the segment
//! opens a new repetition of that ancestor.
//!
//! [`advance`]: MessageIterator::advance

use crate::error::{Er7Error, Result};
use crate::grammar::{Grammar, NodeId};
use crate::model::{Group, Segment};
use crate::options::{ParserOptions, UnexpectedSegmentBehavior};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRef {
    Grammar(NodeId),
    NonStandard(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    node: NodeRef,
    repetition: Option<usize>,
}

impl Position {
    const fn unentered(node: NodeRef) -> Self {
        Self {
            node,
            repetition: None,
        }
    }
}

/// Segment added by the iterator for a name the grammar does not declare
///
/// It borrows its traversal facts from `anchor`, the grammar node it was
/// placed after.
#[derive(Debug)]
struct NonStandardDefinition {
    name: String,
    name_in_parent: String,
    anchor: NodeId,
}

/// Where [`MessageIterator::advance`] placed a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Slot name in the parent group
    pub slot: String,
    /// 0-based repetition within the slot
    pub repetition: usize,
    /// Whether the slot was added for an undeclared segment
    pub non_standard: bool,
}

/// Walks a grammar and a message tree in step, one segment at a time
pub struct MessageIterator<'a> {
    grammar: &'a Grammar,
    root: &'a mut Group,
    path: Vec<Position>,
    non_standard: Vec<NonStandardDefinition>,
    non_greedy: bool,
    unexpected: UnexpectedSegmentBehavior,
}

impl<'a> MessageIterator<'a> {
    /// Start before the first child of the message root
    ///
    /// `root` must have been instantiated from `grammar`.
    pub fn new(grammar: &'a Grammar, root: &'a mut Group, options: &ParserOptions) -> Self {
        let mut path = vec![Position {
            node: NodeRef::Grammar(grammar.root()),
            repetition: Some(0),
        }];
        if let Some(first) = grammar.first_child(grammar.root()) {
            path.push(Position::unentered(NodeRef::Grammar(first)));
        }
        Self {
            grammar,
            root,
            path,
            non_standard: Vec::new(),
            non_greedy: options.non_greedy,
            unexpected: options.unexpected_segments,
        }
    }

    fn anchor(&self, node: NodeRef) -> NodeId {
        match node {
            NodeRef::Grammar(id) => id,
            NodeRef::NonStandard(index) => self.non_standard[index].anchor,
        }
    }

    fn name(&self, node: NodeRef) -> &str {
        match node {
            NodeRef::Grammar(id) => self.grammar.node(id).name(),
            NodeRef::NonStandard(index) => &self.non_standard[index].name,
        }
    }

    fn slot_name(&self, node: NodeRef) -> &str {
        match node {
            NodeRef::Grammar(id) => self.grammar.node(id).name_in_parent(),
            NodeRef::NonStandard(index) => &self.non_standard[index].name_in_parent,
        }
    }

    fn is_segment(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Grammar(id) => self.grammar.node(id).is_segment(),
            NodeRef::NonStandard(_) => true,
        }
    }

    fn is_repeating(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Grammar(id) => self.grammar.node(id).is_repeating(),
            NodeRef::NonStandard(_) => true,
        }
    }

    fn last_mut(&mut self) -> Option<&mut Position> {
        self.path.last_mut()
    }

    fn open_next_repetition(&mut self) -> Option<usize> {
        let last = self.last_mut()?;
        let next = last.repetition.map_or(0, |r| r + 1);
        last.repetition = Some(next);
        Some(next)
    }

    /// Move to the position that takes a segment named `direction`
    ///
    /// On success the position is open and [`current_segment`] returns the
    /// segment to fill.
    ///
    /// [`current_segment`]: Self::current_segment
    pub fn advance(&mut self, direction: &str) -> Result<Placement> {
        let grammar = self.grammar;
        let limit = grammar.len() * 4 + 16;

        for _ in 0..limit {
            if self.path.len() < 2 {
                break;
            }
            let Some(&current) = self.path.last() else {
                break;
            };
            let anchor = self.anchor(current.node);

            if self.is_segment(current.node) {
                if self.name(current.node) == direction
                    && (self.is_repeating(current.node) || current.repetition.is_none())
                {
                    return self.found(current.node);
                }
                if !grammar
                    .names_of_all_possible_following_leaves(anchor)
                    .contains(direction)
                {
                    return self.unexpected(direction);
                }
            } else if grammar
                .all_possible_first_children(anchor)
                .contains(direction)
            {
                if grammar.node(anchor).is_repeating() || current.repetition.is_none() {
                    self.enter_group(anchor);
                    continue;
                }
            } else if !grammar
                .names_of_all_possible_following_leaves(anchor)
                .contains(direction)
            {
                return self.unexpected(direction);
            }

            if self.non_greedy
                && current.repetition.is_some()
                && let Some(depth) = self.repeating_ancestor_accepting(direction)
            {
                trace!(segment = direction, depth, "Reopening repeating ancestor");
                self.path.truncate(depth + 1);
                continue;
            }

            if let Some(next) = grammar.next_sibling(anchor) {
                if let Some(last) = self.last_mut() {
                    *last = Position::unentered(NodeRef::Grammar(next));
                }
            } else if self.path.len() > 2 {
                self.path.pop();
            } else {
                return self.unexpected(direction);
            }
        }

        Err(Er7Error::IteratorExhausted {
            name: direction.to_string(),
            steps: limit,
        })
    }

    fn found(&mut self, node: NodeRef) -> Result<Placement> {
        let repetition = self
            .open_next_repetition()
            .ok_or_else(|| broken_path(self.name(node)))?;
        let placement = Placement {
            slot: self.slot_name(node).to_string(),
            repetition,
            non_standard: matches!(node, NodeRef::NonStandard(_)),
        };
        trace!(path = %self.describe(), "Placed segment");
        Ok(placement)
    }

    fn enter_group(&mut self, group: NodeId) {
        self.open_next_repetition();
        if let Some(first) = self.grammar.first_child(group) {
            self.path.push(Position::unentered(NodeRef::Grammar(first)));
        }
    }

    /// Deepest repeating group on the path, below the root and above the
    /// current position, that can start with `direction`
    fn repeating_ancestor_accepting(&self, direction: &str) -> Option<usize> {
        let end = self.path.len().saturating_sub(1);
        (1..end).rev().find(|depth| match self.path[*depth].node {
            NodeRef::Grammar(id) => {
                self.grammar.node(id).is_repeating()
                    && self
                        .grammar
                        .all_possible_first_children(id)
                        .contains(direction)
            }
            NodeRef::NonStandard(_) => false,
        })
    }

    fn unexpected(&mut self, direction: &str) -> Result<Placement> {
        match self.unexpected {
            UnexpectedSegmentBehavior::Fail => Err(Er7Error::UnexpectedSegment {
                name: direction.to_string(),
                line: 0,
            }),
            UnexpectedSegmentBehavior::DropToRoot => {
                self.path.truncate(2);
                self.insert_non_standard(direction)
            }
            UnexpectedSegmentBehavior::AddInline => self.insert_non_standard(direction),
        }
    }

    fn insert_non_standard(&mut self, direction: &str) -> Result<Placement> {
        let Some(&current) = self.path.last() else {
            return Err(broken_path(direction));
        };
        let anchor = self.anchor(current.node);
        let after = self.slot_name(current.node).to_string();

        let parent = self.live_group(self.path.len() - 1)?;
        let index = parent
            .slot_index(&after)
            .map_or(parent.slots().len(), |i| i + 1);
        let slot = parent.add_non_standard_segment(direction, index);

        self.non_standard.push(NonStandardDefinition {
            name: direction.to_string(),
            name_in_parent: slot.clone(),
            anchor,
        });
        let node = NodeRef::NonStandard(self.non_standard.len() - 1);
        if let Some(last) = self.last_mut() {
            *last = Position {
                node,
                repetition: Some(0),
            };
        }

        warn!(segment = direction, slot = %slot, after = %after, "Added non-standard segment");
        Ok(Placement {
            slot,
            repetition: 0,
            non_standard: true,
        })
    }

    /// Live group for `path[depth - 1]`, creating repetitions along the way
    fn live_group(&mut self, depth: usize) -> Result<&mut Group> {
        let grammar = self.grammar;
        let mut group: &mut Group = &mut *self.root;
        for position in self.path.iter().take(depth).skip(1) {
            let NodeRef::Grammar(id) = position.node else {
                return Err(broken_path("non-standard segment"));
            };
            let name = grammar.node(id).name_in_parent();
            group = group
                .ensure_group(name, position.repetition.unwrap_or(0))
                .ok_or_else(|| broken_path(name))?;
        }
        Ok(group)
    }

    /// Segment at the current position, created on first access
    pub fn current_segment(&mut self) -> Result<&mut Segment> {
        let Some(&current) = self.path.last() else {
            return Err(broken_path("message root"));
        };
        if self.path.len() < 2 {
            return Err(broken_path("message root"));
        }
        let slot = self.slot_name(current.node).to_string();
        let repetition = current.repetition.unwrap_or(0);
        self.live_group(self.path.len() - 1)?
            .ensure_segment(&slot, repetition)
            .ok_or_else(|| broken_path(&slot))
    }

    /// Current path as `SLOT[rep]/SLOT[rep]/...`, below the root
    pub fn describe(&self) -> String {
        self.path
            .iter()
            .skip(1)
            .map(|position| match position.repetition {
                Some(r) => format!("{}[{r}]", self.slot_name(position.node)),
                None => format!("{}[-]", self.slot_name(position.node)),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn broken_path(name: &str) -> Er7Error {
    Er7Error::PathMismatch {
        node: name.to_string(),
    }
}
