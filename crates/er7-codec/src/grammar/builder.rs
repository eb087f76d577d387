//! Build a grammar from registry schemas

use super::{Grammar, GrammarError, NodeId};
use crate::error::Result;
use crate::registry::{ChildKind, GroupSchema, MessageSchema, StructureRegistry};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Maximum group nesting below the message node
pub const MAX_DEPTH: usize = 64;

/// Resolve every group and segment of `schema` and assemble the grammar
///
/// Children that share a name within one parent get a numeric suffix from
/// the second occurrence on (`ROL`, `ROL2`). Segments the registry has no
/// field layout for still become leaves; they just carry no field metadata.
pub fn build_grammar(
    registry: &dyn StructureRegistry,
    schema: &MessageSchema,
    version: &str,
) -> Result<Grammar> {
    let mut grammar = Grammar::new(&schema.name, version);
    add_children(&mut grammar, registry, NodeId::ROOT, schema, version, 0)?;
    debug!(
        structure = %schema.name,
        version,
        nodes = grammar.len(),
        "Built grammar"
    );
    Ok(grammar)
}

fn add_children(
    grammar: &mut Grammar,
    registry: &dyn StructureRegistry,
    parent: NodeId,
    schema: &GroupSchema,
    version: &str,
    depth: usize,
) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(GrammarError::TooDeep {
            name: schema.name.clone(),
            depth: MAX_DEPTH,
        }
        .into());
    }
    if schema.children.is_empty() {
        return Err(GrammarError::EmptyGroup {
            name: schema.name.clone(),
        }
        .into());
    }

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for child in &schema.children {
        let count = occurrences.entry(child.name.as_str()).or_insert(0);
        *count += 1;
        let name_in_parent = if *count == 1 {
            child.name.clone()
        } else {
            format!("{}{}", child.name, count)
        };

        match &child.kind {
            ChildKind::Segment => {
                let segment = match registry.resolve_segment_type(&child.name, version) {
                    Ok(segment) => Some(segment),
                    Err(e) => {
                        trace!(segment = %child.name, error = %e, "No field layout for segment");
                        None
                    }
                };
                grammar.add_child(parent, child, name_in_parent, segment);
            }
            ChildKind::Group { type_name } => {
                let group = registry.resolve_group_type(type_name, version)?;
                let id = grammar.add_child(parent, child, name_in_parent, None);
                add_children(grammar, registry, id, &group, version, depth + 1)?;
            }
        }
    }
    Ok(())
}
