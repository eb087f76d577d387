//! Memoized grammars
//!
//! Building a grammar walks the registry and allocates one node per child, so
//! the parser keeps each grammar for the lifetime of its cache. Grammars are
//! immutable once built and handed out as `Arc`s.

use super::{Grammar, build_grammar};
use crate::error::Result;
use crate::registry::{MessageSchema, StructureRegistry};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Thread-safe grammar cache keyed by (structure, version)
///
/// The key does not include the registry, so one cache must only be used
/// with one registry.
#[derive(Debug, Default)]
pub struct GrammarCache {
    grammars: DashMap<(String, String), Arc<Grammar>>,
}

impl GrammarCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Grammar for a resolved message schema, building it on first request
    pub fn get_or_build(
        &self,
        registry: &dyn StructureRegistry,
        schema: &MessageSchema,
        version: &str,
    ) -> Result<Arc<Grammar>> {
        self.get_or_try_insert((schema.name.clone(), version.to_string()), || {
            build_grammar(registry, schema, version)
        })
    }

    /// Placeholder grammar for a structure the registry cannot resolve
    pub fn generic(
        &self,
        registry: &dyn StructureRegistry,
        structure: &str,
        version: &str,
        header: &str,
    ) -> Result<Arc<Grammar>> {
        let key = (format!("{structure}?generic"), version.to_string());
        self.get_or_try_insert(key, || {
            let schema = registry.resolve_segment_type(header, version).ok();
            Ok(Grammar::generic(structure, version, header, schema))
        })
    }

    fn get_or_try_insert(
        &self,
        key: (String, String),
        build: impl FnOnce() -> Result<Grammar>,
    ) -> Result<Arc<Grammar>> {
        if let Some(grammar) = self.grammars.get(&key) {
            trace!(structure = %key.0, version = %key.1, "Grammar cache hit");
            return Ok(Arc::clone(grammar.value()));
        }

        // Built outside the map lock; a concurrent builder may win the insert
        let grammar = Arc::new(build()?);
        let entry = self.grammars.entry(key).or_insert(grammar);
        Ok(Arc::clone(entry.value()))
    }

    /// Number of cached grammars
    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    /// Drop every cached grammar
    pub fn clear(&self) {
        self.grammars.clear();
    }
}
