//! Grammar construction errors

use thiserror::Error;

/// Errors raised while turning registry schemas into a grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// Group definitions nest deeper than the builder allows
    #[error("group '{name}' nests deeper than {depth} levels")]
    TooDeep {
        /// Group at which the limit was hit
        name: String,
        /// Depth limit
        depth: usize,
    },

    /// A message or group declares no children
    #[error("group '{name}' has no children")]
    EmptyGroup {
        /// Registry name of the group
        name: String,
    },
}
