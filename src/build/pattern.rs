//! Source module to output asset mapping.

use serde::{Deserialize, Serialize};

/// One `(from, to)` rule: compile the module at `from` into the asset `to`.
///
/// `from` is resolved relative to the context root; `to` is an asset name
/// relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    /// Module path or specifier
    pub from: String,
    /// Output asset name
    pub to: String,
}

impl Pattern {
    /// Create a pattern.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }

    /// Whether the asset name matches any of the filters.
    pub fn matches_any(&self, filters: &[glob::Pattern]) -> bool {
        filters.iter().any(|f| f.as_str() == self.to || f.matches(&self.to))
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
