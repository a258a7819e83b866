//! Configuration schema for the collection core.
//!
//! Defines the tunables that govern substitution and mutation tracking, with
//! serde defaults so partial settings objects deserialize cleanly.

use serde::{Deserialize, Serialize};

/// Default limit on how deeply nested values are expanded.
pub const DEFAULT_MAX_SUBSTITUTION_DEPTH: usize = 20;

/// Top-level configuration for lists and scopes.
///
/// Loaded from a settings object under the `"collection"` key. Missing
/// settings fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    /// Maximum nesting depth of substitution.
    ///
    /// A substituted value that itself contains `{{tokens}}` has them expanded
    /// before it is spliced in, up to this many levels. Must be greater than 0.
    /// Defaults to 20.
    #[serde(default = "default_max_substitution_depth")]
    pub max_substitution_depth: usize,

    /// Options applied when a scope starts tracking mutations.
    #[serde(default)]
    pub tracking: TrackingOptions,
}

/// Options for a scope's mutation log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingOptions {
    /// Collapse redundant records on the same key as they are recorded.
    #[serde(default)]
    pub auto_compact: bool,
}

impl TrackingOptions {
    /// Options with auto compaction switched on.
    pub fn compacting() -> Self {
        Self { auto_compact: true }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_substitution_depth: default_max_substitution_depth(),
            tracking: TrackingOptions::default(),
        }
    }
}

impl CoreConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_substitution_depth == 0 {
            return Err("maxSubstitutionDepth must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Merges this configuration with another, using values from `other`.
    pub fn merge(&self, other: &CoreConfig) -> Self {
        Self {
            max_substitution_depth: other.max_substitution_depth,
            tracking: other.tracking,
        }
    }
}

fn default_max_substitution_depth() -> usize {
    DEFAULT_MAX_SUBSTITUTION_DEPTH
}
