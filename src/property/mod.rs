//! Property lists and the element contract they index.
//!
//! Every "list of X" in a collection (headers, query params, variables, ...)
//! is a [`PropertyList`] over an element type implementing [`Property`]. The
//! element type decides which field identifies it, whether that identity is
//! case-insensitive, and whether one identity may map to several members.

pub mod header;
pub mod list;

pub use header::Header;
pub use list::{ListOptions, PropertyList};

use serde_json::Value;
use std::collections::BTreeMap;

/// Out-of-band data attached to an entity.
///
/// Metadata travels with the in-memory value but is never serialized.
pub type Metadata = BTreeMap<String, Value>;

/// Contract every element of a [`PropertyList`] implements.
pub trait Property {
    /// Name of the field that identifies an element.
    const INDEX_KEY: &'static str = "id";

    /// Whether identity lookups ignore case.
    const CASE_INSENSITIVE: bool = false;

    /// Whether several elements may share one identity.
    const ALLOWS_MULTIPLE_VALUES: bool = false;

    /// The identity of this element, if it has one.
    ///
    /// Elements returning `None` or an empty string are kept in order but are
    /// not reachable through keyed lookups.
    fn key(&self) -> Option<&str>;

    /// The resolved value used when projecting a list to a plain object.
    fn value_of(&self) -> Value;

    /// Disabled elements are skipped by projections that exclude them.
    fn is_disabled(&self) -> bool {
        false
    }

    /// Parses a raw string (for example a header block) into elements.
    ///
    /// Element types without a string form return `None`.
    fn parse_list(_source: &str) -> Option<Vec<Self>>
    where
        Self: Sized,
    {
        None
    }
}
