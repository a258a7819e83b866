//! HTTP header element.
//!
//! Headers are indexed by name, case-insensitively, and a name may repeat.

use super::Property;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single `Name: value` header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name as written.
    pub key: String,

    /// Header value.
    #[serde(default)]
    pub value: String,

    /// Disabled headers stay in the list but are not sent.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            disabled: false,
        }
    }

    /// Parses one `Name: value` line.
    ///
    /// Returns `None` for blank lines and lines without a colon.
    pub fn parse_line(line: &str) -> Option<Self> {
        let (name, value) = line.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value.trim()))
    }
}

impl Property for Header {
    const INDEX_KEY: &'static str = "key";
    const CASE_INSENSITIVE: bool = true;
    const ALLOWS_MULTIPLE_VALUES: bool = true;

    fn key(&self) -> Option<&str> {
        Some(&self.key)
    }

    fn value_of(&self) -> Value {
        Value::String(self.value.clone())
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn parse_list(source: &str) -> Option<Vec<Self>> {
        Some(source.lines().filter_map(Header::parse_line).collect())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

impl From<(&str, &str)> for Header {
    fn from((key, value): (&str, &str)) -> Self {
        Header::new(key, value)
    }
}
