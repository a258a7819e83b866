//! Mutation tracking for variable scopes.
//!
//! A [`MutationTracker`] records every change made to a scope's own values as
//! an ordered stream of [`Mutation`]s. Replaying the stream onto a scope that
//! started from the same values reproduces the same end state, so scope
//! changes can be shipped without the full variable set.
//!
//! Records serialize as compact tuples:
//!
//! ```text
//! ["set", "token", "abc"]
//! ["set", "port", "8080", "number"]
//! ["unset", "token"]
//! ["clear"]
//! ```

use crate::config::TrackingOptions;
use crate::error::{CollectionError, Result};
use crate::variables::VariableType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::Not;

const SET: &str = "set";
const UNSET: &str = "unset";
const CLEAR: &str = "clear";

/// A single recorded change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Value>", try_from = "Vec<Value>")]
pub enum Mutation {
    /// Create or update `key`, optionally changing its declared type.
    Set {
        key: String,
        value: Value,
        value_type: Option<VariableType>,
    },
    /// Remove `key`.
    Unset { key: String },
    /// Remove everything.
    Clear,
}

impl Mutation {
    pub fn set(key: impl Into<String>, value: impl Into<Value>, value_type: Option<VariableType>) -> Self {
        Mutation::Set {
            key: key.into(),
            value: value.into(),
            value_type,
        }
    }

    pub fn unset(key: impl Into<String>) -> Self {
        Mutation::Unset { key: key.into() }
    }

    /// Name of the operation as serialized.
    pub fn instruction(&self) -> &'static str {
        match self {
            Mutation::Set { .. } => SET,
            Mutation::Unset { .. } => UNSET,
            Mutation::Clear => CLEAR,
        }
    }

    /// The key this record applies to; `None` for `clear`.
    pub fn key(&self) -> Option<&str> {
        match self {
            Mutation::Set { key, .. } | Mutation::Unset { key } => Some(key),
            Mutation::Clear => None,
        }
    }
}

impl From<Mutation> for Vec<Value> {
    fn from(mutation: Mutation) -> Self {
        let instruction = Value::from(mutation.instruction());
        match mutation {
            Mutation::Set {
                key,
                value,
                value_type,
            } => {
                let mut record = vec![instruction, Value::String(key), value];
                if let Some(value_type) = value_type {
                    record.push(Value::from(value_type.as_str()));
                }
                record
            }
            Mutation::Unset { key } => vec![instruction, Value::String(key)],
            Mutation::Clear => vec![instruction],
        }
    }
}

impl TryFrom<Vec<Value>> for Mutation {
    type Error = CollectionError;

    fn try_from(record: Vec<Value>) -> Result<Self> {
        let mut parts = record.into_iter();
        let instruction = match parts.next() {
            Some(Value::String(instruction)) => instruction,
            other => {
                return Err(CollectionError::InvalidMutation(format!(
                    "expected an instruction, found {:?}",
                    other
                )))
            }
        };

        let mutation = match instruction.as_str() {
            SET => {
                let key = expect_key(parts.next(), SET)?;
                let value = parts.next().unwrap_or(Value::Null);
                let value_type = match parts.next() {
                    None | Some(Value::Null) => None,
                    Some(Value::String(name)) => Some(VariableType::parse(&name).ok_or_else(|| {
                        CollectionError::InvalidMutation(format!("unknown variable type `{}`", name))
                    })?),
                    Some(other) => {
                        return Err(CollectionError::InvalidMutation(format!(
                            "expected a type name, found {}",
                            other
                        )))
                    }
                };
                Mutation::Set {
                    key,
                    value,
                    value_type,
                }
            }
            UNSET => Mutation::Unset {
                key: expect_key(parts.next(), UNSET)?,
            },
            CLEAR => Mutation::Clear,
            other => {
                return Err(CollectionError::InvalidMutation(format!(
                    "unknown instruction `{}`",
                    other
                )))
            }
        };

        if parts.next().is_some() {
            return Err(CollectionError::InvalidMutation(format!(
                "trailing fields in `{}` record",
                instruction
            )));
        }

        Ok(mutation)
    }
}

fn expect_key(part: Option<Value>, instruction: &str) -> Result<String> {
    match part {
        Some(Value::String(key)) => Ok(key),
        other => Err(CollectionError::InvalidMutation(format!(
            "`{}` needs a string key, found {:?}",
            instruction, other
        ))),
    }
}

/// Anything a mutation stream can be replayed onto.
pub trait MutationTarget {
    /// Applies one record directly, without tracking it.
    fn apply_mutation(&mut self, mutation: &Mutation);
}

/// Append-only log of mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationTracker {
    #[serde(default)]
    stream: Vec<Mutation>,

    #[serde(default, skip_serializing_if = "Not::not")]
    auto_compact: bool,
}

impl MutationTracker {
    pub fn new(options: TrackingOptions) -> Self {
        Self {
            stream: Vec::new(),
            auto_compact: options.auto_compact,
        }
    }

    /// Parses a serialized `{ "stream": [...] }` log.
    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn auto_compact(&self) -> bool {
        self.auto_compact
    }

    pub fn set_auto_compact(&mut self, auto_compact: bool) {
        self.auto_compact = auto_compact;
    }

    /// Records a mutation at the end of the stream.
    pub fn track(&mut self, mutation: Mutation) {
        log::trace!("Tracking `{}` on {:?}", mutation.instruction(), mutation.key());
        self.stream.push(mutation);

        if self.auto_compact {
            self.compact();
        }
    }

    /// Drops records that cannot affect the replayed state.
    ///
    /// Everything before the last `clear` goes. For each key, records before
    /// its last `unset` go, and the `set`s after it collapse into one record at
    /// the position of the first of them, carrying the last value and the last
    /// explicitly declared type. Keeping the first position preserves the
    /// order in which replay creates variables.
    pub fn compact(&mut self) {
        #[derive(Default)]
        struct KeyState {
            last_unset: Option<usize>,
            first_set: Option<usize>,
            last_set: Option<usize>,
            value_type: Option<VariableType>,
        }

        let start = self
            .stream
            .iter()
            .rposition(|mutation| matches!(mutation, Mutation::Clear))
            .unwrap_or(0);
        let tail = &self.stream[start..];

        let mut states: HashMap<&str, KeyState> = HashMap::new();
        for (index, mutation) in tail.iter().enumerate() {
            match mutation {
                Mutation::Unset { key } => {
                    states.insert(
                        key,
                        KeyState {
                            last_unset: Some(index),
                            ..KeyState::default()
                        },
                    );
                }
                Mutation::Set {
                    key, value_type, ..
                } => {
                    let state = states.entry(key).or_default();
                    state.first_set.get_or_insert(index);
                    state.last_set = Some(index);
                    if value_type.is_some() {
                        state.value_type = *value_type;
                    }
                }
                Mutation::Clear => {}
            }
        }

        let mut compacted = Vec::with_capacity(states.len() + 1);
        for (index, mutation) in tail.iter().enumerate() {
            match mutation {
                Mutation::Clear => compacted.push(Mutation::Clear),
                Mutation::Unset { key } => {
                    if states.get(key.as_str()).and_then(|s| s.last_unset) == Some(index) {
                        compacted.push(mutation.clone());
                    }
                }
                Mutation::Set { key, .. } => {
                    let Some(state) = states.get(key.as_str()) else {
                        continue;
                    };
                    if state.first_set != Some(index) {
                        continue;
                    }
                    if let Some(Mutation::Set { value, .. }) = state.last_set.map(|last| &tail[last]) {
                        compacted.push(Mutation::Set {
                            key: key.clone(),
                            value: value.clone(),
                            value_type: state.value_type,
                        });
                    }
                }
            }
        }

        if compacted.len() != self.stream.len() {
            log::debug!(
                "Compacted mutation stream from {} to {} records",
                self.stream.len(),
                compacted.len()
            );
        }
        self.stream = compacted;
    }

    /// Replays every record, in order, onto `target`.
    pub fn apply_on<T: MutationTarget + ?Sized>(&self, target: &mut T) {
        for mutation in &self.stream {
            target.apply_mutation(mutation);
        }
    }

    pub fn stream(&self) -> &[Mutation] {
        &self.stream
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mutation> {
        self.stream.iter()
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }
}
