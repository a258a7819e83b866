//! Variable lists.
//!
//! [`VariableList`] is a [`PropertyList`] of [`Variable`]s that can also
//! resolve `{{token}}` references against its members and an optional set of
//! inherited defaults.

use super::substitution::{Resolver, Substitutor};
use super::variable::{Variable, VariableType};
use crate::config::CoreConfig;
use crate::error::Result;
use crate::mutations::{Mutation, MutationTarget};
use crate::property::PropertyList;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

/// Keys touched by a sync from a plain object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

/// An ordered list of variables with substitution support.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableList {
    list: PropertyList<Variable>,
    defaults: Map<String, Value>,
    config: CoreConfig,
}

impl VariableList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list from variables or variable definitions.
    pub fn from_variables<I, D>(items: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Variable>,
    {
        Self::from(PropertyList::<Variable>::from_items(items))
    }

    /// Builds a list from a JSON array of variable definitions.
    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(Self::from(PropertyList::<Variable>::from_json(value)?))
    }

    /// Installs inherited defaults from an ordered chain of plain objects.
    ///
    /// Later objects override earlier ones. The chain is flattened once here;
    /// lookups that miss every member fall through to the flattened result.
    pub fn with_defaults<I>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        self.defaults = chain.into_iter().fold(Map::new(), |mut flattened, layer| {
            flattened.extend(layer);
            flattened
        });
        self
    }

    /// Applies `config` to substitution through this list.
    pub fn with_config(mut self, config: &CoreConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The flattened inherited defaults.
    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    /// Resolved value of an enabled member, if any.
    pub fn enabled_value(&self, key: &str) -> Option<Value> {
        self.list
            .one(key)
            .filter(|variable| !variable.disabled)
            .map(Variable::get)
    }

    /// Resolved value of `key`: an enabled member, else an inherited default.
    ///
    /// Shadows [`PropertyList::get`], which ignores the defaults and the
    /// disabled flag.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.enabled_value(key)
            .or_else(|| self.defaults.get(key).cloned())
    }

    /// Whether `key` resolves through an enabled member or a default.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replaces `{{name}}` tokens in `text`.
    ///
    /// Tokens that do not resolve to a primitive value are left untouched.
    pub fn replace(&self, text: &str) -> String {
        self.substitutor().replace(text)
    }

    /// Returns a copy of `value` with every string leaf substituted.
    pub fn substitute(&self, value: &Value) -> Value {
        self.substitutor().substitute(value)
    }

    /// Substitutes every string leaf of `value` in place.
    pub fn substitute_in_place(&self, value: &mut Value) {
        self.substitutor().substitute_in_place(value);
    }

    fn substitutor(&self) -> Substitutor<'_> {
        Substitutor::with_config(vec![self as &dyn Resolver], &self.config)
    }

    /// Projection of enabled members over the inherited defaults.
    pub fn resolved_object(&self) -> Map<String, Value> {
        let mut object = self.defaults.clone();
        object.extend(self.list.to_object(true, false, false));
        object
    }

    /// Updates an enabled variable in place, or creates a new one.
    ///
    /// A disabled variable under the same key is replaced by the new one.
    ///
    /// # Arguments
    ///
    /// * `key` - Identity of the variable; an empty key is refused
    /// * `value` - New value, coerced to the variable's declared type
    /// * `value_type` - Optional new declared type, applied before coercion
    ///
    /// # Returns
    ///
    /// `false` if the key was empty and nothing changed.
    pub fn set_variable(&mut self, key: &str, value: Value, value_type: Option<VariableType>) -> bool {
        // Keyless members are never indexed, so they cannot be updated by key
        if key.is_empty() {
            log::warn!("Ignoring assignment to a variable without a key");
            return false;
        }

        let enabled = self.list.one(key).is_some_and(|variable| !variable.disabled);

        if enabled {
            if let Some(variable) = self.list.one_mut(key) {
                variable.update(value, value_type);
            }
        } else {
            self.list
                .append(Variable::with_type(key, value, value_type.unwrap_or_default()));
        }
        true
    }

    /// Whether any member lacks a key and so cannot be addressed by `unset`.
    pub fn has_keyless(&self) -> bool {
        self.list.iter().any(|variable| variable.key.is_empty())
    }

    /// Removes the variable with `key`. Returns whether anything was removed.
    pub fn unset_variable(&mut self, key: &str) -> bool {
        !self.list.remove(key).is_empty()
    }

    /// Reconciles this list against a plain object.
    ///
    /// Keys only in `source` are created, keys in both are updated through the
    /// existing variable (keeping its declared type) and, with `prune`, keyed
    /// variables missing from `source` are deleted. A disabled variable counts
    /// as absent: it is replaced by a fresh one and reported as created.
    ///
    /// # Arguments
    ///
    /// * `source` - Plain key/value object to mirror
    /// * `track` - Return a [`SyncReport`] of the touched keys
    /// * `prune` - Delete keyed variables that `source` does not mention
    ///
    /// # Example
    ///
    /// ```
    /// use rest_collection::VariableList;
    /// use serde_json::json;
    ///
    /// let mut list = VariableList::from_variables(vec![("a", 1), ("b", 2)]);
    /// let source = json!({"a": 10, "c": 3});
    ///
    /// let report = list.sync_from_object(source.as_object().unwrap(), true, true).unwrap();
    /// assert_eq!(report.created, vec!["c"]);
    /// assert_eq!(report.deleted, vec!["b"]);
    /// assert_eq!(list.get("a"), Some(json!(10)));
    /// ```
    pub fn sync_from_object(
        &mut self,
        source: &Map<String, Value>,
        track: bool,
        prune: bool,
    ) -> Option<SyncReport> {
        let mut report = SyncReport::default();

        for (key, value) in source {
            match self.list.one_mut(key).filter(|variable| !variable.disabled) {
                Some(variable) => {
                    variable.set(value.clone());
                    report.updated.push(key.clone());
                }
                None => {
                    self.list.append(Variable::new(key.as_str(), value.clone()));
                    report.created.push(key.clone());
                }
            }
        }

        if prune {
            let deleted = self.list.remove_where(|variable| {
                !variable.key.is_empty() && !source.contains_key(&variable.key)
            });
            report.deleted = deleted.into_iter().map(|variable| variable.key).collect();
        }

        track.then_some(report)
    }

    /// Mirrors this list onto `target`, dropping keys the list does not hold.
    ///
    /// Disabled variables are treated as absent.
    pub fn sync_to_object(&self, target: &mut Map<String, Value>) {
        target.retain(|key, _| self.enabled_value(key).is_some());

        for variable in self
            .list
            .iter()
            .filter(|variable| !variable.key.is_empty() && !variable.disabled)
        {
            target.insert(variable.key.clone(), variable.get());
        }
    }
}

impl Deref for VariableList {
    type Target = PropertyList<Variable>;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl DerefMut for VariableList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.list
    }
}

impl From<PropertyList<Variable>> for VariableList {
    fn from(list: PropertyList<Variable>) -> Self {
        Self {
            list,
            defaults: Map::new(),
            config: CoreConfig::default(),
        }
    }
}

impl FromIterator<Variable> for VariableList {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        Self::from_variables(iter)
    }
}

impl Resolver for VariableList {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name)
    }
}

impl MutationTarget for VariableList {
    fn apply_mutation(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Set {
                key,
                value,
                value_type,
            } => {
                self.set_variable(key, value.clone(), *value_type);
            }
            Mutation::Unset { key } => {
                self.unset_variable(key);
            }
            Mutation::Clear => self.list.clear(),
        }
    }
}

impl Serialize for VariableList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.list.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VariableList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        PropertyList::<Variable>::deserialize(deserializer).map(VariableList::from)
    }
}
