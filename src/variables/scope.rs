//! Layered variable scopes.
//!
//! A [`VariableScope`] owns one [`VariableList`] of its own values and
//! consults an ordered chain of layers when a name is missing there:
//!
//! 1. The scope's own values
//! 2. The first layer
//! 3. The second layer, and so on
//!
//! Layers are shared handles, not copies. A layer's owner may keep changing
//! it and every scope layered on top sees the change on its next lookup.
//! Only the scope's own values are ever written through the scope, and only
//! those changes are recorded when mutation tracking is on.

use super::list::{SyncReport, VariableList};
use super::substitution::{Resolver, Substitutor};
use super::variable::{Variable, VariableType};
use crate::config::{CoreConfig, TrackingOptions};
use crate::error::{CollectionError, Result};
use crate::mutations::{Mutation, MutationTarget, MutationTracker};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A variable list that can be shared between scopes.
pub type SharedVariableList = Arc<RwLock<VariableList>>;

/// Wraps a list so it can serve as a layer.
pub fn shared(list: VariableList) -> SharedVariableList {
    Arc::new(RwLock::new(list))
}

fn read(list: &SharedVariableList) -> RwLockReadGuard<'_, VariableList> {
    list.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(list: &SharedVariableList) -> RwLockWriteGuard<'_, VariableList> {
    list.write().unwrap_or_else(PoisonError::into_inner)
}

/// A named set of variables resolved through a chain of layers.
#[derive(Debug, Default)]
pub struct VariableScope {
    pub id: Option<String>,
    pub name: Option<String>,
    values: SharedVariableList,
    layers: Vec<SharedVariableList>,
    mutations: Option<MutationTracker>,
    tracking: bool,
    config: CoreConfig,
}

#[derive(Serialize)]
struct ScopeRepr<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: &'a Option<String>,
    values: &'a VariableList,
    #[serde(skip_serializing_if = "Option::is_none")]
    mutations: &'a Option<MutationTracker>,
}

impl VariableScope {
    /// Creates an empty scope with no layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope that writes into an existing shared list.
    pub fn from_shared(values: SharedVariableList) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Builds a scope from an array of variable definitions or from a
    /// `{ id, name, values, mutations }` object.
    ///
    /// The object form is read leniently: a missing or malformed `values`
    /// yields an empty list, `id` and `name` of the wrong type are ignored and
    /// an unreadable `mutations` log is dropped, each with a warning. Restored
    /// mutations are kept for replay and serialization, but tracking stays off
    /// until [`enable_tracking`](Self::enable_tracking) is called.
    ///
    /// # Returns
    ///
    /// `Err(CollectionError::InvalidDefinition)` only when `value` is neither
    /// null, an array nor an object.
    ///
    /// # Example
    ///
    /// ```
    /// use rest_collection::VariableScope;
    /// use serde_json::json;
    ///
    /// let scope = VariableScope::from_json(&json!({
    ///     "name": "staging",
    ///     "values": [{"key": "host", "value": "staging.example.com"}]
    /// }))
    /// .unwrap();
    /// assert_eq!(scope.replace("https://{{host}}"), "https://staging.example.com");
    /// ```
    pub fn from_json(value: &Value) -> Result<Self> {
        let definition = match value {
            Value::Null => return Ok(Self::new()),
            Value::Array(_) => return Ok(Self::from(VariableList::from_json(value)?)),
            Value::Object(definition) => definition,
            other => {
                return Err(CollectionError::InvalidDefinition(format!(
                    "expected variable definitions or a scope object, found {}",
                    other
                )))
            }
        };

        let values = match definition.get("values") {
            None => VariableList::new(),
            Some(values) => VariableList::from_json(values).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed scope values: {}", e);
                VariableList::new()
            }),
        };

        let mutations = match definition.get("mutations") {
            None | Some(Value::Null) => None,
            Some(log) => match MutationTracker::from_json(log) {
                Ok(tracker) => Some(tracker),
                Err(e) => {
                    log::warn!("Dropping unreadable mutation log: {}", e);
                    None
                }
            },
        };

        Ok(Self {
            id: text_field(definition, "id"),
            name: text_field(definition, "name"),
            mutations,
            ..Self::from(values)
        })
    }

    /// Applies `config` to substitution through this scope and to
    /// [`enable_configured_tracking`](Self::enable_configured_tracking).
    ///
    /// # Example
    ///
    /// ```
    /// use rest_collection::config::load_config;
    /// use rest_collection::VariableScope;
    /// use serde_json::json;
    ///
    /// let config = load_config(Some(json!({
    ///     "collection": {"maxSubstitutionDepth": 1, "tracking": {"autoCompact": true}}
    /// })))
    /// .unwrap();
    ///
    /// let mut scope = VariableScope::new().with_config(config);
    /// scope.enable_configured_tracking();
    /// scope.set("inner", "x", None);
    /// scope.set("outer", "{{inner}}", None);
    ///
    /// assert_eq!(scope.replace("{{outer}}"), "{{inner}}");
    /// assert!(scope.mutations().unwrap().auto_compact());
    /// ```
    pub fn with_config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Adds one layer beneath the existing ones.
    pub fn with_layer(mut self, layer: SharedVariableList) -> Self {
        self.add_layer(layer);
        self
    }

    /// Adds several layers, in order, beneath the existing ones.
    pub fn with_layers<I: IntoIterator<Item = SharedVariableList>>(mut self, layers: I) -> Self {
        for layer in layers {
            self.add_layer(layer);
        }
        self
    }

    /// Appends a layer to the lookup chain.
    ///
    /// The scope's own list is ignored as a layer of itself.
    pub fn add_layer(&mut self, layer: SharedVariableList) {
        if Arc::ptr_eq(&layer, &self.values) {
            log::debug!("Ignoring a scope's own values as one of its layers");
            return;
        }
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[SharedVariableList] {
        &self.layers
    }

    /// A handle to this scope's own values, usable as another scope's layer.
    pub fn share(&self) -> SharedVariableList {
        Arc::clone(&self.values)
    }

    /// Read access to the scope's own values.
    pub fn values(&self) -> RwLockReadGuard<'_, VariableList> {
        read(&self.values)
    }

    /// Resolves `key` through own values, then each layer in order.
    ///
    /// Disabled variables are skipped.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.resolve(key)
    }

    /// Whether `key` resolves anywhere in the chain.
    pub fn has(&self, key: &str) -> bool {
        self.resolve(key).is_some()
    }

    /// Creates or updates `key` in the scope's own values.
    ///
    /// An existing variable keeps its declared type unless `value_type` is
    /// given; the value is coerced to whichever type applies.
    /// An empty key is refused with a warning and nothing is recorded.
    pub fn set(&mut self, key: &str, value: impl Into<Value>, value_type: Option<VariableType>) {
        if key.is_empty() {
            log::warn!("Ignoring assignment to a variable without a key");
            return;
        }
        let value = value.into();

        if let Some(mutations) = self.active_tracker() {
            mutations.track(Mutation::set(key, value.clone(), value_type));
        }
        write(&self.values).set_variable(key, value, value_type);
    }

    /// Removes `key` from the scope's own values. Layers are never touched.
    pub fn unset(&mut self, key: &str) {
        if let Some(mutations) = self.active_tracker() {
            mutations.track(Mutation::unset(key));
        }
        write(&self.values).unset_variable(key);
    }

    /// Removes every variable from the scope's own values.
    ///
    /// When tracking, each removed key is recorded as its own `unset`. If
    /// some variable has no key, a single `clear` record is written instead,
    /// since `unset` cannot address it.
    pub fn clear(&mut self) {
        if self.tracking && self.mutations.is_some() {
            let records: Vec<Mutation> = {
                let values = self.values();
                if values.has_keyless() {
                    vec![Mutation::Clear]
                } else {
                    values
                        .iter()
                        .map(|variable| Mutation::unset(variable.key.as_str()))
                        .collect()
                }
            };

            if let Some(mutations) = self.active_tracker() {
                for record in records {
                    mutations.track(record);
                }
            }
        }
        write(&self.values).clear();
    }

    /// Reconciles own values against a plain object. See
    /// [`VariableList::sync_from_object`]; pruning is always on.
    ///
    /// Not recorded in the mutation log.
    pub fn sync_variables_from(
        &mut self,
        source: &Map<String, Value>,
        track: bool,
    ) -> Option<SyncReport> {
        self.sync_variables_from_with(source, track, true)
    }

    /// [`sync_variables_from`](Self::sync_variables_from) with explicit pruning.
    pub fn sync_variables_from_with(
        &mut self,
        source: &Map<String, Value>,
        track: bool,
        prune: bool,
    ) -> Option<SyncReport> {
        write(&self.values).sync_from_object(source, track, prune)
    }

    /// Mirrors own values onto `target`, removing keys the scope does not hold.
    pub fn sync_variables_to(&self, target: &mut Map<String, Value>) {
        self.values().sync_to_object(target);
    }

    /// Flattened key/value view of the whole chain; own values win.
    pub fn to_object(&self) -> Map<String, Value> {
        let mut object = Map::new();
        for layer in self.layers.iter().rev() {
            object.extend(read(layer).resolved_object());
        }
        object.extend(self.values().resolved_object());
        object
    }

    /// Key/value view of the scope's own values only.
    pub fn variables(&self) -> Map<String, Value> {
        self.values().resolved_object()
    }

    /// Replaces `{{name}}` tokens through the whole chain.
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

    /// Starts recording mutations of own values.
    ///
    /// If tracking is already on, only the options change and the log is
    /// kept. Otherwise recording starts over in a fresh, empty log.
    pub fn enable_tracking(&mut self, options: TrackingOptions) {
        if self.tracking {
            if let Some(mutations) = self.mutations.as_mut() {
                mutations.set_auto_compact(options.auto_compact);
                return;
            }
        }

        log::debug!(
            "Enabling mutation tracking for scope {:?} (auto compact: {})",
            self.id,
            options.auto_compact
        );
        self.mutations = Some(MutationTracker::new(options));
        self.tracking = true;
    }

    /// [`enable_tracking`](Self::enable_tracking) with the tracking options
    /// of the scope's configuration.
    pub fn enable_configured_tracking(&mut self) {
        self.enable_tracking(self.config.tracking);
    }

    /// Stops recording. The existing log is kept.
    pub fn disable_tracking(&mut self) {
        self.tracking = false;
    }

    pub fn is_tracking_enabled(&self) -> bool {
        self.tracking
    }

    /// The mutation log, if tracking was ever enabled or one was restored.
    pub fn mutations(&self) -> Option<&MutationTracker> {
        self.mutations.as_ref()
    }

    /// Serializes the scope; layers are never included.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn active_tracker(&mut self) -> Option<&mut MutationTracker> {
        if self.tracking {
            self.mutations.as_mut()
        } else {
            None
        }
    }
}

fn text_field(definition: &Map<String, Value>, field: &str) -> Option<String> {
    match definition.get(field)? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => {
            log::warn!("Ignoring non-string scope `{}`: {}", field, other);
            None
        }
    }
}

impl Resolver for VariableScope {
    fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values().resolve(name) {
            return Some(value);
        }

        self.layers.iter().find_map(|layer| read(layer).resolve(name))
    }
}

impl MutationTarget for VariableScope {
    fn apply_mutation(&mut self, mutation: &Mutation) {
        write(&self.values).apply_mutation(mutation);
    }
}

impl From<VariableList> for VariableScope {
    fn from(values: VariableList) -> Self {
        Self::from_shared(shared(values))
    }
}

impl From<Vec<Variable>> for VariableScope {
    fn from(values: Vec<Variable>) -> Self {
        Self::from(VariableList::from_variables(values))
    }
}

impl Serialize for VariableScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let values = self.values();
        ScopeRepr {
            id: &self.id,
            name: &self.name,
            values: &*values,
            mutations: &self.mutations,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VariableScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        VariableScope::from_json(&value).map_err(serde::de::Error::custom)
    }
}
