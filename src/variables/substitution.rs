//! Variable substitution engine.
//!
//! Replaces `{{name}}` tokens in strings, and in every string leaf of a JSON
//! structure, with values looked up through an ordered chain of
//! [`Resolver`]s. The first resolver that knows a name wins.
//!
//! Substitution is conservative: a token whose name is unknown, or whose value
//! is not a primitive (null, array, object), is left exactly as written. A
//! substituted value may itself contain tokens. Those are expanded inside the
//! value before it is spliced in, up to a fixed nesting depth. A name that is
//! already being expanded stays a literal token, so reference cycles end with
//! the token left in place rather than an error. Spliced output is never
//! scanned again.

use super::variable::primitive_text;
use crate::config::{CoreConfig, DEFAULT_MAX_SUBSTITUTION_DEPTH};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Cached pattern for `{{name}}`; names cannot contain braces.
static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]*?)\}\}").expect("Failed to compile variable regex"));

/// Something that can answer "what is the value of `name`?".
pub trait Resolver {
    fn resolve(&self, name: &str) -> Option<Value>;
}

impl Resolver for Map<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Applies substitution through an ordered chain of resolvers.
pub struct Substitutor<'a> {
    resolvers: Vec<&'a dyn Resolver>,
    max_depth: usize,
}

impl<'a> Substitutor<'a> {
    /// Creates a substitutor consulting `resolvers` in order.
    pub fn new(resolvers: Vec<&'a dyn Resolver>) -> Self {
        Self {
            resolvers,
            max_depth: DEFAULT_MAX_SUBSTITUTION_DEPTH,
        }
    }

    /// Creates a substitutor using the depth limit from `config`.
    pub fn with_config(resolvers: Vec<&'a dyn Resolver>, config: &CoreConfig) -> Self {
        Self::new(resolvers).with_max_depth(config.max_substitution_depth)
    }

    /// Sets how deeply nested values are expanded (at least one level).
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Text for `name` from the first resolver that knows it.
    ///
    /// A hit with a non-primitive value still stops the search.
    pub fn lookup(&self, name: &str) -> Option<String> {
        self.resolvers
            .iter()
            .find_map(|resolver| resolver.resolve(name))
            .and_then(|value| primitive_text(&value))
    }

    /// Replaces every resolvable `{{name}}` token in `text`.
    ///
    /// # Arguments
    ///
    /// * `text` - Any string; tokens that do not resolve are kept verbatim
    ///
    /// # Returns
    ///
    /// The substituted string. Nested tokens inside a value are expanded up to
    /// the configured depth, and a self-referencing name is left as a token.
    ///
    /// # Example
    ///
    /// ```
    /// use rest_collection::variables::{Resolver, Substitutor};
    /// use serde_json::{json, Map, Value};
    ///
    /// let mut vars = Map::new();
    /// vars.insert("host".to_string(), json!("api.example.com"));
    ///
    /// let substitutor = Substitutor::new(vec![&vars as &dyn Resolver]);
    /// assert_eq!(
    ///     substitutor.replace("GET https://{{host}}/{{version}}"),
    ///     "GET https://api.example.com/{{version}}"
    /// );
    /// ```
    pub fn replace(&self, text: &str) -> String {
        let mut expanding = Vec::new();
        self.expand(text, 0, &mut expanding).into_owned()
    }

    /// Expands the tokens of `text` found at nesting `depth`.
    ///
    /// `expanding` holds the names whose values are currently being expanded.
    fn expand<'t>(&self, text: &'t str, depth: usize, expanding: &mut Vec<String>) -> Cow<'t, str> {
        // Fast path: nothing to substitute
        if depth >= self.max_depth || !text.contains("{{") {
            return Cow::Borrowed(text);
        }

        VARIABLE_REGEX.replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            if expanding.iter().any(|active| active == name) {
                return caps[0].to_string();
            }

            match self.lookup(name) {
                Some(value) => {
                    expanding.push(name.to_string());
                    let expanded = self.expand(&value, depth + 1, expanding).into_owned();
                    expanding.pop();
                    expanded
                }
                None => caps[0].to_string(),
            }
        })
    }

    /// Returns a copy of `value` with every string leaf substituted.
    pub fn substitute(&self, value: &Value) -> Value {
        let mut copy = value.clone();
        self.substitute_in_place(&mut copy);
        copy
    }

    /// Substitutes every string leaf of `value` in place; keys are untouched.
    pub fn substitute_in_place(&self, value: &mut Value) {
        match value {
            Value::String(text) => {
                if text.contains("{{") {
                    *text = self.replace(text);
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.substitute_in_place(item)),
            Value::Object(map) => map
                .values_mut()
                .for_each(|item| self.substitute_in_place(item)),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}
