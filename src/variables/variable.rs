//! Typed variables.
//!
//! A [`Variable`] stores a JSON value together with a declared
//! [`VariableType`]. Every assignment coerces the incoming value to the declared
//! type, so the stored value always has the declared shape.

use crate::property::{Metadata, Property};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::ops::Not;

/// Declared type of a variable's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Number,
    Boolean,
    /// Stored as JSON text, resolved by parsing it.
    Json,
    #[default]
    Any,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::String => "string",
            VariableType::Number => "number",
            VariableType::Boolean => "boolean",
            VariableType::Json => "json",
            VariableType::Any => "any",
        }
    }

    /// Parses a type name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(VariableType::String),
            "number" => Some(VariableType::Number),
            "boolean" => Some(VariableType::Boolean),
            "json" => Some(VariableType::Json),
            "any" => Some(VariableType::Any),
            _ => None,
        }
    }

    /// Converts `value` into the stored representation of this type.
    pub fn coerce(&self, value: Value) -> Value {
        match self {
            VariableType::String => Value::String(match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            }),
            VariableType::Number => coerce_number(value),
            VariableType::Boolean => Value::Bool(match value {
                Value::Bool(b) => b,
                Value::Null => false,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                Value::String(s) => {
                    let s = s.trim();
                    !(s.is_empty() || s.eq_ignore_ascii_case("false") || s == "0")
                }
                Value::Array(_) | Value::Object(_) => true,
            }),
            VariableType::Json => match value {
                Value::String(s) => Value::String(s),
                other => Value::String(other.to_string()),
            },
            VariableType::Any => value,
        }
    }

    /// Converts a stored value into the value callers observe.
    pub fn resolve(&self, stored: &Value) -> Value {
        match (self, stored) {
            (VariableType::Json, Value::String(text)) => {
                serde_json::from_str(text).unwrap_or(Value::Null)
            }
            _ => stored.clone(),
        }
    }
}

fn coerce_number(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(n),
        Value::Bool(b) => Value::from(u8::from(b)),
        Value::Null => Value::Null,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Value::from(0)
            } else if let Ok(i) = s.parse::<i64>() {
                Value::from(i)
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Value::Array(_) | Value::Object(_) => Value::Null,
    }
}

/// A named, typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VariableDefinition")]
pub struct Variable {
    /// Identity of the variable within its list.
    pub key: String,

    value: Value,

    #[serde(rename = "type")]
    value_type: VariableType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,

    /// Set for variables the runtime defines rather than the user.
    #[serde(skip_serializing_if = "Not::not")]
    pub system: bool,

    #[serde(skip_serializing_if = "Not::not")]
    pub disabled: bool,

    /// Never serialized.
    #[serde(skip)]
    pub metadata: Metadata,
}

/// Loose input form of a [`Variable`].
///
/// Accepts either `key` or `id` as the identity and an optional type name;
/// unknown type names fall back to `any`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariableDefinition {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl Variable {
    /// Creates an untyped variable.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_type(key, value, VariableType::Any)
    }

    /// Creates a variable of the given type, coercing `value`.
    pub fn with_type(key: impl Into<String>, value: impl Into<Value>, value_type: VariableType) -> Self {
        Self {
            key: key.into(),
            value: value_type.coerce(value.into()),
            value_type,
            id: None,
            name: None,
            description: None,
            system: false,
            disabled: false,
            metadata: Metadata::new(),
        }
    }

    /// The stored value, as serialized.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_type(&self) -> VariableType {
        self.value_type
    }

    /// The resolved value.
    pub fn get(&self) -> Value {
        self.value_type.resolve(&self.value)
    }

    /// Assigns a new value, coerced to the declared type.
    pub fn set(&mut self, value: impl Into<Value>) {
        self.value = self.value_type.coerce(value.into());
    }

    /// Changes the declared type and re-coerces the current value.
    pub fn set_type(&mut self, value_type: VariableType) {
        let current = self.get();
        self.value_type = value_type;
        self.value = value_type.coerce(current);
    }

    /// Applies an optional type change, then assigns `value`.
    pub fn update(&mut self, value: impl Into<Value>, value_type: Option<VariableType>) {
        if let Some(value_type) = value_type {
            self.value_type = value_type;
        }
        self.set(value);
    }

    /// Text used when the variable appears as a `{{token}}`.
    ///
    /// Only primitive resolved values have a text form.
    pub fn substitution_text(&self) -> Option<String> {
        primitive_text(&self.get())
    }
}

/// Text form of a primitive JSON value; `None` for null, arrays and objects.
pub fn primitive_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl From<VariableDefinition> for Variable {
    fn from(definition: VariableDefinition) -> Self {
        let value_type = match definition.value_type.as_deref() {
            None => VariableType::Any,
            Some(name) => VariableType::parse(name).unwrap_or_else(|| {
                log::warn!("Unknown variable type `{}`, treating as any", name);
                VariableType::Any
            }),
        };
        let key = definition
            .key
            .or_else(|| definition.id.clone())
            .unwrap_or_default();

        let mut variable = Variable::with_type(key, definition.value, value_type);
        variable.id = definition.id;
        variable.name = definition.name;
        variable.description = definition.description;
        variable.system = definition.system;
        variable.disabled = definition.disabled;
        variable
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for Variable {
    fn from((key, value): (K, V)) -> Self {
        Variable::new(key, value)
    }
}

impl Property for Variable {
    const INDEX_KEY: &'static str = "key";

    fn key(&self) -> Option<&str> {
        Some(&self.key)
    }

    fn value_of(&self) -> Value {
        self.get()
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }
}
