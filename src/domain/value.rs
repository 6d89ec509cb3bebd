//! Loosely typed attribute values.
//!
//! Telemetry attributes are untyped key/value bags: keys are strings and
//! values come from a small closed set of scalar and array variants. Values
//! are compared through their string-normalized form so that numeric `150`
//! and text `"150"` are considered equal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map keyed by attribute name.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A single attribute value.
///
/// Deserializes untagged from YAML/JSON scalars and sequences, so scenario
/// files can write `gen_ai.usage.input_tokens: 150` or `"150"` freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Returns the string-normalized representation used for equality.
    ///
    /// Doubles always keep a fractional part (`1.0`, not `1`). Arrays
    /// normalize to `[a, b, c]` with each element normalized.
    #[must_use]
    pub fn normalized(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Double(f) => format!("{f:?}"),
            Self::String(s) => s.clone(),
            Self::Array(items) => {
                let parts: Vec<String> = items.iter().map(Self::normalized).collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }

    /// Loose equality: both sides compared by [`normalized`](Self::normalized).
    #[must_use]
    pub fn loosely_equals(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }

    /// Returns the contained string for `String` values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&AttributeValue> for opentelemetry::Value {
    fn from(value: &AttributeValue) -> Self {
        use opentelemetry::{Array, StringValue, Value};

        match value {
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Int(i) => Value::I64(*i),
            AttributeValue::Double(f) => Value::F64(*f),
            AttributeValue::String(s) => Value::String(s.clone().into()),
            AttributeValue::Array(items) => {
                // OpenTelemetry arrays are homogeneous; mixed arrays degrade to strings.
                if let Some(bools) = items.iter().map(|v| match v {
                    AttributeValue::Bool(b) => Some(*b),
                    _ => None,
                }).collect::<Option<Vec<_>>>() {
                    Value::Array(Array::Bool(bools))
                } else if let Some(ints) = items.iter().map(|v| match v {
                    AttributeValue::Int(i) => Some(*i),
                    _ => None,
                }).collect::<Option<Vec<_>>>() {
                    Value::Array(Array::I64(ints))
                } else if let Some(doubles) = items.iter().map(|v| match v {
                    AttributeValue::Double(f) => Some(*f),
                    _ => None,
                }).collect::<Option<Vec<_>>>() {
                    Value::Array(Array::F64(doubles))
                } else {
                    let strings: Vec<StringValue> =
                        items.iter().map(|v| StringValue::from(v.normalized())).collect();
                    Value::Array(Array::String(strings))
                }
            }
        }
    }
}

impl From<&opentelemetry::Value> for AttributeValue {
    fn from(value: &opentelemetry::Value) -> Self {
        use opentelemetry::{Array, Value};

        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::I64(i) => Self::Int(*i),
            Value::F64(f) => Self::Double(*f),
            Value::String(s) => Self::String(s.as_str().to_string()),
            Value::Array(array) => {
                #[allow(unreachable_patterns)]
                match array {
                    Array::Bool(items) => Self::Array(items.iter().copied().map(Self::Bool).collect()),
                    Array::I64(items) => Self::Array(items.iter().copied().map(Self::Int).collect()),
                    Array::F64(items) => Self::Array(items.iter().copied().map(Self::Double).collect()),
                    Array::String(items) => Self::Array(
                        items.iter().map(|s| Self::String(s.as_str().to_string())).collect(),
                    ),
                    other => Self::String(format!("{other:?}")),
                }
            }
        }
    }
}

/// Converts an attribute map into OpenTelemetry key/values.
#[must_use]
pub fn to_key_values(attributes: &Attributes) -> Vec<opentelemetry::KeyValue> {
    attributes
        .iter()
        .map(|(k, v)| opentelemetry::KeyValue::new(k.clone(), opentelemetry::Value::from(v)))
        .collect()
}

/// Converts OpenTelemetry key/values into an attribute map.
///
/// Later duplicates of the same key win, matching SDK semantics.
#[must_use]
pub fn from_key_values(key_values: &[opentelemetry::KeyValue]) -> Attributes {
    key_values
        .iter()
        .map(|kv| (kv.key.as_str().to_string(), AttributeValue::from(&kv.value)))
        .collect()
}
