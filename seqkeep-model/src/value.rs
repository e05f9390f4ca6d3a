use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A scalar attribute value used as a partition key.
///
/// Two records belong to the same partition when every configured group
/// attribute compares equal, `Null` included. Values of different JSON
/// types never compare equal, so `1`, `true`, `1.5`, `"1.5"` and `[1]` are
/// five distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    /// A non-integral number, kept as its JSON text.
    Number(String),
    Text(String),
    /// An array or object, kept as its serialized JSON.
    Json(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Converts a JSON value into a group key.
    ///
    /// Integral numbers become `Int` and strings become `Text`. Fractional
    /// numbers, arrays and objects keep their JSON text in their own variants.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        FieldValue::Int(f as i64)
                    }
                    _ => FieldValue::Number(n.to_string()),
                },
            },
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Json(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Number(n) => n
                .parse::<serde_json::Number>()
                .map_or_else(|_| Value::String(n.clone()), Value::Number),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Json(j) => {
                serde_json::from_str(j).unwrap_or_else(|_| Value::String(j.clone()))
            }
        }
    }

    /// Canonical JSON text of the value, distinct for every variant.
    /// `Null` has none.
    pub fn to_json_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Number(n) => Some(n.clone()),
            FieldValue::Json(j) => Some(j.clone()),
            other => Some(other.to_json().to_string()),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::from_json(&value)
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        value.to_json()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Number(n) => f.write_str(n),
            FieldValue::Text(s) => write!(f, "{s:?}"),
            FieldValue::Json(j) => f.write_str(j),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}
