use crate::{FieldValue, RecordId};
use serde::{Deserialize, Serialize};

/// A generic row whose attributes live in a JSON object.
///
/// The sequence field and group attributes are ordinary top-level keys of
/// `data`; which keys those are is decided by the entity type's
/// [`SequenceConfig`](crate::SequenceConfig), not by the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub entity_type: String,
    pub data: serde_json::Value,
}

impl Record {
    /// Creates a record with a fresh ID.
    ///
    /// Non-object `data` is replaced by an empty object so attribute writes
    /// always have somewhere to land.
    pub fn new(entity_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self::with_id(RecordId::new(), entity_type, data)
    }

    pub fn with_id(id: RecordId, entity_type: impl Into<String>, data: serde_json::Value) -> Self {
        let data = if data.is_object() {
            data
        } else {
            serde_json::Value::Object(serde_json::Map::new())
        };
        Self {
            id,
            entity_type: entity_type.into(),
            data,
        }
    }

    /// Raw JSON value of a top-level attribute.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Extract a string attribute.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    /// Extract an integer attribute.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// Extract a boolean attribute.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Attribute as a partition key; missing attributes are `Null`.
    pub fn field_value(&self, key: &str) -> FieldValue {
        self.get(key).map_or(FieldValue::Null, FieldValue::from_json)
    }

    /// Sets a top-level attribute.
    pub fn set(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        if let Some(map) = self.data.as_object_mut() {
            map.insert(key.to_string(), value.into());
        }
    }
}
