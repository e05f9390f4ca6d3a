//! Sequence configuration resolution.
//!
//! An entity type declares a (possibly empty) set of overrides; those are
//! merged over the defaults into a closed option map. Only keys present in
//! the defaults may be overridden or looked up.

use crate::error::{ConfigError, ConfigResult};
use crate::FIRST_SEQUENCE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attribute name(s) that partition the table.
pub const GROUP: &str = "group";
/// Name of the field holding the sequence value.
pub const FIELD_NAME: &str = "fieldName";
/// Whether boundary violations raise instead of being ignored.
pub const EXCEPTIONS: &str = "exceptions";
/// Whether caller-facing positions are 1-based.
pub const ORDER_FROM_1: &str = "orderFrom1";

const DEFAULT_FIELD_NAME: &str = "seq";

/// Maps accepted spellings onto the canonical option key.
fn canonical_key(key: &str) -> &str {
    match key {
        "field_name" => FIELD_NAME,
        "order_from_1" | "order_from1" => ORDER_FROM_1,
        other => other,
    }
}

/// The resolved key/value option map for one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceOptions {
    values: BTreeMap<String, Value>,
}

impl SequenceOptions {
    /// The documented defaults.
    pub fn defaults() -> Self {
        let mut values = BTreeMap::new();
        values.insert(GROUP.to_string(), Value::String(String::new()));
        values.insert(
            FIELD_NAME.to_string(),
            Value::String(DEFAULT_FIELD_NAME.to_string()),
        );
        values.insert(EXCEPTIONS.to_string(), Value::Bool(false));
        values.insert(ORDER_FROM_1.to_string(), Value::Bool(false));
        Self { values }
    }

    /// Merges overrides over `self`. Keys not already present are rejected.
    pub fn merge(mut self, overrides: &Map<String, Value>) -> ConfigResult<Self> {
        for (key, value) in overrides {
            let key = canonical_key(key);
            match self.values.get_mut(key) {
                Some(slot) => *slot = value.clone(),
                None => return Err(ConfigError::UnknownKey(key.to_string())),
            }
        }
        Ok(self)
    }

    /// Looks up a resolved option.
    pub fn get(&self, key: &str) -> ConfigResult<&Value> {
        let key = canonical_key(key);
        self.values
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn get_bool(&self, key: &str) -> ConfigResult<bool> {
        self.get(key)?.as_bool().ok_or(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a boolean",
        })
    }
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Typed view of an entity type's resolved sequence options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Map<String, Value>")]
pub struct SequenceConfig {
    /// Partition attributes; empty means one global partition.
    pub group: Vec<String>,
    pub field_name: String,
    pub exceptions: bool,
    #[serde(rename = "orderFrom1")]
    pub order_from_1: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            group: Vec::new(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            exceptions: false,
            order_from_1: false,
        }
    }
}

impl SequenceConfig {
    /// Resolves entity-supplied overrides against the defaults.
    pub fn resolve(overrides: &Map<String, Value>) -> ConfigResult<Self> {
        let options = SequenceOptions::defaults().merge(overrides)?;
        Self::from_options(&options)
    }

    /// Resolves overrides given as a JSON object document.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let overrides: Map<String, Value> = serde_json::from_str(json)?;
        Self::resolve(&overrides)
    }

    pub fn from_options(options: &SequenceOptions) -> ConfigResult<Self> {
        let field_name = match options.get(FIELD_NAME)? {
            Value::String(s) if !s.is_empty() => s.clone(),
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: FIELD_NAME.to_string(),
                    expected: "a non-empty string",
                })
            }
        };
        Ok(Self {
            group: parse_group(options.get(GROUP)?)?,
            field_name,
            exceptions: options.get_bool(EXCEPTIONS)?,
            order_from_1: options.get_bool(ORDER_FROM_1)?,
        })
    }

    /// Converts back into the option map, e.g. for [`SequenceOptions::get`] lookups.
    pub fn options(&self) -> SequenceOptions {
        let group = match self.group.as_slice() {
            [] => Value::String(String::new()),
            [one] => Value::String(one.clone()),
            many => Value::Array(many.iter().cloned().map(Value::String).collect()),
        };
        let values = BTreeMap::from([
            (GROUP.to_string(), group),
            (FIELD_NAME.to_string(), Value::String(self.field_name.clone())),
            (EXCEPTIONS.to_string(), Value::Bool(self.exceptions)),
            (ORDER_FROM_1.to_string(), Value::Bool(self.order_from_1)),
        ]);
        SequenceOptions { values }
    }

    /// Looks up a single option by key.
    pub fn option(&self, key: &str) -> ConfigResult<Value> {
        self.options().get(key).cloned()
    }

    pub fn is_grouped(&self) -> bool {
        !self.group.is_empty()
    }

    /// First caller-facing position: 0, or 1 with `orderFrom1`.
    pub fn start(&self) -> i64 {
        if self.order_from_1 { 1 } else { 0 }
    }

    /// Translates a caller-facing position into a stored sequence value.
    ///
    /// Stored values always begin at [`FIRST_SEQUENCE`], so 0-based positions
    /// are shifted up by one and 1-based positions pass through unchanged.
    pub fn sequence_for_position(&self, position: i64) -> i64 {
        position.saturating_add(FIRST_SEQUENCE - self.start())
    }

    /// Translates a stored sequence value into a caller-facing position.
    pub fn position_for_sequence(&self, sequence: i64) -> i64 {
        sequence.saturating_sub(FIRST_SEQUENCE - self.start())
    }
}

impl TryFrom<Map<String, Value>> for SequenceConfig {
    type Error = ConfigError;

    fn try_from(overrides: Map<String, Value>) -> ConfigResult<Self> {
        Self::resolve(&overrides)
    }
}

fn parse_group(value: &Value) -> ConfigResult<Vec<String>> {
    let invalid = || ConfigError::InvalidValue {
        key: GROUP.to_string(),
        expected: "a string or a list of strings",
    };
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => {
            let mut group = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some("") => {}
                    Some(name) => group.push(name.to_string()),
                    None => return Err(invalid()),
                }
            }
            Ok(group)
        }
        _ => Err(invalid()),
    }
}
