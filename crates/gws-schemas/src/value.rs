//! Dynamic configuration values.
//!
//! Plugin, partial, vault and custom-entity configuration is schema-driven
//! and arbitrarily nested. It is carried as a closed variant tree rather than
//! as `serde_json::Value` so the differ can walk it without caring about the
//! wire format. Maps are `BTreeMap`s: key order is deterministic, which keeps
//! plans and hashes stable across runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered key -> value mapping.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<ConfigValue>),
    Map(ConfigMap),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Short type label used in diff output.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Number(_) => "number",
            ConfigValue::String(_) => "string",
            ConfigValue::List(_) => "list",
            ConfigValue::Map(_) => "map",
        }
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) => ConfigValue::Number(n),
            Value::String(s) => ConfigValue::String(s),
            Value::Array(items) => {
                ConfigValue::List(items.into_iter().map(ConfigValue::from).collect())
            }
            Value::Object(map) => ConfigValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<ConfigValue> for serde_json::Value {
    fn from(v: ConfigValue) -> Self {
        use serde_json::Value;
        match v {
            ConfigValue::Null => Value::Null,
            ConfigValue::Bool(b) => Value::Bool(b),
            ConfigValue::Number(n) => Value::Number(n),
            ConfigValue::String(s) => Value::String(s),
            ConfigValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            ConfigValue::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Number(n.into())
    }
}

/// Serialize any value into the variant tree.
pub fn to_config_value<T: Serialize>(value: &T) -> Result<ConfigValue, serde_json::Error> {
    serde_json::to_value(value).map(ConfigValue::from)
}
