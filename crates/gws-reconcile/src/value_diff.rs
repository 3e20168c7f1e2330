//! Structural diff over [`ConfigValue`] trees.

use serde::{Deserialize, Serialize};
use std::fmt;

use gws_schemas::{ConfigMap, ConfigValue};

/// One changed leaf. Maps are walked key by key; anything else (lists,
/// scalars, a map replaced by a scalar) is compared whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Dotted path from the entity root, e.g. `config.minute`.
    pub path: String,
    pub old: Option<ConfigValue>,
    pub new: Option<ConfigValue>,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<ConfigValue>| match v {
            None => "<absent>".to_string(),
            Some(v) => serde_json::to_string(v).unwrap_or_else(|_| format!("{v:?}")),
        };
        write!(f, "{}: {} -> {}", self.path, show(&self.old), show(&self.new))
    }
}

/// Changes turning `old` into `new`, in path order.
pub fn diff_maps(old: &ConfigMap, new: &ConfigMap) -> Vec<FieldChange> {
    let mut out = Vec::new();
    walk("", old, new, &mut out);
    out
}

fn walk(prefix: &str, old: &ConfigMap, new: &ConfigMap, out: &mut Vec<FieldChange>) {
    let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match (old.get(key), new.get(key)) {
            (Some(ConfigValue::Map(a)), Some(ConfigValue::Map(b))) => walk(&path, a, b, out),
            (a, b) if a == b => {}
            (a, b) => out.push(FieldChange {
                path,
                old: a.cloned(),
                new: b.cloned(),
            }),
        }
    }
}
