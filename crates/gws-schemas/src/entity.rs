use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

use crate::foreign::Reference;
use crate::kind::EntityKind;
use crate::value::{to_config_value, ConfigMap, ConfigValue};

/// Fields never compared and never echoed back on update: the control plane
/// owns them.
pub const VOLATILE_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// Kind-specific identity: the field values that make two records "the same"
/// logical entity regardless of their ids. Scoped kinds include the resolved
/// ids of their scoping parents, with an empty string for "no parent".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NaturalKey(Vec<String>);

impl NaturalKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn single(part: impl Into<String>) -> Self {
        Self(vec![part.into()])
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// First component: the "name" part of the key.
    pub fn head(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<&str> = self
            .0
            .iter()
            .map(|p| if p.is_empty() { "-" } else { p.as_str() })
            .collect();
        f.write_str(&shown.join(":"))
    }
}

/// Behaviour shared by every typed gateway entity.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    /// Kinds without a `tags` column (licenses, RBAC, group memberships).
    const TAGGABLE: bool = true;

    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    fn natural_key(&self) -> Option<NaturalKey>;

    /// Key tried when nothing carries the natural key, for kinds whose
    /// natural key can move from one field to another.
    fn fallback_key(&self) -> Option<NaturalKey> {
        None
    }

    fn tags(&self) -> &[String];

    fn tags_mut(&mut self) -> Option<&mut Vec<String>>;

    /// Resolved foreign keys of this entity. Unresolved references (no id)
    /// are not reported.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Label used in plans, change records and error messages.
    fn display_name(&self) -> String {
        self.natural_key()
            .map(|k| k.head().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| self.id().map(str::to_string))
            .unwrap_or_else(|| "<unnamed>".to_string())
    }

    fn has_any_tag(&self, wanted: &[String]) -> bool {
        self.tags().iter().any(|t| wanted.contains(t))
    }

    /// Comparable body: every declared field except [`VOLATILE_FIELDS`].
    fn body(&self) -> Result<ConfigMap, serde_json::Error> {
        let mut map = match to_config_value(self)? {
            ConfigValue::Map(m) => m,
            _ => ConfigMap::new(),
        };
        for field in VOLATILE_FIELDS {
            map.remove(*field);
        }
        Ok(map)
    }

    /// Copy of this entity with `created_at`/`updated_at` cleared.
    fn without_timestamps(&self) -> Result<Self, serde_json::Error> {
        let mut v = serde_json::to_value(self)?;
        if let Some(obj) = v.as_object_mut() {
            obj.remove("created_at");
            obj.remove("updated_at");
        }
        serde_json::from_value(v)
    }
}

/// Implements the id/tag accessors for structs with `id: Option<String>`
/// and `tags: Vec<String>` fields.
macro_rules! id_and_tags {
    () => {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }

        fn tags(&self) -> &[String] {
            &self.tags
        }

        fn tags_mut(&mut self) -> Option<&mut Vec<String>> {
            Some(&mut self.tags)
        }
    };
}

/// Same as [`id_and_tags`] for kinds with no tags column.
macro_rules! id_untagged {
    () => {
        const TAGGABLE: bool = false;

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }

        fn tags(&self) -> &[String] {
            &[]
        }

        fn tags_mut(&mut self) -> Option<&mut Vec<String>> {
            None
        }
    };
}

pub(crate) use id_and_tags;
pub(crate) use id_untagged;
