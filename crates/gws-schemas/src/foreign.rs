use serde::{Deserialize, Serialize};

use crate::kind::EntityKind;
use crate::value::ConfigMap;

/// A reference from one entity to another, as declared.
///
/// Declarations may point at a parent by `id`, by `name`, or (with default
/// lookup tags configured) by nothing at all. Any other field present means
/// the author inlined a full parent object where only a reference is legal;
/// those fields land in `inline` so validation can reject them by name.
///
/// After resolution every reference is bare: `id` set, `name` and `inline`
/// empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub inline: ConfigMap,
}

impl ForeignKey {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// `true` when nothing but `id`/`name` was declared.
    pub fn is_bare(&self) -> bool {
        self.inline.is_empty()
    }

    /// `true` when neither `id` nor `name` was declared.
    pub fn is_unqualified(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }

    /// Human label: name if known, else id, else `<unqualified>`.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "<unqualified>".to_string())
    }
}

/// A resolved dependency edge: "this entity needs `kind`/`id` to exist".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub kind: EntityKind,
    pub id: String,
}

impl Reference {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Collect resolved ids of optional foreign keys as references.
pub(crate) fn push_ref(out: &mut Vec<Reference>, kind: EntityKind, fk: &Option<ForeignKey>) {
    if let Some(id) = fk.as_ref().and_then(|f| f.id.as_deref()) {
        out.push(Reference::new(kind, id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_fields_are_captured() {
        let fk: ForeignKey =
            serde_json::from_str(r#"{"name":"r","paths":["/x"],"strip_path":true}"#).unwrap();
        assert_eq!(fk.name.as_deref(), Some("r"));
        assert!(!fk.is_bare());
        assert_eq!(fk.inline.len(), 2);
    }

    #[test]
    fn bare_reference_serializes_compactly() {
        let fk = ForeignKey::by_id("abc");
        assert_eq!(serde_json::to_string(&fk).unwrap(), r#"{"id":"abc"}"#);
        assert!(fk.is_bare());
        assert!(!fk.is_unqualified());
    }
}
