//! Identity resolution: which current entity (if any) a desired entity is.

use std::collections::BTreeMap;

use gws_schemas::*;
use gws_state::Collection;
use tracing::debug;
use uuid::Uuid;

/// Find the current entity `desired` denotes.
///
/// Natural key first, then the kind's fallback key. When neither finds
/// anything, fall back to the declared id. `current` must already be the
/// selection-filtered view.
pub fn find_match<'c, T: Entity>(desired: &T, current: &'c Collection<T>) -> Option<&'c T> {
    for key in [desired.natural_key(), desired.fallback_key()].into_iter().flatten() {
        if let Some(hit) = current.get_by_key(&key) {
            return Some(hit);
        }
    }
    desired.id().and_then(|id| current.get(id))
}

/// Declared (or provisional) ids that identity resolution replaced with the
/// stored id of the matched current entity. References declared by the old
/// id follow the replacement.
#[derive(Debug, Default)]
pub struct IdRemap {
    moved: BTreeMap<(EntityKind, String), String>,
}

impl IdRemap {
    pub fn record(&mut self, kind: EntityKind, from: String, to: String) {
        self.moved.insert((kind, from), to);
    }

    pub fn resolve<'a>(&'a self, kind: EntityKind, id: &'a str) -> &'a str {
        self.moved
            .get(&(kind, id.to_string()))
            .map(String::as_str)
            .unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.moved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
    }
}

/// Give `entity` its final id.
///
/// A match always wins and the stored id is authoritative. Without a match
/// a declared id is kept (create with client-supplied id); otherwise a
/// fresh UUID v4 is assigned so dependents can reference it.
pub fn settle<T: Entity>(entity: &mut T, visible: &Collection<T>, remap: &mut IdRemap) {
    let declared = entity.id().map(str::to_string);
    match find_match(entity, visible).and_then(|c| c.id()) {
        Some(stored) => {
            if declared.as_deref() != Some(stored) {
                debug!(
                    kind = %T::KIND,
                    name = %entity.display_name(),
                    declared = ?declared,
                    stored,
                    "adopting stored id"
                );
                let stored = stored.to_string();
                if let Some(d) = declared {
                    remap.record(T::KIND, d, stored.clone());
                }
                entity.set_id(stored);
            }
        }
        None => {
            if declared.is_none() {
                entity.set_id(Uuid::new_v4().to_string());
            }
        }
    }
}

/// Kinds other entities may point at by name.
pub trait Referable: Entity {
    fn answers_to_name(&self, name: &str) -> bool {
        self.natural_key().map(|k| k.head() == name).unwrap_or(false)
    }
}

impl Referable for Service {}
impl Referable for Route {}
impl Referable for Upstream {}
impl Referable for ConsumerGroup {}
impl Referable for KeySet {}
impl Referable for Partial {}
impl Referable for RbacRole {}

impl Referable for Consumer {
    fn answers_to_name(&self, name: &str) -> bool {
        self.answers_to(name)
    }
}

impl Referable for Certificate {
    // Certificates have no name; only ids reference them.
    fn answers_to_name(&self, _name: &str) -> bool {
        false
    }
}

impl Referable for CaCertificate {
    fn answers_to_name(&self, _name: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(id: Option<&str>, name: &str) -> Service {
        Service {
            id: id.map(str::to_string),
            name: Some(name.into()),
            ..Service::default()
        }
    }

    fn current() -> Collection<Service> {
        [svc(Some("stored-1"), "svc1"), svc(Some("stored-2"), "svc2")]
            .into_iter()
            .collect()
    }

    #[test]
    fn natural_key_beats_declared_id() {
        let cur = current();
        let desired = svc(Some("stored-2"), "svc1");
        let hit = find_match(&desired, &cur).unwrap();
        assert_eq!(hit.id.as_deref(), Some("stored-1"));
    }

    #[test]
    fn renamed_entity_matches_by_id() {
        let cur = current();
        let desired = svc(Some("stored-2"), "renamed");
        let hit = find_match(&desired, &cur).unwrap();
        assert_eq!(hit.name.as_deref(), Some("svc2"));
    }

    #[test]
    fn settle_adopts_stored_id_and_records_remap() {
        let cur = current();
        let mut remap = IdRemap::default();
        let mut desired = svc(Some("declared"), "svc1");
        settle(&mut desired, &cur, &mut remap);
        assert_eq!(desired.id.as_deref(), Some("stored-1"));
        assert_eq!(remap.resolve(EntityKind::Service, "declared"), "stored-1");
    }

    #[test]
    fn settle_keeps_client_id_or_assigns_uuid() {
        let cur = current();
        let mut remap = IdRemap::default();

        let mut explicit = svc(Some("mine"), "new");
        settle(&mut explicit, &cur, &mut remap);
        assert_eq!(explicit.id.as_deref(), Some("mine"));

        let mut fresh = svc(None, "newer");
        settle(&mut fresh, &cur, &mut remap);
        let id = fresh.id.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert!(remap.is_empty());
    }

    #[test]
    fn consumer_gaining_a_username_matches_by_custom_id() {
        let stored: Collection<Consumer> = [Consumer {
            id: Some("c-1".into()),
            custom_id: Some("ext-1".into()),
            ..Consumer::default()
        }]
        .into_iter()
        .collect();
        let desired = Consumer {
            username: Some("alice".into()),
            custom_id: Some("ext-1".into()),
            ..Consumer::default()
        };
        let hit = find_match(&desired, &stored).unwrap();
        assert_eq!(hit.id.as_deref(), Some("c-1"));
    }

    #[test]
    fn consumer_answers_to_custom_id() {
        let c = Consumer {
            custom_id: Some("ext-1".into()),
            ..Consumer::default()
        };
        assert!(c.answers_to_name("ext-1"));
        assert!(!Certificate::default().answers_to_name("anything"));
    }
}
