use serde::{Deserialize, Serialize};

use gws_schemas::*;

use crate::collection::Collection;
use crate::error::StateError;
use crate::select::Selection;

/// Every entity kind of one control plane (or one desired document), flat
/// and indexed.
///
/// Serializes as a list of kind-tagged entities so state snapshots can be
/// stored and reloaded without a bespoke format.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<AnyEntity>", try_from = "Vec<AnyEntity>")]
pub struct GatewayState {
    pub services: Collection<Service>,
    pub routes: Collection<Route>,
    pub plugins: Collection<Plugin>,
    pub consumers: Collection<Consumer>,
    pub consumer_groups: Collection<ConsumerGroup>,
    pub consumer_group_members: Collection<ConsumerGroupMember>,
    pub upstreams: Collection<Upstream>,
    pub targets: Collection<Target>,
    pub certificates: Collection<Certificate>,
    pub snis: Collection<Sni>,
    pub ca_certificates: Collection<CaCertificate>,
    pub vaults: Collection<Vault>,
    pub keys: Collection<Key>,
    pub key_sets: Collection<KeySet>,
    pub partials: Collection<Partial>,
    pub licenses: Collection<License>,
    pub rbac_roles: Collection<RbacRole>,
    pub rbac_endpoint_permissions: Collection<RbacEndpointPermission>,
    pub custom_entities: Collection<CustomEntity>,
}

/// Expands `$body` once per (AnyEntity variant, collection field) pair.
macro_rules! each_kind {
    ($m:ident) => {
        $m! {
            Service => services,
            Route => routes,
            Plugin => plugins,
            Consumer => consumers,
            ConsumerGroup => consumer_groups,
            ConsumerGroupMember => consumer_group_members,
            Upstream => upstreams,
            Target => targets,
            Certificate => certificates,
            Sni => snis,
            CaCertificate => ca_certificates,
            Vault => vaults,
            Key => keys,
            KeySet => key_sets,
            Partial => partials,
            License => licenses,
            RbacRole => rbac_roles,
            RbacEndpointPermission => rbac_endpoint_permissions,
            Custom => custom_entities,
        }
    };
}

macro_rules! state_dispatch {
    ($($variant:ident => $field:ident),+ $(,)?) => {
        impl GatewayState {
            pub fn insert_any(&mut self, entity: AnyEntity) -> Result<(), StateError> {
                match entity {
                    $(AnyEntity::$variant(e) => self.$field.insert(e)),+
                }
            }

            pub fn upsert_any(&mut self, entity: AnyEntity) -> Result<(), StateError> {
                match entity {
                    $(AnyEntity::$variant(e) => self.$field.upsert(e)),+
                }
            }

            pub fn remove_any(&mut self, kind: EntityKind, id: &str) -> Option<AnyEntity> {
                match kind {
                    $(EntityKind::$variant => self.$field.remove(id).map(AnyEntity::from)),+
                }
            }

            pub fn get_any(&self, kind: EntityKind, id: &str) -> Option<AnyEntity> {
                match kind {
                    $(EntityKind::$variant => self.$field.get(id).cloned().map(AnyEntity::from)),+
                }
            }

            pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
                match kind {
                    $(EntityKind::$variant => self.$field.contains(id)),+
                }
            }

            pub fn count(&self, kind: EntityKind) -> usize {
                match kind {
                    $(EntityKind::$variant => self.$field.len()),+
                }
            }

            /// Every entity of `kind`, type-erased, in id order.
            pub fn entities_of(&self, kind: EntityKind) -> Vec<AnyEntity> {
                match kind {
                    $(EntityKind::$variant => {
                        self.$field.iter().cloned().map(AnyEntity::from).collect()
                    }),+
                }
            }

            fn select_taggable(&self, sel: &Selection) -> Self {
                Self {
                    $($field: self.$field.filtered(|e| sel.admits(e)),)+
                }
            }
        }
    };
}

each_kind!(state_dispatch);

/// Typed access to the collection holding `Self` inside a [`GatewayState`].
pub trait Stored: Entity {
    fn collection(state: &GatewayState) -> &Collection<Self>;
    fn collection_mut(state: &mut GatewayState) -> &mut Collection<Self>;
}

macro_rules! stored {
    ($($ty:ty => $field:ident),+ $(,)?) => {
        $(
            impl Stored for $ty {
                fn collection(state: &GatewayState) -> &Collection<Self> {
                    &state.$field
                }

                fn collection_mut(state: &mut GatewayState) -> &mut Collection<Self> {
                    &mut state.$field
                }
            }
        )+
    };
}

stored! {
    Service => services,
    Route => routes,
    Plugin => plugins,
    Consumer => consumers,
    ConsumerGroup => consumer_groups,
    ConsumerGroupMember => consumer_group_members,
    Upstream => upstreams,
    Target => targets,
    Certificate => certificates,
    Sni => snis,
    CaCertificate => ca_certificates,
    Vault => vaults,
    Key => keys,
    KeySet => key_sets,
    Partial => partials,
    License => licenses,
    RbacRole => rbac_roles,
    RbacEndpointPermission => rbac_endpoint_permissions,
    CustomEntity => custom_entities,
}

impl GatewayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of<T: Stored>(&self) -> &Collection<T> {
        T::collection(self)
    }

    pub fn of_mut<T: Stored>(&mut self) -> &mut Collection<T> {
        T::collection_mut(self)
    }

    /// Strict construction: duplicate ids or natural keys are errors.
    pub fn from_entities<I>(entities: I) -> Result<Self, StateError>
    where
        I: IntoIterator<Item = AnyEntity>,
    {
        let mut s = Self::new();
        for e in entities {
            s.insert_any(e)?;
        }
        Ok(s)
    }

    /// Every entity, kinds in creation order, ids ascending within a kind.
    pub fn all_entities(&self) -> Vec<AnyEntity> {
        EntityKind::CREATION_ORDER
            .iter()
            .flat_map(|k| self.entities_of(*k))
            .collect()
    }

    pub fn total(&self) -> usize {
        EntityKind::CREATION_ORDER
            .iter()
            .map(|k| self.count(*k))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// The view a selection-tag run is allowed to see.
    ///
    /// Taggable kinds keep entities carrying at least one selection tag.
    /// Group memberships follow their consumer-group's visibility. Other
    /// untagged kinds (licenses, RBAC) are invisible under a selection.
    pub fn select(&self, sel: &Selection) -> Self {
        if !sel.is_active() {
            return self.clone();
        }
        let mut out = self.select_taggable(sel);
        out.consumer_group_members = self.consumer_group_members.filtered(|m| {
            m.consumer_group
                .id
                .as_deref()
                .map(|g| out.consumer_groups.contains(g))
                .unwrap_or(false)
        });
        out
    }
}

impl From<GatewayState> for Vec<AnyEntity> {
    fn from(state: GatewayState) -> Self {
        state.all_entities()
    }
}

impl TryFrom<Vec<AnyEntity>> for GatewayState {
    type Error = StateError;

    fn try_from(entities: Vec<AnyEntity>) -> Result<Self, Self::Error> {
        GatewayState::from_entities(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged_service(id: &str, name: &str, tags: &[&str]) -> AnyEntity {
        AnyEntity::from(Service {
            id: Some(id.into()),
            name: Some(name.into()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Service::default()
        })
    }

    #[test]
    fn select_hides_untagged_and_foreign_tags() {
        let state = GatewayState::from_entities([
            tagged_service("1", "mine", &["team-a"]),
            tagged_service("2", "theirs", &["team-b"]),
            tagged_service("3", "bare", &[]),
            AnyEntity::from(License {
                id: Some("lic".into()),
                payload: "{}".into(),
                ..License::default()
            }),
        ])
        .unwrap();

        let view = state.select(&Selection::new(["team-a"]));
        assert_eq!(view.services.len(), 1);
        assert!(view.services.contains("1"));
        assert!(view.licenses.is_empty());

        let everything = state.select(&Selection::none());
        assert_eq!(everything.total(), 4);
    }

    #[test]
    fn memberships_follow_group_visibility() {
        let state = GatewayState::from_entities([
            AnyEntity::from(ConsumerGroup {
                id: Some("g1".into()),
                name: Some("gold".into()),
                tags: vec!["t".into()],
                ..ConsumerGroup::default()
            }),
            AnyEntity::from(ConsumerGroup {
                id: Some("g2".into()),
                name: Some("silver".into()),
                ..ConsumerGroup::default()
            }),
            AnyEntity::from(ConsumerGroupMember::new("g1", "c1")),
            AnyEntity::from(ConsumerGroupMember::new("g2", "c1")),
        ])
        .unwrap();

        let view = state.select(&Selection::new(["t"]));
        assert_eq!(view.consumer_group_members.len(), 1);
        assert!(view.consumer_group_members.contains("g1:c1"));
    }

    #[test]
    fn snapshot_roundtrip_through_json() {
        let state = GatewayState::from_entities([tagged_service("1", "svc1", &[])]).unwrap();
        let raw = serde_json::to_string(&state).unwrap();
        let back: GatewayState = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn remove_any_returns_typed_entity() {
        let mut state = GatewayState::from_entities([tagged_service("1", "svc1", &[])]).unwrap();
        let removed = state.remove_any(EntityKind::Service, "1").unwrap();
        assert_eq!(removed.kind(), EntityKind::Service);
        assert!(state.is_empty());
    }

    #[test]
    fn typed_access_reaches_the_same_collection() {
        let mut state = GatewayState::new();
        state
            .of_mut::<Service>()
            .insert(Service {
                id: Some("1".into()),
                ..Service::default()
            })
            .unwrap();
        assert_eq!(state.of::<Service>().len(), 1);
        assert_eq!(state.count(EntityKind::Service), 1);
    }
}
