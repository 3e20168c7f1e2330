//! Type-erased entity, used where heterogeneous kinds travel together:
//! change plans, change records and the control-plane client seam.

use serde::{Deserialize, Serialize};

use crate::entities::*;
use crate::entity::{Entity, NaturalKey};
use crate::foreign::Reference;
use crate::kind::EntityKind;
use crate::value::ConfigMap;

macro_rules! any_entity {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
        pub enum AnyEntity {
            $($variant($ty)),+
        }

        impl AnyEntity {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(AnyEntity::$variant(_) => <$ty as Entity>::KIND),+
                }
            }

            pub fn id(&self) -> Option<&str> {
                match self {
                    $(AnyEntity::$variant(e) => e.id()),+
                }
            }

            pub fn set_id(&mut self, id: String) {
                match self {
                    $(AnyEntity::$variant(e) => e.set_id(id)),+
                }
            }

            pub fn natural_key(&self) -> Option<NaturalKey> {
                match self {
                    $(AnyEntity::$variant(e) => e.natural_key()),+
                }
            }

            pub fn tags(&self) -> &[String] {
                match self {
                    $(AnyEntity::$variant(e) => e.tags()),+
                }
            }

            pub fn references(&self) -> Vec<Reference> {
                match self {
                    $(AnyEntity::$variant(e) => e.references()),+
                }
            }

            pub fn display_name(&self) -> String {
                match self {
                    $(AnyEntity::$variant(e) => e.display_name()),+
                }
            }

            pub fn body(&self) -> Result<ConfigMap, serde_json::Error> {
                match self {
                    $(AnyEntity::$variant(e) => e.body()),+
                }
            }

            pub fn without_timestamps(&self) -> Result<Self, serde_json::Error> {
                Ok(match self {
                    $(AnyEntity::$variant(e) => AnyEntity::$variant(e.without_timestamps()?)),+
                })
            }
        }

        $(
            impl From<$ty> for AnyEntity {
                fn from(e: $ty) -> Self {
                    AnyEntity::$variant(e)
                }
            }
        )+
    };
}

any_entity! {
    Service(Service),
    Route(Route),
    Plugin(Plugin),
    Consumer(Consumer),
    ConsumerGroup(ConsumerGroup),
    ConsumerGroupMember(ConsumerGroupMember),
    Upstream(Upstream),
    Target(Target),
    Certificate(Certificate),
    Sni(Sni),
    CaCertificate(CaCertificate),
    Vault(Vault),
    Key(Key),
    KeySet(KeySet),
    Partial(Partial),
    License(License),
    RbacRole(RbacRole),
    RbacEndpointPermission(RbacEndpointPermission),
    Custom(CustomEntity),
}

impl AnyEntity {
    /// `<kind> <display name>`, e.g. `service svc1`.
    pub fn describe(&self) -> String {
        format!("{} {}", self.kind(), self.display_name())
    }
}
