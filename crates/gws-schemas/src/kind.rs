use serde::{Deserialize, Serialize};
use std::fmt;

/// Every category of gateway object the engine knows how to reconcile.
///
/// Declaration order is NOT significant; dependency order lives in
/// [`EntityKind::CREATION_ORDER`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Service,
    Route,
    Plugin,
    Consumer,
    ConsumerGroup,
    ConsumerGroupMember,
    Upstream,
    Target,
    Certificate,
    Sni,
    CaCertificate,
    Vault,
    Key,
    KeySet,
    Partial,
    License,
    RbacRole,
    RbacEndpointPermission,
    Custom,
}

impl EntityKind {
    /// Kinds in the order they must be created: anything an entity can
    /// reference appears before it. Deletes walk this list backwards.
    pub const CREATION_ORDER: [EntityKind; 19] = [
        EntityKind::Vault,
        EntityKind::CaCertificate,
        EntityKind::Certificate,
        EntityKind::Sni,
        EntityKind::KeySet,
        EntityKind::Key,
        EntityKind::License,
        EntityKind::Partial,
        EntityKind::RbacRole,
        EntityKind::RbacEndpointPermission,
        EntityKind::Upstream,
        EntityKind::Target,
        EntityKind::Service,
        EntityKind::Route,
        EntityKind::Consumer,
        EntityKind::ConsumerGroup,
        EntityKind::ConsumerGroupMember,
        EntityKind::Plugin,
        EntityKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Service => "service",
            EntityKind::Route => "route",
            EntityKind::Plugin => "plugin",
            EntityKind::Consumer => "consumer",
            EntityKind::ConsumerGroup => "consumer-group",
            EntityKind::ConsumerGroupMember => "consumer-group-consumer",
            EntityKind::Upstream => "upstream",
            EntityKind::Target => "target",
            EntityKind::Certificate => "certificate",
            EntityKind::Sni => "sni",
            EntityKind::CaCertificate => "ca-certificate",
            EntityKind::Vault => "vault",
            EntityKind::Key => "key",
            EntityKind::KeySet => "key-set",
            EntityKind::Partial => "partial",
            EntityKind::License => "license",
            EntityKind::RbacRole => "rbac-role",
            EntityKind::RbacEndpointPermission => "rbac-endpoint-permission",
            EntityKind::Custom => "custom-entity",
        }
    }

    /// Position of this kind in [`EntityKind::CREATION_ORDER`].
    pub fn creation_rank(&self) -> usize {
        Self::CREATION_ORDER
            .iter()
            .position(|k| k == self)
            .unwrap_or(Self::CREATION_ORDER.len())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_order_covers_every_kind_once() {
        let mut seen = std::collections::BTreeSet::new();
        for k in EntityKind::CREATION_ORDER {
            assert!(seen.insert(k), "{k} listed twice");
        }
        assert_eq!(seen.len(), 19);
    }

    #[test]
    fn parents_rank_before_children() {
        assert!(EntityKind::Service.creation_rank() < EntityKind::Route.creation_rank());
        assert!(EntityKind::Route.creation_rank() < EntityKind::Plugin.creation_rank());
        assert!(EntityKind::Partial.creation_rank() < EntityKind::Plugin.creation_rank());
        assert!(
            EntityKind::Consumer.creation_rank() < EntityKind::ConsumerGroupMember.creation_rank()
        );
        assert!(EntityKind::Certificate.creation_rank() < EntityKind::Service.creation_rank());
    }
}
