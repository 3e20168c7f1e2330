//! Declarative content: the desired-state object graph as handed over by
//! the file loader.
//!
//! Children may be nested under their parent or declared top-level with an
//! explicit foreign key. Nesting is sugar: the resolver flattens everything
//! into a `GatewayState` with resolved ids before diffing.

use serde::{Deserialize, Serialize};

use crate::entities::*;
use crate::foreign::ForeignKey;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDecl {
    #[serde(flatten)]
    pub service: Service,
    pub routes: Vec<RouteDecl>,
    pub plugins: Vec<Plugin>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteDecl {
    #[serde(flatten)]
    pub route: Route,
    pub plugins: Vec<Plugin>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerDecl {
    #[serde(flatten)]
    pub consumer: Consumer,
    pub plugins: Vec<Plugin>,
    /// Consumer-groups this consumer belongs to.
    pub groups: Vec<ForeignKey>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerGroupDecl {
    #[serde(flatten)]
    pub consumer_group: ConsumerGroup,
    /// Consumers belonging to this group.
    pub consumers: Vec<ForeignKey>,
    pub plugins: Vec<Plugin>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamDecl {
    #[serde(flatten)]
    pub upstream: Upstream,
    pub targets: Vec<Target>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateDecl {
    #[serde(flatten)]
    pub certificate: Certificate,
    pub snis: Vec<Sni>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySetDecl {
    #[serde(flatten)]
    pub key_set: KeySet,
    pub keys: Vec<Key>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacRoleDecl {
    #[serde(flatten)]
    pub role: RbacRole,
    pub endpoint_permissions: Vec<RbacEndpointPermission>,
}

/// One (possibly merged) declarative document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    pub services: Vec<ServiceDecl>,
    pub routes: Vec<RouteDecl>,
    pub plugins: Vec<Plugin>,
    pub consumers: Vec<ConsumerDecl>,
    pub consumer_groups: Vec<ConsumerGroupDecl>,
    pub upstreams: Vec<UpstreamDecl>,
    pub targets: Vec<Target>,
    pub certificates: Vec<CertificateDecl>,
    pub snis: Vec<Sni>,
    pub ca_certificates: Vec<CaCertificate>,
    pub vaults: Vec<Vault>,
    pub key_sets: Vec<KeySetDecl>,
    pub keys: Vec<Key>,
    pub partials: Vec<Partial>,
    pub licenses: Vec<License>,
    pub rbac_roles: Vec<RbacRoleDecl>,
    pub rbac_endpoint_permissions: Vec<RbacEndpointPermission>,
    pub custom_entities: Vec<CustomEntity>,
}

impl Content {
    /// Concatenate several documents, in order. Federated setups split one
    /// control plane's configuration across files; merging is plain
    /// concatenation, duplicate handling is the resolver's job.
    pub fn merge(docs: impl IntoIterator<Item = Content>) -> Content {
        let mut out = Content::default();
        for d in docs {
            out.services.extend(d.services);
            out.routes.extend(d.routes);
            out.plugins.extend(d.plugins);
            out.consumers.extend(d.consumers);
            out.consumer_groups.extend(d.consumer_groups);
            out.upstreams.extend(d.upstreams);
            out.targets.extend(d.targets);
            out.certificates.extend(d.certificates);
            out.snis.extend(d.snis);
            out.ca_certificates.extend(d.ca_certificates);
            out.vaults.extend(d.vaults);
            out.key_sets.extend(d.key_sets);
            out.keys.extend(d.keys);
            out.partials.extend(d.partials);
            out.licenses.extend(d.licenses);
            out.rbac_roles.extend(d.rbac_roles);
            out.rbac_endpoint_permissions
                .extend(d.rbac_endpoint_permissions);
            out.custom_entities.extend(d.custom_entities);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_service_document_deserializes() {
        let raw = r#"{
            "services": [{
                "name": "svc1",
                "host": "mockbin.org",
                "port": 80,
                "routes": [{
                    "name": "r1",
                    "paths": ["/r1"],
                    "plugins": [{ "name": "key-auth" }]
                }]
            }]
        }"#;
        let c: Content = serde_json::from_str(raw).unwrap();
        let svc = &c.services[0];
        assert_eq!(svc.service.name.as_deref(), Some("svc1"));
        assert_eq!(svc.service.port, Some(80));
        assert_eq!(svc.routes[0].route.paths, vec!["/r1".to_string()]);
        assert_eq!(svc.routes[0].plugins[0].name, "key-auth");
    }

    #[test]
    fn merge_concatenates_in_order() {
        let a = Content {
            vaults: vec![Vault {
                prefix: "a".into(),
                ..Vault::default()
            }],
            ..Content::default()
        };
        let b = Content {
            vaults: vec![Vault {
                prefix: "b".into(),
                ..Vault::default()
            }],
            ..Content::default()
        };
        let m = Content::merge([a, b]);
        let prefixes: Vec<_> = m.vaults.iter().map(|v| v.prefix.as_str()).collect();
        assert_eq!(prefixes, ["a", "b"]);
    }
}
