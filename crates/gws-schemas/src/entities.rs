//! Typed gateway entities.
//!
//! Field sets cover what reconciliation needs to compare and send; the
//! control plane may know more fields than are listed here, and version
//! normalization (default filling) happens before these values reach the
//! engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entity::{id_and_tags, id_untagged, Entity, NaturalKey};
use crate::foreign::{push_ref, ForeignKey, Reference};
use crate::kind::EntityKind;
use crate::value::{ConfigMap, ConfigValue};

fn fk_id(fk: &Option<ForeignKey>) -> String {
    fk.as_ref()
        .and_then(|f| f.id.clone())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Proxy: services, routes, upstreams, targets
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<ForeignKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ca_certificates: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for Service {
    const KIND: EntityKind = EntityKind::Service;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        self.name.clone().map(NaturalKey::single)
    }

    fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        push_ref(&mut out, EntityKind::Certificate, &self.client_certificate);
        for ca in &self.ca_certificates {
            out.push(Reference::new(EntityKind::CaCertificate, ca.clone()));
        }
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ForeignKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snis: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_path: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_host: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_handling: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_redirect_status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_buffering: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_buffering: Option<bool>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for Route {
    const KIND: EntityKind = EntityKind::Route;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        self.name.clone().map(NaturalKey::single)
    }

    fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        push_ref(&mut out, EntityKind::Service, &self.service);
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Upstream {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_on_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthchecks: Option<ConfigValue>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for Upstream {
    const KIND: EntityKind = EntityKind::Upstream;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        self.name.clone().map(NaturalKey::single)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<ForeignKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for Target {
    const KIND: EntityKind = EntityKind::Target;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        Some(NaturalKey::new([
            self.target.clone(),
            fk_id(&self.upstream),
        ]))
    }

    fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        push_ref(&mut out, EntityKind::Upstream, &self.upstream);
        out
    }
}

// ---------------------------------------------------------------------------
// Plugins and partials
// ---------------------------------------------------------------------------

/// Link from a plugin to a partial. `path` names the config subtree the
/// partial supplies; it is carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plugin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ForeignKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<ForeignKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer: Option<ForeignKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_group: Option<ForeignKey>,
    pub config: ConfigMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<ConfigValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partials: Vec<PartialLink>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Plugin {
    /// `config.namespace` when it is a string; used to tell apart
    /// consumer-group plugin declarations sharing a name and group.
    pub fn namespace(&self) -> Option<&str> {
        self.config.get("namespace").and_then(ConfigValue::as_str)
    }

    /// Human description of where the plugin applies.
    pub fn scope_label(&self) -> String {
        let mut parts = Vec::new();
        for (what, fk) in [
            ("service", &self.service),
            ("route", &self.route),
            ("consumer", &self.consumer),
            ("consumer-group", &self.consumer_group),
        ] {
            if let Some(fk) = fk {
                parts.push(format!("{what} {}", fk.label()));
            }
        }
        if parts.is_empty() {
            "global".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl Entity for Plugin {
    const KIND: EntityKind = EntityKind::Plugin;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        Some(NaturalKey::new([
            self.name.clone(),
            self.instance_name.clone().unwrap_or_default(),
            fk_id(&self.service),
            fk_id(&self.route),
            fk_id(&self.consumer),
            fk_id(&self.consumer_group),
            // Group-scoped plugins may repeat per namespace.
            if self.consumer_group.is_some() {
                self.namespace().unwrap_or_default().to_string()
            } else {
                String::new()
            },
        ]))
    }

    fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        push_ref(&mut out, EntityKind::Service, &self.service);
        push_ref(&mut out, EntityKind::Route, &self.route);
        push_ref(&mut out, EntityKind::Consumer, &self.consumer);
        push_ref(&mut out, EntityKind::ConsumerGroup, &self.consumer_group);
        for link in &self.partials {
            if let Some(id) = &link.id {
                out.push(Reference::new(EntityKind::Partial, id.clone()));
            }
        }
        out
    }

    fn display_name(&self) -> String {
        match &self.instance_name {
            Some(instance) => format!("{} ({instance})", self.name),
            None => format!("{} ({})", self.name, self.scope_label()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Partial {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub partial_type: Option<String>,
    pub config: ConfigMap,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for Partial {
    const KIND: EntityKind = EntityKind::Partial;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        self.name.clone().map(NaturalKey::single)
    }
}

// ---------------------------------------------------------------------------
// Consumers
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consumer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Consumer {
    /// A consumer reference by "name" matches either identifier.
    pub fn answers_to(&self, name: &str) -> bool {
        self.username.as_deref() == Some(name) || self.custom_id.as_deref() == Some(name)
    }
}

impl Entity for Consumer {
    const KIND: EntityKind = EntityKind::Consumer;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        self.username
            .clone()
            .map(|u| NaturalKey::new(["username".to_string(), u]))
            .or_else(|| {
                self.custom_id
                    .clone()
                    .map(|c| NaturalKey::new(["custom_id".to_string(), c]))
            })
    }

    /// A consumer that gained a username is still the one stored under its
    /// custom_id.
    fn fallback_key(&self) -> Option<NaturalKey> {
        self.username.as_ref()?;
        self.custom_id
            .clone()
            .map(|c| NaturalKey::new(["custom_id".to_string(), c]))
    }

    fn display_name(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.custom_id.clone())
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for ConsumerGroup {
    const KIND: EntityKind = EntityKind::ConsumerGroup;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        self.name.clone().map(NaturalKey::single)
    }
}

/// Membership of a consumer in a consumer-group. The control plane keys
/// memberships by the pair; the id here is derived from it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerGroupMember {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub consumer_group: ForeignKey,
    pub consumer: ForeignKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl ConsumerGroupMember {
    pub fn new(group_id: impl Into<String>, consumer_id: impl Into<String>) -> Self {
        let mut m = Self {
            id: None,
            consumer_group: ForeignKey::by_id(group_id),
            consumer: ForeignKey::by_id(consumer_id),
            created_at: None,
        };
        m.id = m.derived_id();
        m
    }

    /// `<group id>:<consumer id>` once both sides are resolved.
    pub fn derived_id(&self) -> Option<String> {
        match (&self.consumer_group.id, &self.consumer.id) {
            (Some(g), Some(c)) => Some(format!("{g}:{c}")),
            _ => None,
        }
    }
}

impl Entity for ConsumerGroupMember {
    const KIND: EntityKind = EntityKind::ConsumerGroupMember;
    id_untagged!();

    fn natural_key(&self) -> Option<NaturalKey> {
        Some(NaturalKey::new([
            self.consumer_group.id.clone().unwrap_or_default(),
            self.consumer.id.clone().unwrap_or_default(),
        ]))
    }

    fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        if let Some(g) = &self.consumer_group.id {
            out.push(Reference::new(EntityKind::ConsumerGroup, g.clone()));
        }
        if let Some(c) = &self.consumer.id {
            out.push(Reference::new(EntityKind::Consumer, c.clone()));
        }
        out
    }

    fn display_name(&self) -> String {
        format!(
            "{} in {}",
            self.consumer.label(),
            self.consumer_group.label()
        )
    }
}

// ---------------------------------------------------------------------------
// TLS: certificates, SNIs, CA certificates
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certificate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub cert: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_alt: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Entity for Certificate {
    const KIND: EntityKind = EntityKind::Certificate;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        if self.cert.is_empty() {
            return None;
        }
        Some(NaturalKey::new([self.cert.trim(), self.key.trim()]))
    }

    fn display_name(&self) -> String {
        self.id.clone().unwrap_or_else(|| "<certificate>".to_string())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sni {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<ForeignKey>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Entity for Sni {
    const KIND: EntityKind = EntityKind::Sni;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        Some(NaturalKey::single(self.name.clone()))
    }

    fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        push_ref(&mut out, EntityKind::Certificate, &self.certificate);
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaCertificate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub cert: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_digest: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Entity for CaCertificate {
    const KIND: EntityKind = EntityKind::CaCertificate;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        if self.cert.is_empty() {
            return None;
        }
        Some(NaturalKey::single(self.cert.trim()))
    }

    fn display_name(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| "<ca-certificate>".to_string())
    }
}

// ---------------------------------------------------------------------------
// Secrets and key material
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vault {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Vault backend (`env`, `aws`, `hcv`, ...).
    pub name: String,
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub config: ConfigMap,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for Vault {
    const KIND: EntityKind = EntityKind::Vault;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        Some(NaturalKey::single(self.prefix.clone()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for KeySet {
    const KIND: EntityKind = EntityKind::KeySet;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        self.name.clone().map(NaturalKey::single)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Key {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<ForeignKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pem: Option<ConfigMap>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for Key {
    const KIND: EntityKind = EntityKind::Key;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        self.name
            .clone()
            .map(|n| NaturalKey::new([n, fk_id(&self.set)]))
    }

    fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        push_ref(&mut out, EntityKind::KeySet, &self.set);
        out
    }
}

// ---------------------------------------------------------------------------
// Enterprise: licenses and RBAC
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct License {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Entity for License {
    const KIND: EntityKind = EntityKind::License;
    id_untagged!();

    fn natural_key(&self) -> Option<NaturalKey> {
        None
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Entity for RbacRole {
    const KIND: EntityKind = EntityKind::RbacRole;
    id_untagged!();

    fn natural_key(&self) -> Option<NaturalKey> {
        Some(NaturalKey::single(self.name.clone()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacEndpointPermission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ForeignKey>,
    pub workspace: String,
    pub endpoint: String,
    pub actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl RbacEndpointPermission {
    /// `<role id>:<workspace>:<endpoint>` once the role is resolved.
    pub fn derived_id(&self) -> Option<String> {
        let role = self.role.as_ref()?.id.as_ref()?;
        Some(format!("{role}:{}:{}", self.workspace, self.endpoint))
    }
}

impl Entity for RbacEndpointPermission {
    const KIND: EntityKind = EntityKind::RbacEndpointPermission;
    id_untagged!();

    fn natural_key(&self) -> Option<NaturalKey> {
        Some(NaturalKey::new([
            fk_id(&self.role),
            self.workspace.clone(),
            self.endpoint.clone(),
        ]))
    }

    fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        push_ref(&mut out, EntityKind::RbacRole, &self.role);
        out
    }

    fn display_name(&self) -> String {
        format!("{} {}", self.workspace, self.endpoint)
    }
}

// ---------------------------------------------------------------------------
// Custom entities
// ---------------------------------------------------------------------------

/// A user-defined entity kind (e.g. plugin-owned DAO rows). Identified by
/// `(entity_type, fields.name)` when a name is present, else by id. A
/// `service` field holding a reference is resolved like any other
/// foreign key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ForeignKey>,
    pub fields: ConfigMap,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Entity for CustomEntity {
    const KIND: EntityKind = EntityKind::Custom;
    id_and_tags!();

    fn natural_key(&self) -> Option<NaturalKey> {
        let name = self.fields.get("name").and_then(ConfigValue::as_str)?;
        Some(NaturalKey::new([
            name.to_string(),
            self.entity_type.clone(),
            fk_id(&self.service),
        ]))
    }

    fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        push_ref(&mut out, EntityKind::Service, &self.service);
        out
    }

    fn display_name(&self) -> String {
        let name = self
            .natural_key()
            .map(|k| k.head().to_string())
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "<unnamed>".to_string());
        format!("{} {name}", self.entity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_key_includes_resolved_scope() {
        let mut p = Plugin {
            name: "key-auth".into(),
            route: Some(ForeignKey::by_id("r-1")),
            ..Plugin::default()
        };
        let k1 = p.natural_key().unwrap();
        p.route = Some(ForeignKey::by_id("r-2"));
        assert_ne!(k1, p.natural_key().unwrap());
        assert_eq!(k1.to_string(), "key-auth:-:-:r-1:-:-:-");
    }

    #[test]
    fn body_drops_volatile_fields() {
        let svc = Service {
            id: Some("s-1".into()),
            name: Some("svc1".into()),
            host: Some("mockbin.org".into()),
            created_at: Some(1),
            updated_at: Some(2),
            ..Service::default()
        };
        let body = svc.body().unwrap();
        assert!(body.get("id").is_none());
        assert!(body.get("created_at").is_none());
        assert!(body.get("updated_at").is_none());
        assert_eq!(body.get("host").and_then(ConfigValue::as_str), Some("mockbin.org"));
    }

    #[test]
    fn without_timestamps_keeps_identity() {
        let svc = Service {
            id: Some("s-1".into()),
            name: Some("svc1".into()),
            created_at: Some(10),
            ..Service::default()
        };
        let stripped = svc.without_timestamps().unwrap();
        assert_eq!(stripped.id.as_deref(), Some("s-1"));
        assert_eq!(stripped.created_at, None);
    }

    #[test]
    fn consumer_identity_prefers_username() {
        let c = Consumer {
            username: Some("alice".into()),
            custom_id: Some("a-1".into()),
            ..Consumer::default()
        };
        assert_eq!(c.natural_key().unwrap().parts()[1], "alice");
        assert!(c.answers_to("a-1"));

        let anonymous = Consumer::default();
        assert!(anonymous.natural_key().is_none());
    }

    #[test]
    fn membership_id_derives_from_pair() {
        let m = ConsumerGroupMember::new("g", "c");
        assert_eq!(m.id.as_deref(), Some("g:c"));
        assert_eq!(m.references().len(), 2);
    }

    #[test]
    fn partial_type_uses_wire_name() {
        let p: Partial =
            serde_json::from_str(r#"{"name":"redis-shared","type":"redis-ee","config":{}}"#)
                .unwrap();
        assert_eq!(p.partial_type.as_deref(), Some("redis-ee"));
    }
}
