//! Nested declarations to flat per-kind lists.
//!
//! Every nested child gets its parent foreign key filled in from the
//! enclosing object. A child that also declares that same scope field must
//! point at the enclosing parent with a bare reference; anything else is a
//! validation error.

use gws_schemas::*;
use uuid::Uuid;

use crate::error::ReconcileError;

/// Flat, still unresolved declarations, one list per kind.
#[derive(Clone, Debug, Default)]
pub struct Flattened {
    pub services: Vec<Service>,
    pub routes: Vec<Route>,
    pub plugins: Vec<Plugin>,
    pub consumers: Vec<Consumer>,
    pub consumer_groups: Vec<ConsumerGroup>,
    pub consumer_group_members: Vec<ConsumerGroupMember>,
    pub upstreams: Vec<Upstream>,
    pub targets: Vec<Target>,
    pub certificates: Vec<Certificate>,
    pub snis: Vec<Sni>,
    pub ca_certificates: Vec<CaCertificate>,
    pub vaults: Vec<Vault>,
    pub keys: Vec<Key>,
    pub key_sets: Vec<KeySet>,
    pub partials: Vec<Partial>,
    pub licenses: Vec<License>,
    pub rbac_roles: Vec<RbacRole>,
    pub rbac_endpoint_permissions: Vec<RbacEndpointPermission>,
    pub custom_entities: Vec<CustomEntity>,
}

impl Flattened {
    /// Number of declarations of `kind`.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Service => self.services.len(),
            EntityKind::Route => self.routes.len(),
            EntityKind::Plugin => self.plugins.len(),
            EntityKind::Consumer => self.consumers.len(),
            EntityKind::ConsumerGroup => self.consumer_groups.len(),
            EntityKind::ConsumerGroupMember => self.consumer_group_members.len(),
            EntityKind::Upstream => self.upstreams.len(),
            EntityKind::Target => self.targets.len(),
            EntityKind::Certificate => self.certificates.len(),
            EntityKind::Sni => self.snis.len(),
            EntityKind::CaCertificate => self.ca_certificates.len(),
            EntityKind::Vault => self.vaults.len(),
            EntityKind::Key => self.keys.len(),
            EntityKind::KeySet => self.key_sets.len(),
            EntityKind::Partial => self.partials.len(),
            EntityKind::License => self.licenses.len(),
            EntityKind::RbacRole => self.rbac_roles.len(),
            EntityKind::RbacEndpointPermission => self.rbac_endpoint_permissions.len(),
            EntityKind::Custom => self.custom_entities.len(),
        }
    }
}

/// The enclosing object of a nested child.
struct Parent {
    kind: EntityKind,
    id: String,
    names: Vec<String>,
}

impl Parent {
    /// Ensures `entity` has an id so children can point at it before
    /// identity resolution; a later stored-id adoption is remapped.
    fn of<T: Entity>(entity: &mut T, names: Vec<String>) -> Self {
        let id = match entity.id() {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                entity.set_id(id.clone());
                id
            }
        };
        Self {
            kind: T::KIND,
            id,
            names,
        }
    }

    fn label(&self) -> String {
        self.names.first().cloned().unwrap_or_else(|| self.id.clone())
    }

    fn is_same(&self, fk: &ForeignKey) -> bool {
        match (&fk.id, &fk.name) {
            (Some(id), _) => *id == self.id,
            (None, Some(name)) => self.names.contains(name),
            (None, None) => true,
        }
    }

    fn reference(&self) -> ForeignKey {
        ForeignKey::by_id(self.id.clone())
    }

    /// Fill the child's scope slot for this parent.
    fn attach(&self, owner: String, slot: &mut Option<ForeignKey>) -> Result<(), ReconcileError> {
        if let Some(fk) = slot.as_ref() {
            if !fk.is_bare() {
                return Err(ReconcileError::NestedParent {
                    owner,
                    parent_kind: self.kind,
                    parent: fk.label(),
                });
            }
            if !self.is_same(fk) {
                return Err(ReconcileError::MutuallyExclusiveScope {
                    owner,
                    parent_kind: self.kind,
                    parent: self.label(),
                    declared: fk.label(),
                });
            }
        }
        *slot = Some(self.reference());
        Ok(())
    }
}

pub(crate) fn owner<T: Entity>(entity: &T) -> String {
    format!("{} {}", T::KIND, entity.display_name())
}

fn named(name: &Option<String>) -> Vec<String> {
    name.iter().cloned().collect()
}

/// Group member lists name consumers by `username` or `custom_id`.
fn consumer_ref(mut fk: ForeignKey) -> ForeignKey {
    if fk.name.is_some() || fk.inline.len() != 1 {
        return fk;
    }
    for field in ["username", "custom_id"] {
        let alias = fk.inline.get(field).and_then(ConfigValue::as_str).map(str::to_string);
        if let Some(alias) = alias {
            fk.inline.remove(field);
            fk.name = Some(alias);
            break;
        }
    }
    fk
}

fn nested_plugins(
    out: &mut Vec<Plugin>,
    plugins: Vec<Plugin>,
    parent: &Parent,
) -> Result<(), ReconcileError> {
    for mut plugin in plugins {
        let who = owner(&plugin);
        let slot = match parent.kind {
            EntityKind::Service => &mut plugin.service,
            EntityKind::Route => &mut plugin.route,
            EntityKind::Consumer => &mut plugin.consumer,
            _ => &mut plugin.consumer_group,
        };
        parent.attach(who, slot)?;
        out.push(plugin);
    }
    Ok(())
}

fn route_decl(
    out: &mut Flattened,
    decl: RouteDecl,
    service: Option<&Parent>,
) -> Result<(), ReconcileError> {
    let RouteDecl { mut route, plugins } = decl;
    if let Some(svc) = service {
        svc.attach(owner(&route), &mut route.service)?;
    }
    if !plugins.is_empty() {
        let names = named(&route.name);
        let parent = Parent::of(&mut route, names);
        nested_plugins(&mut out.plugins, plugins, &parent)?;
    }
    out.routes.push(route);
    Ok(())
}

/// Flatten one declarative document.
pub fn flatten(content: Content) -> Result<Flattened, ReconcileError> {
    let mut out = Flattened::default();

    for decl in content.services {
        let ServiceDecl {
            mut service,
            routes,
            plugins,
        } = decl;
        if routes.is_empty() && plugins.is_empty() {
            out.services.push(service);
            continue;
        }
        let names = named(&service.name);
        let parent = Parent::of(&mut service, names);
        for r in routes {
            route_decl(&mut out, r, Some(&parent))?;
        }
        nested_plugins(&mut out.plugins, plugins, &parent)?;
        out.services.push(service);
    }

    for r in content.routes {
        route_decl(&mut out, r, None)?;
    }

    for decl in content.consumers {
        let ConsumerDecl {
            mut consumer,
            plugins,
            groups,
        } = decl;
        if !plugins.is_empty() || !groups.is_empty() {
            let names = consumer
                .username
                .iter()
                .chain(consumer.custom_id.iter())
                .cloned()
                .collect();
            let parent = Parent::of(&mut consumer, names);
            nested_plugins(&mut out.plugins, plugins, &parent)?;
            for group in groups {
                out.consumer_group_members.push(ConsumerGroupMember {
                    id: None,
                    consumer_group: group,
                    consumer: parent.reference(),
                    created_at: None,
                });
            }
        }
        out.consumers.push(consumer);
    }

    for decl in content.consumer_groups {
        let ConsumerGroupDecl {
            mut consumer_group,
            consumers,
            plugins,
        } = decl;
        if !plugins.is_empty() || !consumers.is_empty() {
            let names = named(&consumer_group.name);
            let parent = Parent::of(&mut consumer_group, names);
            nested_plugins(&mut out.plugins, plugins, &parent)?;
            for consumer in consumers {
                out.consumer_group_members.push(ConsumerGroupMember {
                    id: None,
                    consumer_group: parent.reference(),
                    consumer: consumer_ref(consumer),
                    created_at: None,
                });
            }
        }
        out.consumer_groups.push(consumer_group);
    }

    for decl in content.upstreams {
        let UpstreamDecl {
            mut upstream,
            targets,
        } = decl;
        if !targets.is_empty() {
            let names = named(&upstream.name);
            let parent = Parent::of(&mut upstream, names);
            for mut t in targets {
                parent.attach(owner(&t), &mut t.upstream)?;
                out.targets.push(t);
            }
        }
        out.upstreams.push(upstream);
    }

    for decl in content.certificates {
        let CertificateDecl {
            mut certificate,
            snis,
        } = decl;
        if !snis.is_empty() {
            let parent = Parent::of(&mut certificate, Vec::new());
            for mut sni in snis {
                parent.attach(owner(&sni), &mut sni.certificate)?;
                out.snis.push(sni);
            }
        }
        out.certificates.push(certificate);
    }

    for decl in content.key_sets {
        let KeySetDecl { mut key_set, keys } = decl;
        if !keys.is_empty() {
            let names = named(&key_set.name);
            let parent = Parent::of(&mut key_set, names);
            for mut key in keys {
                parent.attach(owner(&key), &mut key.set)?;
                out.keys.push(key);
            }
        }
        out.key_sets.push(key_set);
    }

    for decl in content.rbac_roles {
        let RbacRoleDecl {
            mut role,
            endpoint_permissions,
        } = decl;
        if !endpoint_permissions.is_empty() {
            let names = vec![role.name.clone()];
            let parent = Parent::of(&mut role, names);
            for mut perm in endpoint_permissions {
                parent.attach(owner(&perm), &mut perm.role)?;
                out.rbac_endpoint_permissions.push(perm);
            }
        }
        out.rbac_roles.push(role);
    }

    out.plugins.extend(content.plugins);
    out.targets.extend(content.targets);
    out.snis.extend(content.snis);
    out.ca_certificates.extend(content.ca_certificates);
    out.vaults.extend(content.vaults);
    out.keys.extend(content.keys);
    out.partials.extend(content.partials);
    out.licenses.extend(content.licenses);
    out.rbac_endpoint_permissions
        .extend(content.rbac_endpoint_permissions);
    out.custom_entities.extend(content.custom_entities);

    Ok(out)
}
