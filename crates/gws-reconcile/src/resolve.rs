//! Foreign-key resolution and id assignment.
//!
//! Kinds are resolved in creation order so every parent has its final id
//! before any child looks it up. Each entity first gets its references
//! rewritten to bare ids, then goes through identity resolution (which may
//! need those ids for its natural key), then lands in the desired state.

use gws_schemas::*;
use gws_state::{Collection, GatewayState, Stored};
use tracing::debug;

use crate::error::ReconcileError;
use crate::flatten::{owner, Flattened};
use crate::identity::{settle, IdRemap, Referable};
use crate::ReconcileOptions;

pub struct Resolver<'a> {
    opts: &'a ReconcileOptions,
    /// Unfiltered current state; lookup-tagged entities live here.
    current: &'a GatewayState,
    /// Current state as the selection sees it; identity matches only here.
    visible: GatewayState,
    desired: GatewayState,
    remap: IdRemap,
}

impl<'a> Resolver<'a> {
    pub fn new(current: &'a GatewayState, opts: &'a ReconcileOptions) -> Self {
        Self {
            opts,
            current,
            visible: current.select(&opts.selection),
            desired: GatewayState::new(),
            remap: IdRemap::default(),
        }
    }

    pub fn resolve(mut self, flat: Flattened) -> Result<GatewayState, ReconcileError> {
        let Flattened {
            services,
            routes,
            plugins,
            consumers,
            consumer_groups,
            consumer_group_members,
            upstreams,
            targets,
            certificates,
            snis,
            ca_certificates,
            vaults,
            keys,
            key_sets,
            partials,
            licenses,
            rbac_roles,
            rbac_endpoint_permissions,
            custom_entities,
        } = flat;

        for v in vaults {
            self.admit(v)?;
        }
        for ca in ca_certificates {
            self.admit(ca)?;
        }
        for c in certificates {
            self.admit(c)?;
        }
        for mut sni in snis {
            let who = owner(&sni);
            self.optional::<Certificate>(&who, &mut sni.certificate)?;
            self.admit(sni)?;
        }
        for ks in key_sets {
            self.admit(ks)?;
        }
        for mut key in keys {
            let who = owner(&key);
            self.optional::<KeySet>(&who, &mut key.set)?;
            self.admit(key)?;
        }
        for l in licenses {
            self.admit(l)?;
        }
        for p in partials {
            self.admit(p)?;
        }
        for r in rbac_roles {
            self.admit(r)?;
        }
        for mut perm in rbac_endpoint_permissions {
            let who = owner(&perm);
            self.optional::<RbacRole>(&who, &mut perm.role)?;
            if perm.id.is_none() {
                perm.id = perm.derived_id();
            }
            self.admit(perm)?;
        }
        for u in upstreams {
            self.admit(u)?;
        }
        for mut t in targets {
            let who = owner(&t);
            self.optional::<Upstream>(&who, &mut t.upstream)?;
            self.admit(t)?;
        }
        for mut svc in services {
            let who = owner(&svc);
            self.optional::<Certificate>(&who, &mut svc.client_certificate)?;
            for ca in &mut svc.ca_certificates {
                *ca = self.reference_id::<CaCertificate>(&who, &ForeignKey::by_id(ca.as_str()))?;
            }
            self.admit(svc)?;
        }
        for mut route in routes {
            let who = owner(&route);
            self.optional::<Service>(&who, &mut route.service)?;
            self.admit(route)?;
        }
        for c in consumers {
            self.admit(c)?;
        }
        for g in consumer_groups {
            self.admit(g)?;
        }
        for m in consumer_group_members {
            self.membership(m)?;
        }
        for p in plugins {
            self.plugin(p)?;
        }
        for mut ce in custom_entities {
            let who = owner(&ce);
            self.optional::<Service>(&who, &mut ce.service)?;
            self.admit(ce)?;
        }

        debug!(
            entities = self.desired.total(),
            remapped = self.remap.len(),
            "desired state resolved"
        );
        Ok(self.desired)
    }

    // ---------------------------------------------------------------------
    // Kind-specific steps
    // ---------------------------------------------------------------------

    fn membership(&mut self, mut m: ConsumerGroupMember) -> Result<(), ReconcileError> {
        let who = owner(&m);
        m.consumer_group = self.reference::<ConsumerGroup>(&who, &m.consumer_group)?;
        m.consumer = self.reference::<Consumer>(&who, &m.consumer)?;
        m.id = m.derived_id();

        // Declared from both sides (consumer lists the group, group lists
        // the consumer): one membership.
        if let Some(key) = m.natural_key() {
            if self.desired.consumer_group_members.get_by_key(&key).is_some() {
                debug!(membership = %m.display_name(), "membership declared twice, merged");
                return Ok(());
            }
        }
        self.admit(m)
    }

    fn plugin(&mut self, mut p: Plugin) -> Result<(), ReconcileError> {
        let who = owner(&p);
        self.optional::<Service>(&who, &mut p.service)?;
        self.optional::<Route>(&who, &mut p.route)?;
        self.optional::<Consumer>(&who, &mut p.consumer)?;
        self.optional::<ConsumerGroup>(&who, &mut p.consumer_group)?;

        for link in &mut p.partials {
            let fk = ForeignKey {
                id: link.id.clone(),
                name: link.name.clone(),
                ..ForeignKey::default()
            };
            link.id = self.reference::<Partial>(&who, &fk)?.id;
            link.name = None;
        }

        if p.consumer_group.is_some() {
            self.opts.selection.apply_to(&mut p);
            if let Some(key) = p.natural_key() {
                if let Some(first) = self.desired.plugins.get_by_key(&key) {
                    if encoded_body(first)? == encoded_body(&p)? {
                        debug!(plugin = %p.display_name(), "identical consumer-group plugin merged");
                        return Ok(());
                    }
                    return Err(ReconcileError::Duplicate {
                        kind: EntityKind::Plugin,
                        key: key.to_string(),
                        detail: format!(
                            "{} is declared more than once with different configuration",
                            p.display_name()
                        ),
                    });
                }
            }
        }

        self.admit(p)
    }

    // ---------------------------------------------------------------------
    // Shared steps
    // ---------------------------------------------------------------------

    /// Tag, identify and store one fully referenced entity.
    fn admit<T: Stored>(&mut self, mut entity: T) -> Result<(), ReconcileError> {
        self.opts.selection.apply_to(&mut entity);

        if let Some(key) = entity.natural_key() {
            if self.desired.of::<T>().get_by_key(&key).is_some() {
                return Err(ReconcileError::Duplicate {
                    kind: T::KIND,
                    key: key.to_string(),
                    detail: format!("{} is declared more than once", entity.display_name()),
                });
            }
        }

        // A declared id held outside the selection is never matched by key.
        if let Some(id) = entity.id() {
            if self.current.of::<T>().contains(id) && !self.visible.of::<T>().contains(id) {
                return Err(ReconcileError::Conflict {
                    kind: T::KIND,
                    id: id.to_string(),
                });
            }
        }

        settle(&mut entity, self.visible.of::<T>(), &mut self.remap);
        self.desired.of_mut::<T>().insert(entity)?;
        Ok(())
    }

    fn optional<T: Referable + Stored>(
        &self,
        owner: &str,
        slot: &mut Option<ForeignKey>,
    ) -> Result<(), ReconcileError> {
        if let Some(fk) = slot.as_mut() {
            let resolved = self.reference::<T>(owner, fk)?;
            *fk = resolved;
        }
        Ok(())
    }

    fn reference<T: Referable + Stored>(
        &self,
        owner: &str,
        fk: &ForeignKey,
    ) -> Result<ForeignKey, ReconcileError> {
        self.reference_id::<T>(owner, fk).map(ForeignKey::by_id)
    }

    fn reference_id<T: Referable + Stored>(
        &self,
        owner: &str,
        fk: &ForeignKey,
    ) -> Result<String, ReconcileError> {
        lookup(
            owner,
            fk,
            self.desired.of::<T>(),
            self.current.of::<T>(),
            self.opts.lookup_tags.for_kind(T::KIND),
            &self.remap,
        )
    }
}

fn encoded_body<T: Entity>(entity: &T) -> Result<ConfigMap, ReconcileError> {
    entity.body().map_err(|source| ReconcileError::Encode {
        kind: T::KIND,
        name: entity.display_name(),
        source,
    })
}

/// Resolve one reference to a canonical id.
///
/// Ids and names are looked up among desired entities first, then among
/// current entities carrying one of the kind's default lookup tags. A
/// reference naming neither is only legal with lookup tags configured and
/// must then hit exactly one tagged entity.
fn lookup<T: Referable>(
    owner: &str,
    fk: &ForeignKey,
    desired: &Collection<T>,
    current: &Collection<T>,
    lookup_tags: &[String],
    remap: &IdRemap,
) -> Result<String, ReconcileError> {
    if !fk.is_bare() {
        return Err(ReconcileError::NestedParent {
            owner: owner.to_string(),
            parent_kind: T::KIND,
            parent: fk.label(),
        });
    }

    let shared = |e: &T| !lookup_tags.is_empty() && e.has_any_tag(lookup_tags);

    if let Some(declared) = fk.id.as_deref() {
        let id = remap.resolve(T::KIND, declared);
        if desired.contains(id) || current.get(id).map(|e| shared(e)).unwrap_or(false) {
            return Ok(id.to_string());
        }
        return Err(not_found(owner, T::KIND, declared));
    }

    if let Some(name) = fk.name.as_deref() {
        let mut hits = desired.find(|e| e.answers_to_name(name));
        if hits.is_empty() {
            hits = current.find(|e| shared(e) && e.answers_to_name(name));
        }
        return exactly_one(owner, T::KIND, name, hits);
    }

    if lookup_tags.is_empty() {
        return Err(not_found(owner, T::KIND, "<unqualified reference>"));
    }
    let label = format!("tagged {}", lookup_tags.join(","));
    exactly_one(owner, T::KIND, &label, current.find(|e| shared(e)))
}

fn exactly_one<T: Entity>(
    owner: &str,
    kind: EntityKind,
    reference: &str,
    hits: Vec<&T>,
) -> Result<String, ReconcileError> {
    match hits.as_slice() {
        [one] => one
            .id()
            .map(str::to_string)
            .ok_or_else(|| not_found(owner, kind, reference)),
        [] => Err(not_found(owner, kind, reference)),
        many => Err(ReconcileError::Ambiguous {
            owner: owner.to_string(),
            kind,
            reference: reference.to_string(),
            matches: many.len(),
        }),
    }
}

fn not_found(owner: &str, kind: EntityKind, reference: &str) -> ReconcileError {
    ReconcileError::NotFound {
        owner: owner.to_string(),
        kind,
        reference: reference.to_string(),
    }
}
