//! Structural checks that need no lookups: run before resolution so a bad
//! document fails without touching identity or references.

use gws_schemas::{Entity, EntityKind};

use crate::error::ReconcileError;
use crate::flatten::Flattened;
use crate::ReconcileOptions;

pub fn validate(flat: &Flattened, opts: &ReconcileOptions) -> Result<(), ReconcileError> {
    check_capabilities(flat, opts)?;
    check_selection(flat, opts)?;
    check_required_fields(flat)?;
    Ok(())
}

fn check_capabilities(flat: &Flattened, opts: &ReconcileOptions) -> Result<(), ReconcileError> {
    let caps = &opts.capabilities;
    for kind in EntityKind::CREATION_ORDER {
        if flat.count(kind) > 0 && !caps.supports_kind(kind) {
            return Err(ReconcileError::Unsupported {
                kind,
                reason: format!("{} {kind} declaration(s) present", flat.count(kind)),
            });
        }
    }

    if !caps.consumer_group_scoping {
        if let Some(p) = flat.plugins.iter().find(|p| p.consumer_group.is_some()) {
            return Err(ReconcileError::Unsupported {
                kind: EntityKind::Plugin,
                reason: format!("{} is scoped to a consumer-group", p.display_name()),
            });
        }
    }

    if !caps.partials {
        if let Some(p) = flat.plugins.iter().find(|p| !p.partials.is_empty()) {
            return Err(ReconcileError::Unsupported {
                kind: EntityKind::Plugin,
                reason: format!("{} links partials", p.display_name()),
            });
        }
    }
    Ok(())
}

/// Kinds without tags cannot be confined to a selection, so a selection
/// run may not declare them.
fn check_selection(flat: &Flattened, opts: &ReconcileOptions) -> Result<(), ReconcileError> {
    if !opts.selection.is_active() {
        return Ok(());
    }
    for kind in [
        EntityKind::License,
        EntityKind::RbacRole,
        EntityKind::RbacEndpointPermission,
    ] {
        if flat.count(kind) > 0 {
            return Err(ReconcileError::Untaggable { kind });
        }
    }
    Ok(())
}

fn check_required_fields(flat: &Flattened) -> Result<(), ReconcileError> {
    for p in &flat.partials {
        if p.partial_type.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(ReconcileError::MissingField {
                kind: EntityKind::Partial,
                name: p.display_name(),
                field: "type",
            });
        }
    }
    for p in &flat.plugins {
        if p.name.trim().is_empty() {
            return Err(ReconcileError::MissingField {
                kind: EntityKind::Plugin,
                name: p.scope_label(),
                field: "name",
            });
        }
    }
    for t in &flat.targets {
        if t.upstream.is_none() {
            return Err(ReconcileError::MissingField {
                kind: EntityKind::Target,
                name: t.display_name(),
                field: "upstream",
            });
        }
    }
    for s in &flat.snis {
        if s.certificate.is_none() {
            return Err(ReconcileError::MissingField {
                kind: EntityKind::Sni,
                name: s.display_name(),
                field: "certificate",
            });
        }
    }
    for p in &flat.rbac_endpoint_permissions {
        if p.role.is_none() {
            return Err(ReconcileError::MissingField {
                kind: EntityKind::RbacEndpointPermission,
                name: p.display_name(),
                field: "role",
            });
        }
    }
    for c in &flat.consumers {
        if c.username.is_none() && c.custom_id.is_none() && c.id.is_none() {
            return Err(ReconcileError::MissingField {
                kind: EntityKind::Consumer,
                name: c.display_name(),
                field: "username or custom_id",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gws_config::{CapabilityFlags, GatewayVersion};
    use gws_schemas::{ForeignKey, License, Partial, Plugin};
    use gws_state::Selection;

    #[test]
    fn partial_without_type_is_rejected() {
        let flat = Flattened {
            partials: vec![Partial {
                name: Some("redis-shared".into()),
                ..Partial::default()
            }],
            ..Flattened::default()
        };
        let err = validate(&flat, &ReconcileOptions::default()).unwrap_err();
        assert!(err.to_string().contains("`type`"), "{err}");
    }

    #[test]
    fn licenses_are_refused_under_select_tags() {
        let flat = Flattened {
            licenses: vec![License::default()],
            ..Flattened::default()
        };
        let opts = ReconcileOptions::new(Selection::new(["team-a"]));
        let err = validate(&flat, &opts).unwrap_err();
        assert!(matches!(err, ReconcileError::Untaggable { kind: EntityKind::License }));
        assert!(validate(&flat, &ReconcileOptions::default()).is_ok());
    }

    #[test]
    fn consumer_group_scope_needs_3_4() {
        let flat = Flattened {
            plugins: vec![Plugin {
                name: "rate-limiting-advanced".into(),
                consumer_group: Some(ForeignKey::by_name("gold")),
                ..Plugin::default()
            }],
            ..Flattened::default()
        };
        let old = ReconcileOptions::default().with_capabilities(CapabilityFlags::for_version(
            GatewayVersion::new(3, 3, 0),
            true,
        ));
        assert!(matches!(
            validate(&flat, &old).unwrap_err(),
            ReconcileError::Unsupported { kind: EntityKind::Plugin, .. }
        ));
    }
}
