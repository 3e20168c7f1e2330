//! Differ and conflict guard.

use gws_schemas::{AnyEntity, ConfigMap, ConfigValue, EntityKind};
use gws_state::{GatewayState, Selection};
use tracing::debug;

use crate::error::ReconcileError;
use crate::plan::{ChangePlan, Op, PlannedOp};
use crate::value_diff::diff_maps;

/// Classify every desired and every visible current entity.
///
/// `desired` must come out of the resolver: every entity carries its final
/// id, so a desired entity and the current entity it denotes share an id.
/// `current` is the unfiltered control-plane state; the selection view is
/// taken here so the conflict guard can see what the selection hides.
pub fn diff(
    desired: &GatewayState,
    current: &GatewayState,
    selection: &Selection,
) -> Result<ChangePlan, ReconcileError> {
    let visible = current.select(selection);
    let mut plan = ChangePlan::default();

    for kind in EntityKind::CREATION_ORDER {
        for want in desired.entities_of(kind) {
            let id = want.id().unwrap_or_default().to_string();
            let planned = match visible.get_any(kind, &id) {
                Some(have) => classify_match(want, have)?,
                None => {
                    guard_create(current, kind, &id)?;
                    PlannedOp {
                        op: Op::Create,
                        entity: want,
                        previous: None,
                        changes: Vec::new(),
                    }
                }
            };
            debug!(op = %planned.op, entity = %planned.entity.describe(), id = %id, "planned");
            plan.ops.push(planned);
        }

        for have in visible.entities_of(kind) {
            let id = have.id().unwrap_or_default();
            if desired.contains(kind, id) {
                continue;
            }
            debug!(op = %Op::Delete, entity = %have.describe(), id, "planned");
            plan.ops.push(PlannedOp {
                op: Op::Delete,
                entity: have,
                previous: None,
                changes: Vec::new(),
            });
        }
    }

    Ok(plan)
}

fn classify_match(want: AnyEntity, have: AnyEntity) -> Result<PlannedOp, ReconcileError> {
    let changes = diff_maps(&comparable(&have)?, &comparable(&want)?);
    if changes.is_empty() {
        return Ok(PlannedOp {
            op: Op::NoOp,
            entity: want,
            previous: None,
            changes,
        });
    }
    let entity = want.without_timestamps().map_err(|source| encode_error(&want, source))?;
    Ok(PlannedOp {
        op: Op::Update,
        entity,
        previous: Some(have),
        changes,
    })
}

/// A create may not reuse an id held by an entity the selection hides:
/// the call would overwrite (or fail against) another owner's object.
fn guard_create(current: &GatewayState, kind: EntityKind, id: &str) -> Result<(), ReconcileError> {
    if current.contains(kind, id) {
        return Err(ReconcileError::Conflict {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Body used for comparison: volatile fields dropped, tags order-free.
fn comparable(entity: &AnyEntity) -> Result<ConfigMap, ReconcileError> {
    let mut body = entity.body().map_err(|source| encode_error(entity, source))?;
    if let Some(ConfigValue::List(tags)) = body.get_mut("tags") {
        tags.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
    }
    Ok(body)
}

fn encode_error(entity: &AnyEntity, source: serde_json::Error) -> ReconcileError {
    ReconcileError::Encode {
        kind: entity.kind(),
        name: entity.display_name(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gws_schemas::{Route, Service};

    fn svc(id: &str, name: &str, host: &str, tags: &[&str]) -> AnyEntity {
        AnyEntity::from(Service {
            id: Some(id.into()),
            name: Some(name.into()),
            host: Some(host.into()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Service::default()
        })
    }

    fn state(entities: Vec<AnyEntity>) -> GatewayState {
        GatewayState::from_entities(entities).unwrap()
    }

    #[test]
    fn classifies_create_update_delete_noop() {
        let current = state(vec![
            svc("1", "same", "a", &[]),
            svc("2", "changed", "a", &[]),
            svc("3", "gone", "a", &[]),
        ]);
        let desired = state(vec![
            svc("1", "same", "a", &[]),
            svc("2", "changed", "b", &[]),
            svc("4", "new", "a", &[]),
        ]);
        let plan = diff(&desired, &current, &Selection::none()).unwrap();
        let ops: Vec<(Op, &str)> = plan.ops.iter().map(|o| (o.op, o.id())).collect();
        assert_eq!(
            ops,
            vec![
                (Op::NoOp, "1"),
                (Op::Update, "2"),
                (Op::Create, "4"),
                (Op::Delete, "3"),
            ]
        );
        let update = &plan.ops[1];
        assert_eq!(update.changes.len(), 1);
        assert_eq!(update.changes[0].path, "host");
        assert!(update.previous.is_some());
    }

    #[test]
    fn timestamps_and_tag_order_do_not_cause_updates() {
        let mut stored = Service {
            id: Some("1".into()),
            name: Some("svc".into()),
            tags: vec!["b".into(), "a".into()],
            created_at: Some(100),
            updated_at: Some(200),
            ..Service::default()
        };
        let current = state(vec![AnyEntity::from(stored.clone())]);
        stored.created_at = None;
        stored.updated_at = None;
        stored.tags = vec!["a".into(), "b".into()];
        let desired = state(vec![AnyEntity::from(stored)]);
        let plan = diff(&desired, &current, &Selection::none()).unwrap();
        assert!(!plan.has_changes());
    }

    #[test]
    fn entities_outside_selection_are_never_touched() {
        let current = state(vec![svc("1", "mine", "a", &["t"]), svc("2", "theirs", "a", &[])]);
        let desired = state(vec![]);
        let plan = diff(&desired, &current, &Selection::new(["t"])).unwrap();
        assert_eq!(plan.ops.len(), 1);
        assert_eq!(plan.ops[0].op, Op::Delete);
        assert_eq!(plan.ops[0].id(), "1");
    }

    #[test]
    fn create_reusing_hidden_id_is_a_conflict() {
        let current = state(vec![svc("taken", "theirs", "a", &["other-team"])]);
        let desired = state(vec![svc("taken", "mine", "a", &["t"])]);
        let err = diff(&desired, &current, &Selection::new(["t"])).unwrap_err();
        assert!(matches!(err, ReconcileError::Conflict { .. }));
        assert!(err.to_string().contains("entity with ID taken already exists"));
    }

    #[test]
    fn kinds_follow_creation_order() {
        let current = GatewayState::new();
        let desired = state(vec![
            AnyEntity::from(Route {
                id: Some("r".into()),
                name: Some("r1".into()),
                ..Route::default()
            }),
            svc("s", "svc1", "a", &[]),
        ]);
        let plan = diff(&desired, &current, &Selection::none()).unwrap();
        let kinds: Vec<EntityKind> = plan.ops.iter().map(|o| o.kind()).collect();
        assert_eq!(kinds, vec![EntityKind::Service, EntityKind::Route]);
    }
}
