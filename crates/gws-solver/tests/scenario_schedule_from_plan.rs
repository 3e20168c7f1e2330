//! Scenario: a plan produced by the reconciler is batched so every parent
//! precedes its children and every delete follows its dependents.
//!
//! GIVEN a document with nested routes, plugins and consumer-group
//! members, WHEN it is planned and scheduled, THEN batches follow creation
//! order and prerequisites point from each child at its parent.

use gws_reconcile::{plan, ReconcileOptions};
use gws_schemas::{Content, EntityKind, Reference};
use gws_solver::{Phase, Schedule};
use gws_state::GatewayState;

const DOC: &str = r#"{
    "services":[{
        "id":"s-1",
        "name":"svc1",
        "routes":[{"id":"r-1","name":"r1","plugins":[{"id":"p-1","name":"key-auth"}]}]
    }],
    "consumers":[{"id":"c-1","username":"alice","groups":[{"name":"gold"}]}],
    "consumer_groups":[{"id":"g-1","name":"gold"}]
}"#;

fn planned() -> gws_reconcile::ChangePlan {
    let content: Content = serde_json::from_str(DOC).unwrap();
    plan(content, &GatewayState::new(), &ReconcileOptions::default()).unwrap()
}

#[test]
fn batches_follow_creation_order() {
    let schedule = Schedule::build(&planned());
    let kinds: Vec<EntityKind> = schedule.batches.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::Service,
            EntityKind::Route,
            EntityKind::Consumer,
            EntityKind::ConsumerGroup,
            EntityKind::ConsumerGroupMember,
            EntityKind::Plugin,
        ]
    );
    assert!(schedule.batches.iter().all(|b| b.phase == Phase::Upsert));
    assert_eq!(schedule.total_ops(), 6);
}

#[test]
fn children_wait_for_their_parents() {
    let schedule = Schedule::build(&planned());

    assert_eq!(
        schedule.prerequisites_of(&Reference::new(EntityKind::Route, "r-1")),
        [Reference::new(EntityKind::Service, "s-1")]
    );
    assert_eq!(
        schedule.prerequisites_of(&Reference::new(EntityKind::Plugin, "p-1")),
        [Reference::new(EntityKind::Route, "r-1")]
    );

    let member = Reference::new(EntityKind::ConsumerGroupMember, "g-1:c-1");
    let mut pre = schedule.prerequisites_of(&member).to_vec();
    pre.sort();
    assert_eq!(
        pre,
        vec![
            Reference::new(EntityKind::Consumer, "c-1"),
            Reference::new(EntityKind::ConsumerGroup, "g-1"),
        ]
    );
}

#[test]
fn tearing_everything_down_reverses_the_order() {
    let content: Content = serde_json::from_str(DOC).unwrap();
    let applied = gws_reconcile::resolve(content, &GatewayState::new(), &ReconcileOptions::default())
        .unwrap();

    let teardown = plan(Content::default(), &applied, &ReconcileOptions::default()).unwrap();
    let schedule = Schedule::build(&teardown);

    let kinds: Vec<EntityKind> = schedule.batches.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::Plugin,
            EntityKind::ConsumerGroupMember,
            EntityKind::ConsumerGroup,
            EntityKind::Consumer,
            EntityKind::Route,
            EntityKind::Service,
        ]
    );
    assert!(schedule.batches.iter().all(|b| b.phase == Phase::Delete));
    assert_eq!(
        schedule.prerequisites_of(&Reference::new(EntityKind::Service, "s-1")),
        [Reference::new(EntityKind::Route, "r-1")]
    );
}
