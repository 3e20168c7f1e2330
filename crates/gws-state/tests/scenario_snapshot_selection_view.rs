//! Scenario: a stored gateway snapshot is reloaded and narrowed to one
//! team's selection view.
//!
//! GIVEN a snapshot shared by two teams, WHEN it is loaded and selected by
//! tag, THEN only the team's own entities (and memberships of its own
//! consumer-groups) remain visible, while the full state is untouched.

use gws_schemas::EntityKind;
use gws_state::{GatewayState, Selection, StateError};

const SNAPSHOT: &str = r#"[
    {"kind":"service","entity":{"id":"s-a","name":"svc-a","tags":["team-a"]}},
    {"kind":"service","entity":{"id":"s-b","name":"svc-b","tags":["team-b"]}},
    {"kind":"consumer","entity":{"id":"c-1","username":"alice","tags":["team-a"]}},
    {"kind":"consumer_group","entity":{"id":"g-a","name":"gold","tags":["team-a"]}},
    {"kind":"consumer_group","entity":{"id":"g-b","name":"silver","tags":["team-b"]}},
    {"kind":"consumer_group_member","entity":{"id":"g-a:c-1","consumer_group":{"id":"g-a"},"consumer":{"id":"c-1"}}},
    {"kind":"consumer_group_member","entity":{"id":"g-b:c-1","consumer_group":{"id":"g-b"},"consumer":{"id":"c-1"}}},
    {"kind":"license","entity":{"id":"l-1","payload":"{}"}}
]"#;

#[test]
fn team_view_hides_foreign_and_untaggable_entities() {
    let full: GatewayState = serde_json::from_str(SNAPSHOT).unwrap();
    assert_eq!(full.total(), 8);

    let view = full.select(&Selection::new(["team-a"]));

    assert!(view.services.contains("s-a"));
    assert!(!view.services.contains("s-b"));
    assert_eq!(view.count(EntityKind::ConsumerGroup), 1);
    assert!(view.consumer_group_members.contains("g-a:c-1"));
    assert!(!view.consumer_group_members.contains("g-b:c-1"));
    assert_eq!(view.count(EntityKind::License), 0);

    // the source state is not narrowed
    assert_eq!(full.total(), 8);
}

#[test]
fn inactive_selection_sees_everything() {
    let full: GatewayState = serde_json::from_str(SNAPSHOT).unwrap();
    assert_eq!(full.select(&Selection::none()), full);
}

#[test]
fn snapshot_with_duplicate_id_is_refused() {
    let raw = r#"[
        {"kind":"service","entity":{"id":"s-1","name":"a"}},
        {"kind":"service","entity":{"id":"s-1","name":"b"}}
    ]"#;
    let err = serde_json::from_str::<GatewayState>(raw).unwrap_err();
    assert!(err.to_string().contains("s-1"), "{err}");

    let direct = GatewayState::from_entities(
        serde_json::from_str::<Vec<gws_schemas::AnyEntity>>(raw).unwrap(),
    )
    .unwrap_err();
    assert!(matches!(direct, StateError::DuplicateId { .. }));
}
