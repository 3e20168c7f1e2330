//! Capability flags derived from the configured gateway version.
//!
//! GIVEN a `gateway` section, WHEN the typed config is built, THEN the
//! flags gate exactly the kinds that target cannot accept.

use gws_config::{load_layered_yaml_from_strings, CapabilityFlags};
use gws_schemas::EntityKind;

fn flags(yaml: &str) -> CapabilityFlags {
    load_layered_yaml_from_strings(&[yaml])
        .unwrap()
        .sync_config()
        .unwrap()
        .gateway
        .capabilities()
        .unwrap()
}

#[test]
fn unset_version_supports_everything() {
    let f = flags("sync:\n  concurrency: 1\n");
    assert_eq!(f, CapabilityFlags::all());
}

#[test]
fn old_open_source_gateway_refuses_newer_kinds() {
    let f = flags("gateway:\n  version: \"3.0.2\"\n");
    assert!(!f.supports_kind(EntityKind::Partial));
    assert!(!f.supports_kind(EntityKind::Key));
    assert!(!f.supports_kind(EntityKind::License));
    assert!(!f.consumer_group_scoping);
    assert!(f.supports_kind(EntityKind::Service));
}

#[test]
fn enterprise_3_10_supports_everything() {
    let f = flags("gateway:\n  version: \"3.10.0.1-enterprise-edition\"\n  enterprise: true\n");
    assert_eq!(f, CapabilityFlags::all());
}

#[test]
fn invalid_version_fails_config_validation() {
    let loaded = load_layered_yaml_from_strings(&["gateway:\n  version: \"x.y\"\n"]).unwrap();
    assert!(loaded.sync_config().is_err());
}
