//! Config hash stability
//!
//! GREEN when:
//! - `load_layered_yaml_from_strings` called twice on the same inputs returns
//!   identical config_hash.
//! - Reordering keys within YAML doesn't change the hash (canonicalization).
//! - Different values produce different hashes.
//! - An overlay changes the hash and the typed view together.

use gws_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
sync:
  concurrency: 8
  continue_on_error: true
selection:
  select_tags: [team-a]
  default_lookup_tags:
    consumers: [shared]
gateway:
  version: "3.4.0"
"#;

/// Same content as BASE_YAML but with keys in different order.
const BASE_YAML_REORDERED: &str = r#"
gateway:
  version: "3.4.0"
selection:
  default_lookup_tags:
    consumers: [shared]
  select_tags: [team-a]
sync:
  continue_on_error: true
  concurrency: 8
"#;

const OVERLAY_YAML: &str = r#"
sync:
  dry_run: true
gateway:
  version: "3.10.0"
"#;

#[test]
fn same_input_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex is 64 chars");
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn different_values_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let changed = BASE_YAML.replace("concurrency: 8", "concurrency: 9");
    let b = load_layered_yaml_from_strings(&[changed.as_str()]).unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_changes_hash_and_typed_view() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let layered = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, layered.config_hash);

    let cfg = layered.sync_config().unwrap();
    assert_eq!(cfg.sync.concurrency, 8, "base value survives the overlay");
    assert!(cfg.sync.dry_run);
    assert_eq!(cfg.gateway.version.as_deref(), Some("3.10.0"));
    assert_eq!(cfg.selection.select_tags, vec!["team-a".to_string()]);
}
