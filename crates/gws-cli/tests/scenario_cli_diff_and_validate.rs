//! Scenario: `gws diff`, `gws validate` and `gws config-hash` against JSON
//! snapshots on disk.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

const DESIRED: &str = r#"{
    "services":[{"name":"svc1","host":"mockbin.org","routes":[{"name":"r1","paths":["/r1"]}]}]
}"#;

const CURRENT: &str = r#"[
    {"kind":"service","entity":{"id":"s-1","name":"svc1","host":"old.example"}},
    {"kind":"service","entity":{"id":"s-2","name":"legacy","host":"legacy.example"}}
]"#;

fn write(dir: &TempDir, name: &str, body: &str) -> anyhow::Result<PathBuf> {
    let p = dir.path().join(name);
    fs::write(&p, body)?;
    Ok(p)
}

fn gws() -> anyhow::Result<Command> {
    Ok(Command::cargo_bin("gws-cli")?)
}

#[test]
fn diff_against_empty_gateway_lists_creates() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let desired = write(&dir, "desired.json", DESIRED)?;

    gws()?
        .arg("diff")
        .arg("--desired")
        .arg(&desired)
        .assert()
        .success()
        .stdout(predicate::str::contains("creating service svc1"))
        .stdout(predicate::str::contains("creating route r1"))
        .stdout(predicate::str::contains(
            "Summary: Created: 2, Updated: 0, Deleted: 0, Unchanged: 0",
        ));
    Ok(())
}

#[test]
fn diff_against_snapshot_shows_update_and_delete() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let desired = write(&dir, "desired.json", DESIRED)?;
    let current = write(&dir, "current.json", CURRENT)?;

    gws()?
        .arg("diff")
        .arg("--desired")
        .arg(&desired)
        .arg("--current")
        .arg(&current)
        .assert()
        .success()
        .stdout(predicate::str::contains("updating service svc1"))
        .stdout(predicate::str::contains(r#"host: "old.example" -> "mockbin.org""#))
        .stdout(predicate::str::contains("deleting service legacy"));
    Ok(())
}

#[test]
fn diff_exit_code_flags_pending_changes() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let desired = write(&dir, "desired.json", DESIRED)?;

    gws()?
        .arg("diff")
        .arg("--desired")
        .arg(&desired)
        .arg("--exit-code")
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn nested_route_under_plugin_is_rejected() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let desired = write(
        &dir,
        "desired.json",
        r#"{"plugins":[{"name":"X","route":{"name":"r","paths":["/r"]}}]}"#,
    )?;

    gws()?
        .arg("validate")
        .arg("--desired")
        .arg(&desired)
        .assert()
        .failure()
        .stderr(predicate::str::contains("plugin X"));
    Ok(())
}

#[test]
fn validate_reports_entity_count() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let desired = write(&dir, "desired.json", DESIRED)?;

    gws()?
        .arg("validate")
        .arg("--desired")
        .arg(&desired)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid=true entities=2"));
    Ok(())
}

#[test]
fn strict_config_refuses_unknown_keys() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let desired = write(&dir, "desired.json", DESIRED)?;
    let cfg = write(&dir, "gws.yaml", "sync:\n  concurrency: 4\n  retries: 3\n")?;

    gws()?
        .arg("diff")
        .arg("--desired")
        .arg(&desired)
        .arg("--config")
        .arg(&cfg)
        .arg("--strict-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));
    Ok(())
}

#[test]
fn config_hash_is_printed() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let base = write(&dir, "base.yaml", "sync:\n  concurrency: 4\n")?;
    let team = write(&dir, "team.yaml", "selection:\n  select_tags: [team-a]\n")?;

    gws()?
        .arg("config-hash")
        .arg(&base)
        .arg(&team)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("config_hash="))
        .stdout(predicate::str::contains("team-a"));
    Ok(())
}
