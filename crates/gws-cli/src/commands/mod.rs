//! Command handler modules for gws.
//!
//! Input loading shared by every planning command lives here.

pub mod plan;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use tracing::warn;

use gws_config::{report_unused_keys, ConfigMode, SyncConfig, UnusedKeyPolicy};
use gws_reconcile::ReconcileOptions;
use gws_schemas::Content;
use gws_state::GatewayState;

/// Everything a planning command needs, loaded and checked.
pub struct Inputs {
    pub content: Content,
    pub current: GatewayState,
    pub config: SyncConfig,
    pub reconcile: ReconcileOptions,
}

impl Inputs {
    pub fn load(
        mode: ConfigMode,
        desired_paths: &[String],
        current_path: Option<&str>,
        config_paths: &[String],
        strict_config: bool,
    ) -> Result<Self> {
        let config = load_config(mode, config_paths, strict_config)?;
        let capabilities = config
            .gateway
            .capabilities()
            .context("gateway.version")?;
        let reconcile = ReconcileOptions::from_config(&config, capabilities);

        let mut docs = Vec::with_capacity(desired_paths.len());
        for p in desired_paths {
            docs.push(read_json::<Content>(p)?);
        }
        let content = Content::merge(docs);

        let current = match current_path {
            Some(p) => read_json::<GatewayState>(p)?,
            None => GatewayState::new(),
        };

        Ok(Self {
            content,
            current,
            config,
            reconcile,
        })
    }
}

/// Layered settings, or defaults when no config path is given.
fn load_config(mode: ConfigMode, paths: &[String], strict: bool) -> Result<SyncConfig> {
    if paths.is_empty() {
        return Ok(SyncConfig::default());
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = gws_config::load_layered_yaml(&path_refs)?;

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(mode, &loaded.config_json, policy)?;
    if !report.is_clean() {
        warn!(
            mode = mode.as_str(),
            unused = report.unused_leaf_pointers.len(),
            "CONFIG_UNUSED_KEYS"
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            eprintln!("  unused={}", p);
        }
    }

    loaded.sync_config()
}

/// Read a JSON file; a UTF-8 BOM is tolerated.
fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {path} failed"))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    serde_json::from_slice(bytes).with_context(|| format!("{path} must contain valid JSON"))
}
