//! Typed view of the merged configuration document.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use gws_schemas::EntityKind;

use crate::version::{CapabilityFlags, GatewayVersion};

pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub sync: SolveSettings,
    pub selection: SelectionSettings,
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveSettings {
    /// Max in-flight control-plane calls per batch.
    pub concurrency: usize,
    pub dry_run: bool,
    pub continue_on_error: bool,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
            continue_on_error: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub select_tags: Vec<String>,
    pub default_lookup_tags: LookupTags,
}

/// Tags that mark "shared" entities another team's document may reference
/// without declaring them. Only kinds that commonly act as shared parents
/// are configurable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupTags {
    pub services: Vec<String>,
    pub routes: Vec<String>,
    pub consumers: Vec<String>,
    pub consumer_groups: Vec<String>,
    pub partials: Vec<String>,
}

impl LookupTags {
    pub fn for_kind(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Service => &self.services,
            EntityKind::Route => &self.routes,
            EntityKind::Consumer => &self.consumers,
            EntityKind::ConsumerGroup => &self.consumer_groups,
            EntityKind::Partial => &self.partials,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
            && self.routes.is_empty()
            && self.consumers.is_empty()
            && self.consumer_groups.is_empty()
            && self.partials.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Reported control-plane version, e.g. `3.4.1.0-enterprise-edition`.
    /// Unset means "assume everything is supported".
    pub version: Option<String>,
    pub enterprise: bool,
}

impl GatewaySettings {
    pub fn parsed_version(&self) -> Result<Option<GatewayVersion>> {
        self.version
            .as_deref()
            .map(GatewayVersion::parse)
            .transpose()
    }

    pub fn capabilities(&self) -> Result<CapabilityFlags> {
        Ok(match self.parsed_version()? {
            Some(v) => CapabilityFlags::for_version(v, self.enterprise),
            None => CapabilityFlags::all(),
        })
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sync.concurrency == 0 {
            bail!("CONFIG_INVALID: sync.concurrency must be at least 1");
        }
        if self.selection.select_tags.iter().any(|t| t.trim().is_empty()) {
            bail!("CONFIG_INVALID: selection.select_tags must not contain empty tags");
        }
        self.gateway.parsed_version()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.sync.concurrency, 10);
        assert!(cfg.sync.continue_on_error);
        assert!(!cfg.sync.dry_run);
        assert!(cfg.selection.default_lookup_tags.is_empty());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut cfg = SyncConfig::default();
        cfg.sync.concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn lookup_tags_per_kind() {
        let tags = LookupTags {
            consumers: vec!["shared".into()],
            ..LookupTags::default()
        };
        assert_eq!(tags.for_kind(EntityKind::Consumer), ["shared".to_string()]);
        assert!(tags.for_kind(EntityKind::Vault).is_empty());
    }

    #[test]
    fn unknown_lookup_kind_is_rejected() {
        let raw = serde_json::json!({"selection": {"default_lookup_tags": {"vaults": ["x"]}}});
        assert!(serde_json::from_value::<SyncConfig>(raw).is_err());
    }
}
