//! Gateway version parsing and the behavioural flags derived from it.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use gws_schemas::EntityKind;

/// `major.minor.patch` of a control plane. Extra components and build
/// suffixes (`3.4.1.0-enterprise-edition`) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GatewayVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GatewayVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let core = raw
            .trim()
            .trim_start_matches('v')
            .split(['-', '+'])
            .next()
            .unwrap_or("");
        let mut nums = core.split('.');
        let mut next = |what: &str| -> Result<u32> {
            match nums.next() {
                None | Some("") => Ok(0),
                Some(p) => p
                    .parse::<u32>()
                    .with_context(|| format!("gateway version {raw:?}: bad {what} component")),
            }
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        if core.is_empty() {
            bail!("gateway version {raw:?} is empty");
        }
        Ok(Self::new(major, minor, patch))
    }

    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        *self >= Self::new(major, minor, 0)
    }
}

impl fmt::Display for GatewayVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// What the target control plane can accept. The reconciler consults these
/// instead of comparing versions itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub partials: bool,
    pub consumer_group_scoping: bool,
    pub keys: bool,
    pub licenses: bool,
    pub rbac: bool,
}

impl CapabilityFlags {
    /// Unknown target: nothing is refused up front.
    pub const fn all() -> Self {
        Self {
            partials: true,
            consumer_group_scoping: true,
            keys: true,
            licenses: true,
            rbac: true,
        }
    }

    pub fn for_version(v: GatewayVersion, enterprise: bool) -> Self {
        Self {
            partials: v.at_least(3, 10),
            consumer_group_scoping: v.at_least(3, 4),
            keys: v.at_least(3, 1),
            licenses: enterprise,
            rbac: enterprise,
        }
    }

    /// Whether entities of `kind` may be sent at all.
    pub fn supports_kind(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Partial => self.partials,
            EntityKind::Key | EntityKind::KeySet => self.keys,
            EntityKind::License => self.licenses,
            EntityKind::RbacRole | EntityKind::RbacEndpointPermission => self.rbac,
            _ => true,
        }
    }
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enterprise_build_strings() {
        let v = GatewayVersion::parse("3.4.1.0-enterprise-edition").unwrap();
        assert_eq!(v, GatewayVersion::new(3, 4, 1));
        assert_eq!(v.to_string(), "3.4.1");
        assert_eq!(GatewayVersion::parse("3.10").unwrap(), GatewayVersion::new(3, 10, 0));
    }

    #[test]
    fn rejects_garbage() {
        assert!(GatewayVersion::parse("").is_err());
        assert!(GatewayVersion::parse("three.four").is_err());
    }

    #[test]
    fn minor_ten_sorts_after_minor_four() {
        assert!(GatewayVersion::new(3, 10, 0).at_least(3, 4));
        assert!(!GatewayVersion::new(3, 9, 9).at_least(3, 10));
    }
}
