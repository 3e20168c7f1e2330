//! Seam for version-specific normalization (default filling, deprecated
//! field aliasing). Applied to both sides before diffing.

use gws_config::CapabilityFlags;
use gws_state::GatewayState;

pub trait Normalizer: Send + Sync {
    fn normalize(&self, state: GatewayState, caps: &CapabilityFlags) -> GatewayState;
}

/// Leaves states untouched. Inputs are expected to be normalized already.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer;

impl Normalizer for IdentityNormalizer {
    fn normalize(&self, state: GatewayState, _caps: &CapabilityFlags) -> GatewayState {
        state
    }
}
