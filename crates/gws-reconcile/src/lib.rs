//! gws-reconcile
//!
//! Desired content + current state -> validated change plan.
//!
//! Pipeline:
//! 1) flatten nested declarations (nesting rules enforced here)
//! 2) structural validation (capabilities, selection, required fields)
//! 3) foreign-key resolution and identity resolution, kind by kind in
//!    creation order
//! 4) diff against the selection view, with the conflict guard
//!
//! Any failure is a single [`ReconcileError`] and no plan is produced.

use tracing::info;

use gws_config::{CapabilityFlags, LookupTags, SyncConfig};
use gws_schemas::Content;
use gws_state::{GatewayState, Selection};

mod diff;
mod error;
mod flatten;
mod identity;
mod normalize;
mod plan;
mod resolve;
mod validate;
mod value_diff;

pub use diff::diff;
pub use error::ReconcileError;
pub use flatten::{flatten, Flattened};
pub use identity::{find_match, IdRemap, Referable};
pub use normalize::{IdentityNormalizer, Normalizer};
pub use plan::{ChangePlan, Op, PlanSummary, PlannedOp};
pub use resolve::Resolver;
pub use validate::validate;
pub use value_diff::{diff_maps, FieldChange};

/// Per-invocation inputs besides the two states.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub selection: Selection,
    pub lookup_tags: LookupTags,
    pub capabilities: CapabilityFlags,
}

impl ReconcileOptions {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            ..Self::default()
        }
    }

    pub fn with_lookup_tags(mut self, lookup_tags: LookupTags) -> Self {
        self.lookup_tags = lookup_tags;
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityFlags) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Selection and lookup tags from config. Capabilities come from
    /// `cfg.gateway.capabilities()`, which the caller must check.
    pub fn from_config(cfg: &SyncConfig, capabilities: CapabilityFlags) -> Self {
        Self {
            selection: Selection::new(cfg.selection.select_tags.iter().cloned()),
            lookup_tags: cfg.selection.default_lookup_tags.clone(),
            capabilities,
        }
    }
}

/// Flatten, validate and resolve `content` into a desired state with final
/// ids. `current` is the unfiltered control-plane state.
pub fn resolve(
    content: Content,
    current: &GatewayState,
    opts: &ReconcileOptions,
) -> Result<GatewayState, ReconcileError> {
    let flat = flatten(content)?;
    validate(&flat, opts)?;
    Resolver::new(current, opts).resolve(flat)
}

/// Full planning pass with the identity normalizer.
pub fn plan(
    content: Content,
    current: &GatewayState,
    opts: &ReconcileOptions,
) -> Result<ChangePlan, ReconcileError> {
    plan_with(content, current, opts, &IdentityNormalizer)
}

pub fn plan_with(
    content: Content,
    current: &GatewayState,
    opts: &ReconcileOptions,
    normalizer: &dyn Normalizer,
) -> Result<ChangePlan, ReconcileError> {
    let current = normalizer.normalize(current.clone(), &opts.capabilities);
    let desired = resolve(content, &current, opts)?;
    let desired = normalizer.normalize(desired, &opts.capabilities);

    let plan = diff(&desired, &current, &opts.selection)?;
    let summary = plan.summary();
    info!(
        select_tags = ?opts.selection.tags(),
        creating = summary.creating,
        updating = summary.updating,
        deleting = summary.deleting,
        unchanged = summary.unchanged,
        "change plan ready"
    );
    Ok(plan)
}
