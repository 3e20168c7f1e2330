//! Plan-then-solve driver for one invocation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use gws_reconcile::{plan_with, IdentityNormalizer, Normalizer, ReconcileError, ReconcileOptions};
use gws_schemas::Content;
use gws_state::GatewayState;

use crate::client::ControlPlaneClient;
use crate::report::SolveOutcome;
use crate::solve::{SolveOptions, Solver};

/// Everything one sync run needs besides the two states.
pub struct SyncRun {
    pub reconcile: ReconcileOptions,
    pub solve: SolveOptions,
    pub normalizer: Box<dyn Normalizer>,
}

impl SyncRun {
    pub fn new(reconcile: ReconcileOptions, solve: SolveOptions) -> Self {
        Self {
            reconcile,
            solve,
            normalizer: Box::new(IdentityNormalizer),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Resolution, validation and conflict errors abort before any call.
    pub async fn execute(
        &self,
        content: Content,
        current: &GatewayState,
        client: Arc<dyn ControlPlaneClient>,
        cancel: CancellationToken,
    ) -> Result<SolveOutcome, ReconcileError> {
        let plan = plan_with(content, current, &self.reconcile, self.normalizer.as_ref())?;
        if !plan.has_changes() {
            info!("control plane already in sync");
        }
        Ok(Solver::new(client, self.solve).solve(&plan, cancel).await)
    }
}
