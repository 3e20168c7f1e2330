use thiserror::Error;

use gws_reconcile::Op;
use gws_schemas::EntityKind;

use crate::client::ClientError;

/// Per-operation failures collected during a solve. None of these abort
/// unrelated work by themselves.
#[derive(Debug, Clone, Error)]
pub enum SolveError {
    #[error("{op} {kind} {name} ({id}): {source}")]
    Operation {
        op: Op,
        kind: EntityKind,
        name: String,
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("{op} {kind} {name} ({id}): skipped, depends on failed {blocker}")]
    Skipped {
        op: Op,
        kind: EntityKind,
        name: String,
        id: String,
        blocker: String,
    },

    #[error("solve cancelled: {remaining} operation(s) not attempted")]
    Cancelled { remaining: usize },

    #[error("solve halted after a failure: {remaining} operation(s) not attempted")]
    Halted { remaining: usize },

    #[error("worker task failed: {0}")]
    Worker(String),
}

impl SolveError {
    pub fn is_skip(&self) -> bool {
        matches!(self, SolveError::Skipped { .. })
    }

    /// Operations this record accounts for without them having run.
    pub fn not_attempted(&self) -> usize {
        match self {
            SolveError::Cancelled { remaining } | SolveError::Halted { remaining } => *remaining,
            _ => 0,
        }
    }
}
