use async_trait::async_trait;
use thiserror::Error;

use gws_schemas::{AnyEntity, EntityKind};

/// Errors reported by a control-plane client. Messages are surfaced to
/// the operator as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("control plane unavailable: {0}")]
    Unavailable(String),
}

/// Mutating calls against one control plane.
///
/// Implementations must be safe to call concurrently; the solver keeps up
/// to `concurrency` calls in flight within a batch.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Create `entity` under its pre-assigned id; returns the stored form.
    async fn create(&self, entity: &AnyEntity) -> Result<AnyEntity, ClientError>;

    /// Replace the entity with `entity.id()`; returns the stored form.
    async fn update(&self, entity: &AnyEntity) -> Result<AnyEntity, ClientError>;

    async fn delete(&self, entity: &AnyEntity) -> Result<(), ClientError>;
}
