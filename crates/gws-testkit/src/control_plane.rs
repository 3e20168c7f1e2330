//! In-memory `ControlPlaneClient`.
//!
//! Holds a `GatewayState`, records every call in arrival order, and can be
//! told to reject specific entities, slow every call down, or trip a
//! cancellation token after a number of calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use gws_reconcile::Op;
use gws_schemas::{AnyEntity, EntityKind};
use gws_solver::{ClientError, ControlPlaneClient};
use gws_state::GatewayState;

/// One call as seen by the control plane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
}

#[derive(Debug)]
struct Failure {
    kind: EntityKind,
    key: String,
    error: ClientError,
}

impl Failure {
    fn hits(&self, entity: &AnyEntity) -> bool {
        if entity.kind() != self.kind {
            return false;
        }
        entity.id() == Some(self.key.as_str())
            || entity.display_name() == self.key
            || entity
                .natural_key()
                .map(|k| k.head() == self.key)
                .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryControlPlane {
    state: Mutex<GatewayState>,
    calls: Mutex<Vec<Call>>,
    failures: Vec<Failure>,
    delay: Option<Duration>,
    trip: Option<(usize, CancellationToken)>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: GatewayState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Reject every call touching the `kind` entity whose id, display name
    /// or natural-key name equals `key`.
    pub fn fail_on(mut self, kind: EntityKind, key: impl Into<String>, error: ClientError) -> Self {
        self.failures.push(Failure {
            kind,
            key: key.into(),
            error,
        });
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Cancel `token` once `calls` calls have completed.
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.trip = Some((calls, token));
        self
    }

    pub fn state(&self) -> GatewayState {
        lock(&self.state).clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Index of the first `op` on the `kind` entity named `name`.
    pub fn position(&self, op: Op, kind: EntityKind, name: &str) -> Option<usize> {
        lock(&self.calls)
            .iter()
            .position(|c| c.op == op && c.kind == kind && c.name == name)
    }

    /// Highest number of calls observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn call<R>(
        &self,
        op: Op,
        entity: &AnyEntity,
        apply: impl FnOnce(&mut GatewayState) -> Result<R, ClientError>,
    ) -> Result<R, ClientError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self.failures.iter().find(|f| f.hits(entity)) {
            Some(f) => Err(f.error.clone()),
            None => apply(&mut lock(&self.state)),
        };

        let completed = {
            let mut calls = lock(&self.calls);
            calls.push(Call {
                op,
                kind: entity.kind(),
                id: entity.id().unwrap_or_default().to_string(),
                name: entity.display_name(),
            });
            calls.len()
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        debug!(op = %op, entity = %entity.describe(), ok = result.is_ok(), "control plane call");

        if let Some((after, token)) = &self.trip {
            if completed >= *after {
                token.cancel();
            }
        }
        result
    }
}

fn rejected(status: u16, message: impl Into<String>) -> ClientError {
    ClientError::Rejected {
        status,
        message: message.into(),
    }
}

#[async_trait]
impl ControlPlaneClient for InMemoryControlPlane {
    async fn create(&self, entity: &AnyEntity) -> Result<AnyEntity, ClientError> {
        let stored = entity.clone();
        self.call(Op::Create, entity, move |state| {
            let id = stored
                .id()
                .ok_or_else(|| rejected(400, "id is required"))?
                .to_string();
            if state.contains(stored.kind(), &id) {
                return Err(rejected(409, format!("UNIQUE violation detected on id {id}")));
            }
            state
                .insert_any(stored.clone())
                .map_err(|e| rejected(409, e.to_string()))?;
            Ok(stored)
        })
        .await
    }

    async fn update(&self, entity: &AnyEntity) -> Result<AnyEntity, ClientError> {
        let stored = entity.clone();
        self.call(Op::Update, entity, move |state| {
            let id = stored.id().unwrap_or_default().to_string();
            if !state.contains(stored.kind(), &id) {
                return Err(ClientError::NotFound {
                    kind: stored.kind(),
                    id,
                });
            }
            state
                .upsert_any(stored.clone())
                .map_err(|e| rejected(400, e.to_string()))?;
            Ok(stored)
        })
        .await
    }

    async fn delete(&self, entity: &AnyEntity) -> Result<(), ClientError> {
        let kind = entity.kind();
        let id = entity.id().unwrap_or_default().to_string();
        self.call(Op::Delete, entity, move |state| {
            state
                .remove_any(kind, &id)
                .map(|_| ())
                .ok_or(ClientError::NotFound { kind, id })
        })
        .await
    }
}
