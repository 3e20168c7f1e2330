//! Solve results: counters, change records and the overall outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use gws_reconcile::{Op, PlannedOp};
use gws_schemas::{AnyEntity, ConfigMap, EntityKind};

use crate::error::SolveError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub create_ops: usize,
    pub update_ops: usize,
    pub delete_ops: usize,
}

impl Stats {
    pub fn total(&self) -> usize {
        self.create_ops + self.update_ops + self.delete_ops
    }

    pub fn merge(&mut self, other: Stats) {
        self.create_ops += other.create_ops;
        self.update_ops += other.update_ops;
        self.delete_ops += other.delete_ops;
    }

    fn bump(&mut self, op: Op) {
        match op {
            Op::Create => self.create_ops += 1,
            Op::Update => self.update_ops += 1,
            Op::Delete => self.delete_ops += 1,
            Op::NoOp => {}
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Created: {}, Updated: {}, Deleted: {}",
            self.create_ops, self.update_ops, self.delete_ops
        )
    }
}

/// Record of one applied (or, in dry-run, would-be applied) operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityChange {
    pub kind: EntityKind,
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<ConfigMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<ConfigMap>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityChanges {
    pub creating: Vec<EntityChange>,
    pub updating: Vec<EntityChange>,
    pub deleting: Vec<EntityChange>,
}

impl EntityChanges {
    pub fn merge(&mut self, other: EntityChanges) {
        self.creating.extend(other.creating);
        self.updating.extend(other.updating);
        self.deleting.extend(other.deleting);
    }

    pub fn len(&self) -> usize {
        self.creating.len() + self.updating.len() + self.deleting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accumulator owned by the collector loop for one batch; merged into the
/// run totals when the batch completes.
#[derive(Debug, Default)]
pub(crate) struct BatchTally {
    pub stats: Stats,
    pub changes: EntityChanges,
    pub errors: Vec<SolveError>,
}

impl BatchTally {
    /// `stored` is the control plane's answer; dry runs and deletes pass
    /// `None` and the planned entity is recorded instead.
    pub fn record(&mut self, op: &PlannedOp, stored: Option<&AnyEntity>) {
        let shown = stored.unwrap_or(&op.entity);
        let body = |e: &AnyEntity| e.body().ok();
        let change = EntityChange {
            kind: op.kind(),
            name: shown.display_name(),
            id: shown.id().unwrap_or_default().to_string(),
            before: match op.op {
                Op::Update => op.previous.as_ref().and_then(body),
                Op::Delete => body(&op.entity),
                _ => None,
            },
            after: match op.op {
                Op::Create | Op::Update => body(shown),
                _ => None,
            },
        };
        self.stats.bump(op.op);
        match op.op {
            Op::Create => self.changes.creating.push(change),
            Op::Update => self.changes.updating.push(change),
            Op::Delete => self.changes.deleting.push(change),
            Op::NoOp => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub stats: Stats,
    pub errors: Vec<SolveError>,
    pub changes: EntityChanges,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SolveOutcome {
    pub(crate) fn begin() -> Self {
        let now = Utc::now();
        Self {
            stats: Stats::default(),
            errors: Vec::new(),
            changes: EntityChanges::default(),
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn absorb(&mut self, tally: BatchTally) {
        self.stats.merge(tally.stats);
        self.changes.merge(tally.changes);
        self.errors.extend(tally.errors);
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn into_parts(self) -> (Stats, Vec<SolveError>, EntityChanges) {
        (self.stats, self.errors, self.changes)
    }
}
