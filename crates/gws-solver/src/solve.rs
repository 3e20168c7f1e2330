//! Executor: applies a change plan through a bounded worker pool.
//!
//! Batches run strictly in order. Inside a wave at most `concurrency`
//! calls are in flight; results are collected by a single loop that owns
//! the batch tally, so workers share no mutable state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gws_config::SolveSettings;
use gws_reconcile::{ChangePlan, Op, PlannedOp};
use gws_schemas::{AnyEntity, Reference};

use crate::client::{ClientError, ControlPlaneClient};
use crate::error::SolveError;
use crate::report::{BatchTally, SolveOutcome};
use crate::schedule::{key_of, Schedule};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolveOptions {
    pub concurrency: usize,
    pub dry_run: bool,
    pub continue_on_error: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self::from_settings(&SolveSettings::default())
    }
}

impl SolveOptions {
    pub fn from_settings(s: &SolveSettings) -> Self {
        Self {
            concurrency: s.concurrency,
            dry_run: s.dry_run,
            continue_on_error: s.continue_on_error,
        }
    }

    fn workers(&self) -> usize {
        self.concurrency.max(1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Done,
    Failed,
    Skipped,
}

pub struct Solver {
    client: Arc<dyn ControlPlaneClient>,
    opts: SolveOptions,
}

impl Solver {
    pub fn new(client: Arc<dyn ControlPlaneClient>, opts: SolveOptions) -> Self {
        Self { client, opts }
    }

    pub async fn solve(&self, plan: &ChangePlan, cancel: CancellationToken) -> SolveOutcome {
        let schedule = Schedule::build(plan);
        let mut outcome = SolveOutcome::begin();
        let mut status: BTreeMap<Reference, Status> = BTreeMap::new();
        let mut halted = false;
        let mut not_attempted = 0usize;

        info!(
            ops = schedule.total_ops(),
            batches = schedule.batches.len(),
            concurrency = self.opts.workers(),
            dry_run = self.opts.dry_run,
            "solve started"
        );

        for batch in &schedule.batches {
            if halted || cancel.is_cancelled() {
                not_attempted += batch.len();
                continue;
            }

            let mut tally = BatchTally::default();
            for wave in &batch.waves {
                if halted || cancel.is_cancelled() {
                    not_attempted += wave.len();
                    continue;
                }
                not_attempted += self
                    .run_wave(wave, &schedule, &mut status, &mut tally, &mut halted, &cancel)
                    .await;
            }

            info!(
                kind = %batch.kind,
                phase = ?batch.phase,
                applied = tally.stats.total(),
                errors = tally.errors.len(),
                "batch complete"
            );
            outcome.absorb(tally);
        }

        if not_attempted > 0 {
            if cancel.is_cancelled() {
                warn!(remaining = not_attempted, "solve cancelled");
                outcome.errors.push(SolveError::Cancelled {
                    remaining: not_attempted,
                });
            } else if halted {
                warn!(remaining = not_attempted, "solve halted");
                outcome.errors.push(SolveError::Halted {
                    remaining: not_attempted,
                });
            }
        }

        outcome.finished_at = Utc::now();
        info!(
            stats = %outcome.stats,
            errors = outcome.errors.len(),
            "solve finished"
        );
        outcome
    }

    /// Dispatch one wave; returns how many of its ops were never attempted.
    async fn run_wave(
        &self,
        wave: &[PlannedOp],
        schedule: &Schedule,
        status: &mut BTreeMap<Reference, Status>,
        tally: &mut BatchTally,
        halted: &mut bool,
        cancel: &CancellationToken,
    ) -> usize {
        let workers = self.opts.workers();
        let mut queue = wave.iter();
        let mut in_flight: JoinSet<(PlannedOp, Result<Option<AnyEntity>, ClientError>)> =
            JoinSet::new();
        let mut dispatched = 0usize;

        loop {
            while in_flight.len() < workers && !*halted && !cancel.is_cancelled() {
                let Some(op) = queue.next() else { break };
                dispatched += 1;
                let key = key_of(op);

                if let Some(blocker) = failed_prerequisite(schedule, status, &key) {
                    warn!(op = %op.describe(), blocker = %describe_ref(&blocker), "skipped");
                    status.insert(key, Status::Skipped);
                    tally.errors.push(SolveError::Skipped {
                        op: op.op,
                        kind: op.kind(),
                        name: op.entity.display_name(),
                        id: op.id().to_string(),
                        blocker: describe_ref(&blocker),
                    });
                    continue;
                }

                if self.opts.dry_run {
                    debug!(op = %op.describe(), "dry run");
                    tally.record(op, None);
                    status.insert(key, Status::Done);
                    continue;
                }

                debug!(op = %op.describe(), id = op.id(), "dispatch");
                let client = Arc::clone(&self.client);
                let op = op.clone();
                in_flight.spawn(async move {
                    let result = execute(client.as_ref(), &op).await;
                    (op, result)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            match joined {
                Ok((op, Ok(stored))) => {
                    tally.record(&op, stored.as_ref());
                    status.insert(key_of(&op), Status::Done);
                }
                Ok((op, Err(source))) => {
                    warn!(op = %op.describe(), error = %source, "operation failed");
                    status.insert(key_of(&op), Status::Failed);
                    tally.errors.push(SolveError::Operation {
                        op: op.op,
                        kind: op.kind(),
                        name: op.entity.display_name(),
                        id: op.id().to_string(),
                        source,
                    });
                    if !self.opts.continue_on_error {
                        *halted = true;
                    }
                }
                Err(join_err) => {
                    warn!(error = %join_err, "worker task failed");
                    tally.errors.push(SolveError::Worker(join_err.to_string()));
                    if !self.opts.continue_on_error {
                        *halted = true;
                    }
                }
            }
        }

        wave.len() - dispatched
    }
}

/// First prerequisite of `key` that failed or was itself skipped.
fn failed_prerequisite(
    schedule: &Schedule,
    status: &BTreeMap<Reference, Status>,
    key: &Reference,
) -> Option<Reference> {
    schedule
        .prerequisites_of(key)
        .iter()
        .find(|p| matches!(status.get(*p), Some(Status::Failed | Status::Skipped)))
        .cloned()
}

fn describe_ref(r: &Reference) -> String {
    format!("{} {}", r.kind, r.id)
}

async fn execute(
    client: &dyn ControlPlaneClient,
    op: &PlannedOp,
) -> Result<Option<AnyEntity>, ClientError> {
    match op.op {
        Op::Create => client.create(&op.entity).await.map(Some),
        Op::Update => client.update(&op.entity).await.map(Some),
        Op::Delete => client.delete(&op.entity).await.map(|_| None),
        Op::NoOp => Ok(None),
    }
}

/// Free-function form: `(Stats, errors, EntityChanges)` for one plan.
pub async fn solve(
    plan: &ChangePlan,
    client: Arc<dyn ControlPlaneClient>,
    opts: SolveOptions,
    cancel: CancellationToken,
) -> SolveOutcome {
    Solver::new(client, opts).solve(plan, cancel).await
}
