//! `gws diff` and `gws validate`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use gws_reconcile::{plan, resolve, Op};
use gws_schemas::AnyEntity;
use gws_solver::{ClientError, ControlPlaneClient, SolveOptions, Solver};

use super::Inputs;

/// Client for dry runs: the solver never calls it, and any call is refused.
struct Offline;

#[async_trait]
impl ControlPlaneClient for Offline {
    async fn create(&self, _: &AnyEntity) -> Result<AnyEntity, ClientError> {
        Err(ClientError::Unavailable("offline".into()))
    }

    async fn update(&self, _: &AnyEntity) -> Result<AnyEntity, ClientError> {
        Err(ClientError::Unavailable("offline".into()))
    }

    async fn delete(&self, _: &AnyEntity) -> Result<(), ClientError> {
        Err(ClientError::Unavailable("offline".into()))
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

/// Print every planned change and the summary. Returns whether anything
/// would change.
pub async fn run_diff(inputs: Inputs) -> Result<bool> {
    let Inputs {
        content,
        current,
        config,
        reconcile,
    } = inputs;

    let plan = plan(content, &current, &reconcile)?;

    for op in plan.mutations() {
        println!("{} {}", verb(op.op), op.entity.describe());
        for change in &op.changes {
            println!("  {change}");
        }
    }

    let opts = SolveOptions {
        dry_run: true,
        ..SolveOptions::from_settings(&config.sync)
    };
    let outcome = Solver::new(Arc::new(Offline), opts)
        .solve(&plan, CancellationToken::new())
        .await;
    for e in &outcome.errors {
        eprintln!("error: {e}");
    }

    println!("{}", plan.summary());
    if !outcome.is_success() {
        anyhow::bail!("{} error(s) while planning", outcome.errors.len());
    }
    Ok(plan.has_changes())
}

fn verb(op: Op) -> &'static str {
    match op {
        Op::Create => "creating",
        Op::Update => "updating",
        Op::Delete => "deleting",
        Op::NoOp => "unchanged",
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn run_validate(inputs: Inputs) -> Result<()> {
    let desired = resolve(inputs.content, &inputs.current, &inputs.reconcile)?;
    println!("valid=true entities={}", desired.total());
    Ok(())
}
