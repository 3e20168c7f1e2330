//! Scenario: failures, dry runs and cancellation during solve.
//!
//! # Invariants under test
//!
//! 1. A failed parent skips its dependents explicitly; they are never
//!    attempted. Unrelated operations still run.
//! 2. With continue_on_error=false nothing is dispatched after the first
//!    failure, and the operations left behind are reported.
//! 3. A dry run reports the full plan and makes no calls.
//! 4. Cancellation lets in-flight calls finish, dispatches nothing new and
//!    reports the remainder.
//! 5. No more than `concurrency` calls are ever in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use gws_reconcile::{Op, ReconcileOptions};
use gws_schemas::EntityKind;
use gws_solver::{ClientError, SolveError, SolveOptions, SolveOutcome, SyncRun};
use gws_testkit::{content, InMemoryControlPlane};

const TWO_SERVICES: &str = r#"{
    "services":[
        {"name":"svc1","routes":[{"name":"r1","paths":["/r1"]}]},
        {"name":"svc2"}
    ]
}"#;

const FIVE_SERVICES: &str = r#"{
    "services":[
        {"id":"s1","name":"a"},
        {"id":"s2","name":"b"},
        {"id":"s3","name":"c"},
        {"id":"s4","name":"d"},
        {"id":"s5","name":"e"}
    ]
}"#;

async fn run(
    raw: &str,
    cp: &Arc<InMemoryControlPlane>,
    opts: SolveOptions,
    cancel: CancellationToken,
) -> anyhow::Result<SolveOutcome> {
    let outcome = SyncRun::new(ReconcileOptions::default(), opts)
        .execute(content(raw)?, &cp.state(), cp.clone(), cancel)
        .await?;
    Ok(outcome)
}

fn rejected() -> ClientError {
    ClientError::Rejected {
        status: 400,
        message: "schema violation (host: required field missing)".into(),
    }
}

#[tokio::test]
async fn failed_service_skips_its_route_but_not_its_sibling() -> anyhow::Result<()> {
    // GIVEN: the control plane rejects svc1
    let cp = Arc::new(InMemoryControlPlane::new().fail_on(EntityKind::Service, "svc1", rejected()));

    // WHEN: both services and svc1's route are synced (continue_on_error default)
    let outcome = run(
        TWO_SERVICES,
        &cp,
        SolveOptions::default(),
        CancellationToken::new(),
    )
    .await?;

    // THEN: svc2 lands, svc1 fails, r1 is skipped and never sent
    assert_eq!(outcome.stats.create_ops, 1);
    assert!(cp.position(Op::Create, EntityKind::Service, "svc2").is_some());
    assert!(cp.position(Op::Create, EntityKind::Route, "r1").is_none());

    assert_eq!(outcome.errors.len(), 2, "{:?}", outcome.errors);
    assert!(outcome.errors.iter().any(|e| matches!(
        e,
        SolveError::Operation { kind: EntityKind::Service, name, .. } if name == "svc1"
    )));
    let skipped = outcome
        .errors
        .iter()
        .find(|e| e.is_skip())
        .expect("route must be reported as skipped");
    assert!(skipped.to_string().contains("r1"), "{skipped}");
    Ok(())
}

#[tokio::test]
async fn stop_on_first_error_dispatches_nothing_further() -> anyhow::Result<()> {
    let cp = Arc::new(InMemoryControlPlane::new().fail_on(EntityKind::Service, "a", rejected()));
    let opts = SolveOptions {
        concurrency: 1,
        continue_on_error: false,
        ..SolveOptions::default()
    };

    let outcome = run(FIVE_SERVICES, &cp, opts, CancellationToken::new()).await?;

    // THEN: one call, and the four never sent are still accounted for
    assert_eq!(cp.call_count(), 1, "{:?}", cp.calls());
    assert_eq!(outcome.stats.total(), 0);
    assert!(cp.state().is_empty());
    assert!(matches!(
        outcome.errors.as_slice(),
        [SolveError::Operation { .. }, SolveError::Halted { remaining: 4 }]
    ), "{:?}", outcome.errors);
    Ok(())
}

#[tokio::test]
async fn dry_run_reports_plan_without_calls() -> anyhow::Result<()> {
    let cp = Arc::new(InMemoryControlPlane::new());
    let opts = SolveOptions {
        dry_run: true,
        ..SolveOptions::default()
    };

    let outcome = run(TWO_SERVICES, &cp, opts, CancellationToken::new()).await?;

    assert!(outcome.is_success(), "{:?}", outcome.errors);
    assert_eq!(outcome.stats.create_ops, 3);
    assert_eq!(outcome.changes.creating.len(), 3);
    assert_eq!(cp.call_count(), 0);
    assert!(cp.state().is_empty());
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_dispatch_and_reports_remaining() -> anyhow::Result<()> {
    // GIVEN: the token trips after the second completed call
    let cancel = CancellationToken::new();
    let cp = Arc::new(InMemoryControlPlane::new().cancel_after(2, cancel.clone()));
    let opts = SolveOptions {
        concurrency: 1,
        ..SolveOptions::default()
    };

    // WHEN
    let outcome = run(FIVE_SERVICES, &cp, opts, cancel).await?;

    // THEN: two applied, three reported as not attempted
    assert_eq!(cp.call_count(), 2);
    assert_eq!(outcome.stats.create_ops, 2);
    assert!(matches!(
        outcome.errors.as_slice(),
        [SolveError::Cancelled { remaining: 3 }]
    ));
    Ok(())
}

#[tokio::test]
async fn in_flight_calls_never_exceed_concurrency() -> anyhow::Result<()> {
    let cp = Arc::new(InMemoryControlPlane::new().with_delay(Duration::from_millis(20)));
    let opts = SolveOptions {
        concurrency: 2,
        ..SolveOptions::default()
    };

    let outcome = run(FIVE_SERVICES, &cp, opts, CancellationToken::new()).await?;

    assert!(outcome.is_success(), "{:?}", outcome.errors);
    assert_eq!(outcome.stats.create_ops, 5);
    assert!(cp.peak_in_flight() <= 2, "peak {}", cp.peak_in_flight());
    assert!(cp.peak_in_flight() >= 1);
    Ok(())
}
