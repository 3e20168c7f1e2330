//! gws-solver
//!
//! Applies a change plan to a control plane:
//! - `ControlPlaneClient` is the only seam that performs IO
//! - batches in dependency order, bounded concurrency inside a batch
//! - failures are collected; dependents of a failure are skipped
//! - dry runs produce the same counts and change records without calls

mod client;
mod error;
mod report;
mod schedule;
mod solve;
mod sync;

pub use client::{ClientError, ControlPlaneClient};
pub use error::SolveError;
pub use report::{EntityChange, EntityChanges, SolveOutcome, Stats};
pub use schedule::{Batch, Phase, Schedule};
pub use solve::{solve, SolveOptions, Solver};
pub use sync::SyncRun;
