//! Dependency-safe batching of a change plan.
//!
//! One batch per kind for creates/updates in creation order, then one
//! batch per kind for deletes in reverse creation order. A batch is split
//! into waves when one of its operations depends on another in the same
//! batch. Prerequisites across batches are kept so that a failure can skip
//! its dependents explicitly.

use std::collections::{BTreeMap, BTreeSet};

use gws_reconcile::{ChangePlan, Op, PlannedOp};
use gws_schemas::{EntityKind, Reference};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Upsert,
    Delete,
}

#[derive(Clone, Debug)]
pub struct Batch {
    pub kind: EntityKind,
    pub phase: Phase,
    pub waves: Vec<Vec<PlannedOp>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn key_of(op: &PlannedOp) -> Reference {
    Reference::new(op.kind(), op.id())
}

#[derive(Clone, Debug, Default)]
pub struct Schedule {
    pub batches: Vec<Batch>,
    /// op -> operations that must succeed before it may run.
    prerequisites: BTreeMap<Reference, Vec<Reference>>,
}

impl Schedule {
    pub fn build(plan: &ChangePlan) -> Self {
        let planned: BTreeMap<Reference, Op> = plan.mutations().map(|o| (key_of(o), o.op)).collect();

        let mut prerequisites: BTreeMap<Reference, Vec<Reference>> = BTreeMap::new();
        for op in plan.mutations() {
            let me = key_of(op);
            for target in op.entity.references() {
                match (op.op, planned.get(&target)) {
                    // Parent created/updated first.
                    (Op::Create | Op::Update, Some(Op::Create | Op::Update)) => {
                        prerequisites.entry(me.clone()).or_default().push(target);
                    }
                    // Child deleted before its parent.
                    (Op::Delete, Some(Op::Delete)) => {
                        prerequisites.entry(target).or_default().push(me.clone());
                    }
                    _ => {}
                }
            }
        }

        let mut batches = Vec::new();
        for kind in EntityKind::CREATION_ORDER {
            let ops: Vec<PlannedOp> = plan
                .ops
                .iter()
                .filter(|o| o.kind() == kind && matches!(o.op, Op::Create | Op::Update))
                .cloned()
                .collect();
            if !ops.is_empty() {
                batches.push(Batch {
                    kind,
                    phase: Phase::Upsert,
                    waves: split_waves(ops, &prerequisites),
                });
            }
        }
        for kind in EntityKind::CREATION_ORDER.iter().rev() {
            let ops: Vec<PlannedOp> = plan
                .ops
                .iter()
                .filter(|o| o.kind() == *kind && o.op == Op::Delete)
                .cloned()
                .collect();
            if !ops.is_empty() {
                batches.push(Batch {
                    kind: *kind,
                    phase: Phase::Delete,
                    waves: split_waves(ops, &prerequisites),
                });
            }
        }

        Self {
            batches,
            prerequisites,
        }
    }

    pub fn prerequisites_of(&self, op: &Reference) -> &[Reference] {
        self.prerequisites
            .get(op)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_ops(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}

/// Layer ops so every in-batch prerequisite sits in an earlier wave. A
/// cycle (which the schema does not produce) ends up in one final wave.
fn split_waves(
    ops: Vec<PlannedOp>,
    prerequisites: &BTreeMap<Reference, Vec<Reference>>,
) -> Vec<Vec<PlannedOp>> {
    let in_batch: BTreeSet<Reference> = ops.iter().map(key_of).collect();
    let mut placed: BTreeSet<Reference> = BTreeSet::new();
    let mut remaining = ops;
    let mut waves = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<PlannedOp>, Vec<PlannedOp>) =
            remaining.into_iter().partition(|op| {
                prerequisites
                    .get(&key_of(op))
                    .map(|pre| {
                        pre.iter()
                            .filter(|p| in_batch.contains(*p))
                            .all(|p| placed.contains(p))
                    })
                    .unwrap_or(true)
            });
        if ready.is_empty() {
            waves.push(blocked);
            break;
        }
        placed.extend(ready.iter().map(key_of));
        waves.push(ready);
        remaining = blocked;
    }
    waves
}
