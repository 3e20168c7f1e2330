//! Change plan types.

use serde::{Deserialize, Serialize};
use std::fmt;

use gws_schemas::{AnyEntity, EntityKind};

use crate::value_diff::FieldChange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Create,
    Update,
    Delete,
    NoOp,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Create => "create",
            Op::Update => "update",
            Op::Delete => "delete",
            Op::NoOp => "noop",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, Op::NoOp)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified entity.
///
/// `entity` is what the control plane should hold afterwards (for a
/// delete: what it holds now). `previous` and `changes` are only set for
/// updates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedOp {
    pub op: Op,
    pub entity: AnyEntity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<AnyEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

impl PlannedOp {
    pub fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    pub fn id(&self) -> &str {
        self.entity.id().unwrap_or("")
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.op, self.entity.describe())
    }
}

/// Ordered operations: kinds in creation order, within a kind the desired
/// entities (by id) followed by that kind's deletions (by id).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangePlan {
    pub ops: Vec<PlannedOp>,
}

impl ChangePlan {
    pub fn count(&self, op: Op) -> usize {
        self.ops.iter().filter(|o| o.op == op).count()
    }

    /// Every operation that requires a control-plane call.
    pub fn mutations(&self) -> impl Iterator<Item = &PlannedOp> {
        self.ops.iter().filter(|o| o.op.is_mutation())
    }

    pub fn has_changes(&self) -> bool {
        self.mutations().next().is_some()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            creating: self.count(Op::Create),
            updating: self.count(Op::Update),
            deleting: self.count(Op::Delete),
            unchanged: self.count(Op::NoOp),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub creating: usize,
    pub updating: usize,
    pub deleting: usize,
    pub unchanged: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Summary: Created: {}, Updated: {}, Deleted: {}, Unchanged: {}",
            self.creating, self.updating, self.deleting, self.unchanged
        )
    }
}
