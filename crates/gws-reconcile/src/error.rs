use gws_schemas::EntityKind;
use gws_state::StateError;
use thiserror::Error;

/// Everything that stops a run before the first control-plane call.
///
/// `owner` fields name the declaring entity as `<kind> <name>` so the
/// message points at the offending declaration.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{owner}: {kind} {reference} not found")]
    NotFound {
        owner: String,
        kind: EntityKind,
        reference: String,
    },

    #[error("{owner}: {kind} reference {reference} is ambiguous ({matches} matches)")]
    Ambiguous {
        owner: String,
        kind: EntityKind,
        reference: String,
        matches: usize,
    },

    #[error(
        "{owner}: nesting a full {parent_kind} object ({parent}) is not allowed, \
         reference it by id or name"
    )]
    NestedParent {
        owner: String,
        parent_kind: EntityKind,
        parent: String,
    },

    #[error(
        "{owner}: declared under {parent_kind} {parent} but its {parent_kind} \
         field points at {declared}"
    )]
    MutuallyExclusiveScope {
        owner: String,
        parent_kind: EntityKind,
        parent: String,
        declared: String,
    },

    #[error("{kind} {name}: missing required field `{field}`")]
    MissingField {
        kind: EntityKind,
        name: String,
        field: &'static str,
    },

    #[error("duplicate {kind} declaration {key}: {detail}")]
    Duplicate {
        kind: EntityKind,
        key: String,
        detail: String,
    },

    #[error("{kind} is not supported by the target gateway: {reason}")]
    Unsupported { kind: EntityKind, reason: String },

    #[error("{kind} entities carry no tags and cannot be managed with select tags")]
    Untaggable { kind: EntityKind },

    #[error("entity with ID {id} already exists ({kind} outside the selected tags)")]
    Conflict { kind: EntityKind, id: String },

    #[error("{kind} {name}: cannot encode entity body: {source}")]
    Encode {
        kind: EntityKind,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    State(#[from] StateError),
}
