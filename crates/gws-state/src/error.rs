use gws_schemas::EntityKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("{kind} {name} has no id and cannot be indexed")]
    MissingId { kind: EntityKind, name: String },

    #[error("{kind} with id {id} is declared more than once")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("{kind} {key} is declared more than once (ids {first} and {second})")]
    DuplicateKey {
        kind: EntityKind,
        key: String,
        first: String,
        second: String,
    },
}
