//! gws-state
//!
//! Indexed containers for every entity kind: lookup by id and by natural
//! key, selection-tag views, and kind-erased access for the executor.
//!
//! Deterministic, pure logic. No IO.

mod collection;
mod error;
mod select;
mod state;

pub use collection::Collection;
pub use error::StateError;
pub use select::Selection;
pub use state::{GatewayState, Stored};
