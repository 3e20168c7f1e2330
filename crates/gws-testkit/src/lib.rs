//! gws-testkit
//!
//! In-process control plane and fixture helpers for end-to-end sync
//! scenarios. Nothing here talks to a real gateway.

mod control_plane;
mod fixtures;

pub use control_plane::{Call, InMemoryControlPlane};
pub use fixtures::{consumer, content, plugin, route, service, state, tagged, upstream};
