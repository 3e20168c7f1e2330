//! gws-schemas
//!
//! Typed gateway entities, the dynamic configuration value tree, and the
//! declarative content graph. Pure data: no IO, no control-plane calls.

mod any;
mod content;
mod entities;
mod entity;
mod foreign;
mod kind;
mod value;

pub use any::AnyEntity;
pub use content::*;
pub use entities::*;
pub use entity::{Entity, NaturalKey, VOLATILE_FIELDS};
pub use foreign::{ForeignKey, Reference};
pub use kind::EntityKind;
pub use value::{to_config_value, ConfigMap, ConfigValue};
