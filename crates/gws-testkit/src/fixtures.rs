//! Small builders for scenario inputs.

use anyhow::{Context, Result};

use gws_schemas::{
    AnyEntity, Consumer, Content, Entity, ForeignKey, Plugin, Route, Service, Upstream,
};
use gws_state::GatewayState;

/// Parse a JSON content document.
pub fn content(raw: &str) -> Result<Content> {
    serde_json::from_str(raw).context("parse content fixture")
}

/// Build a stored state; duplicate ids are an error.
pub fn state<I>(entities: I) -> Result<GatewayState>
where
    I: IntoIterator<Item = AnyEntity>,
{
    GatewayState::from_entities(entities).context("build state fixture")
}

pub fn service(id: &str, name: &str) -> Service {
    Service {
        id: Some(id.into()),
        name: Some(name.into()),
        host: Some(format!("{name}.internal")),
        ..Service::default()
    }
}

/// Route attached to the service with id `service_id`.
pub fn route(id: &str, name: &str, service_id: &str) -> Route {
    Route {
        id: Some(id.into()),
        name: Some(name.into()),
        service: Some(ForeignKey::by_id(service_id)),
        paths: vec![format!("/{name}")],
        ..Route::default()
    }
}

pub fn consumer(id: &str, username: &str) -> Consumer {
    Consumer {
        id: Some(id.into()),
        username: Some(username.into()),
        ..Consumer::default()
    }
}

/// Global plugin without an id.
pub fn plugin(name: &str) -> Plugin {
    Plugin {
        name: name.into(),
        ..Plugin::default()
    }
}

pub fn upstream(id: &str, name: &str) -> Upstream {
    Upstream {
        id: Some(id.into()),
        name: Some(name.into()),
        ..Upstream::default()
    }
}

pub fn tagged<T: Entity>(mut entity: T, tags: &[&str]) -> T {
    if let Some(own) = entity.tags_mut() {
        own.extend(tags.iter().map(|t| t.to_string()));
    }
    entity
}
