//! Diagram entities: components, connections and annotations.

use archicomm_types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::kinds::{ComponentType, ConnectionType};

/// A point on the canvas, in canvas units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An architecture element placed on the canvas.
///
/// `properties` holds free-form key/value settings from the inspector panel.
/// It is a `BTreeMap` so serialization order never depends on insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default)]
    pub id: EntityId,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Component {
    /// Creates a component at the origin with no layer.
    #[must_use]
    pub fn new(id: impl Into<EntityId>, component_type: ComponentType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type,
            label: label.into(),
            position: Position::default(),
            layer_id: None,
            properties: BTreeMap::new(),
        }
    }

    /// Returns this component moved to `(x, y)`.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Returns this component placed on `layer`.
    #[must_use]
    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer_id = Some(layer.into());
        self
    }

    /// Returns this component with an extra property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A directed link between two components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default)]
    pub id: EntityId,
    pub from: EntityId,
    pub to: EntityId,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Connection {
    #[must_use]
    pub fn new(
        id: impl Into<EntityId>,
        from: impl Into<EntityId>,
        to: impl Into<EntityId>,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            connection_type,
            label: None,
            properties: BTreeMap::new(),
        }
    }

    /// Returns this connection with a label.
    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns true if either endpoint is `component`.
    #[must_use]
    pub fn touches(&self, component: &EntityId) -> bool {
        &self.from == component || &self.to == component
    }
}

/// A free-floating note ("info card") on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default)]
    pub id: EntityId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub position: Position,
}

impl Annotation {
    #[must_use]
    pub fn new(id: impl Into<EntityId>, content: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            position: Position::new(x, y),
        }
    }
}

/// The three entity kinds the store keeps tables for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Component,
    Connection,
    Annotation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Component => "component",
            EntityKind::Connection => "connection",
            EntityKind::Annotation => "annotation",
        })
    }
}

/// Any entity, for kind-generic add operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Component(Component),
    Connection(Connection),
    Annotation(Annotation),
}

impl Entity {
    /// Returns the entity's id.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        match self {
            Entity::Component(c) => &c.id,
            Entity::Connection(c) => &c.id,
            Entity::Annotation(a) => &a.id,
        }
    }

    /// Replaces the entity's id.
    pub fn set_id(&mut self, id: EntityId) {
        match self {
            Entity::Component(c) => c.id = id,
            Entity::Connection(c) => c.id = id,
            Entity::Annotation(a) => a.id = id,
        }
    }

    /// Returns which table this entity belongs to.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Component(_) => EntityKind::Component,
            Entity::Connection(_) => EntityKind::Connection,
            Entity::Annotation(_) => EntityKind::Annotation,
        }
    }
}

impl From<Component> for Entity {
    fn from(c: Component) -> Self {
        Entity::Component(c)
    }
}

impl From<Connection> for Entity {
    fn from(c: Connection) -> Self {
        Entity::Connection(c)
    }
}

impl From<Annotation> for Entity {
    fn from(a: Annotation) -> Self {
        Entity::Annotation(a)
    }
}
