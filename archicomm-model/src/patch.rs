//! Partial-update records.
//!
//! A patch names only the fields it changes. `None` means "leave as is".
//! For optional fields (`layer_id`, `label`) the inner option distinguishes
//! "set to this value" from "clear".

use archicomm_types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entity::{Annotation, Component, Connection, EntityKind, Position};
use crate::kinds::{ComponentType, ConnectionType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPatch {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub component_type: Option<ComponentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
}

impl ComponentPatch {
    /// Patch that only moves the component.
    #[must_use]
    pub fn moved_to(x: f64, y: f64) -> Self {
        Self {
            position: Some(Position::new(x, y)),
            ..Self::default()
        }
    }

    /// Patch that only relabels the component.
    #[must_use]
    pub fn relabeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, target: &mut Component) {
        if let Some(t) = self.component_type {
            target.component_type = t;
        }
        if let Some(label) = &self.label {
            target.label = label.clone();
        }
        if let Some(position) = self.position {
            target.position = position;
        }
        if let Some(layer) = &self.layer_id {
            target.layer_id = layer.clone();
        }
        if let Some(properties) = &self.properties {
            target.properties = properties.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<EntityId>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<ConnectionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
}

impl ConnectionPatch {
    pub fn apply_to(&self, target: &mut Connection) {
        if let Some(from) = &self.from {
            target.from = from.clone();
        }
        if let Some(to) = &self.to {
            target.to = to.clone();
        }
        if let Some(t) = self.connection_type {
            target.connection_type = t;
        }
        if let Some(label) = &self.label {
            target.label = label.clone();
        }
        if let Some(properties) = &self.properties {
            target.properties = properties.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl AnnotationPatch {
    pub fn apply_to(&self, target: &mut Annotation) {
        if let Some(content) = &self.content {
            target.content = content.clone();
        }
        if let Some(position) = self.position {
            target.position = position;
        }
    }
}

/// A partial update for any entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityPatch {
    Component(ComponentPatch),
    Connection(ConnectionPatch),
    Annotation(AnnotationPatch),
}

impl EntityPatch {
    /// Returns the entity kind this patch applies to.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPatch::Component(_) => EntityKind::Component,
            EntityPatch::Connection(_) => EntityKind::Connection,
            EntityPatch::Annotation(_) => EntityKind::Annotation,
        }
    }
}

impl From<ComponentPatch> for EntityPatch {
    fn from(p: ComponentPatch) -> Self {
        EntityPatch::Component(p)
    }
}

impl From<ConnectionPatch> for EntityPatch {
    fn from(p: ConnectionPatch) -> Self {
        EntityPatch::Connection(p)
    }
}

impl From<AnnotationPatch> for EntityPatch {
    fn from(p: AnnotationPatch) -> Self {
        EntityPatch::Annotation(p)
    }
}
