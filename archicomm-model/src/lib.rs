//! Diagram entity model for the ArchiComm canvas core.
//!
//! Defines the records every other crate exchanges:
//! - [`Component`], [`Connection`], [`Annotation`]: the three entity kinds
//! - [`ComponentType`] / [`ConnectionType`]: closed kind enumerations
//! - [`Entity`] / [`EntityPatch`]: kind-generic add and partial-update records
//! - [`DiagramSnapshot`]: the flat `{components, connections, annotations}` form
//!
//! The JSON shape (camelCase, `type` tags) matches what the editing UI and the
//! persistence collaborator already produce.

mod entity;
mod kinds;
mod patch;
mod snapshot;

pub use entity::{Annotation, Component, Connection, Entity, EntityKind, Position};
pub use kinds::{ComponentType, ConnectionType};
pub use patch::{AnnotationPatch, ComponentPatch, ConnectionPatch, EntityPatch};
pub use snapshot::DiagramSnapshot;

/// Errors produced while parsing model values.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unknown component type: {0:?}")]
    UnknownComponentType(String),

    #[error("unknown connection type: {0:?}")]
    UnknownConnectionType(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
