//! The flat diagram document.

use serde::{Deserialize, Serialize};

use crate::entity::{Annotation, Component, Connection};
use crate::ModelError;

/// The flat, denormalized form of a diagram.
///
/// This is what the application container stores, what fingerprints are
/// computed over, and what the persistence collaborator reads and writes.
/// Vector order is display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramSnapshot {
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl DiagramSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the snapshot holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.connections.is_empty() && self.annotations.is_empty()
    }

    /// Total number of entities across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len() + self.connections.len() + self.annotations.len()
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the snapshot to JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(self)?)
    }
}
