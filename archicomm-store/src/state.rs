//! The normalized state and operation results.

use archicomm_model::{Annotation, Component, ComponentType, Connection, ConnectionType, EntityKind};
use archicomm_types::EntityId;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::StoreIssue;
use crate::index::{BucketIndex, SpatialGrid};
use crate::table::EntityTable;

/// One immutable version of the diagram in normalized form.
///
/// Cloning is cheap: every table and index is behind an `Arc`, and a
/// mutation copies only the parts it changes. A reference to an older
/// version is never affected by later writes.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedState {
    pub(crate) config: Arc<StoreConfig>,
    pub(crate) components: Arc<EntityTable<Component>>,
    pub(crate) connections: Arc<EntityTable<Connection>>,
    pub(crate) annotations: Arc<EntityTable<Annotation>>,
    pub(crate) components_by_type: Arc<BucketIndex<ComponentType>>,
    pub(crate) components_by_layer: Arc<BucketIndex<String>>,
    pub(crate) connections_by_source: Arc<BucketIndex<EntityId>>,
    pub(crate) connections_by_target: Arc<BucketIndex<EntityId>>,
    pub(crate) connections_by_type: Arc<BucketIndex<ConnectionType>>,
    pub(crate) annotations_by_cell: Arc<SpatialGrid>,
}

impl NormalizedState {
    /// Creates an empty state.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let grid = SpatialGrid::new(config.grid_cell_size);
        Self {
            config: Arc::new(config),
            components: Arc::default(),
            connections: Arc::default(),
            annotations: Arc::default(),
            components_by_type: Arc::default(),
            components_by_layer: Arc::default(),
            connections_by_source: Arc::default(),
            connections_by_target: Arc::default(),
            connections_by_type: Arc::default(),
            annotations_by_cell: Arc::new(grid),
        }
    }

    /// Returns an empty state with the same configuration.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self::new(self.config.as_ref().clone())
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn components(&self) -> &EntityTable<Component> {
        &self.components
    }

    #[must_use]
    pub fn connections(&self) -> &EntityTable<Connection> {
        &self.connections
    }

    #[must_use]
    pub fn annotations(&self) -> &EntityTable<Annotation> {
        &self.annotations
    }

    #[must_use]
    pub fn components_by_type(&self) -> &BucketIndex<ComponentType> {
        &self.components_by_type
    }

    #[must_use]
    pub fn components_by_layer(&self) -> &BucketIndex<String> {
        &self.components_by_layer
    }

    #[must_use]
    pub fn connections_by_source(&self) -> &BucketIndex<EntityId> {
        &self.connections_by_source
    }

    #[must_use]
    pub fn connections_by_target(&self) -> &BucketIndex<EntityId> {
        &self.connections_by_target
    }

    #[must_use]
    pub fn connections_by_type(&self) -> &BucketIndex<ConnectionType> {
        &self.connections_by_type
    }

    #[must_use]
    pub fn annotations_by_cell(&self) -> &SpatialGrid {
        &self.annotations_by_cell
    }

    /// Which table holds `id`, if any.
    #[must_use]
    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        if self.components.contains(id) {
            Some(EntityKind::Component)
        } else if self.connections.contains(id) {
            Some(EntityKind::Connection)
        } else if self.annotations.contains(id) {
            Some(EntityKind::Annotation)
        } else {
            None
        }
    }

    /// Total number of entities across all tables.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.components.len() + self.connections.len() + self.annotations.len()
    }

    /// Returns true if two versions share every table and index allocation.
    #[must_use]
    pub fn shares_storage_with(&self, other: &NormalizedState) -> bool {
        Arc::ptr_eq(&self.components, &other.components)
            && Arc::ptr_eq(&self.connections, &other.connections)
            && Arc::ptr_eq(&self.annotations, &other.annotations)
    }
}

impl Default for NormalizedState {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

/// What a mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The state changed.
    Applied,
    /// Nothing to do (unknown id, empty batch); the state is unchanged.
    NoOp,
    /// The input was refused; the state is unchanged.
    Rejected,
}

/// The result of a mutation: the new version plus diagnostics.
#[derive(Debug, Clone)]
pub struct MutationResult {
    pub state: NormalizedState,
    pub outcome: Outcome,
    pub issues: Vec<StoreIssue>,
}

impl MutationResult {
    /// True when the mutation changed the state.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.outcome == Outcome::Applied
    }

    pub(crate) fn unchanged(state: &NormalizedState, outcome: Outcome, issues: Vec<StoreIssue>) -> Self {
        Self {
            state: state.clone(),
            outcome,
            issues,
        }
    }
}
