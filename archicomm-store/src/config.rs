//! Store configuration.

use serde::{Deserialize, Serialize};

/// Default edge length of an annotation grid cell, in canvas units.
pub const DEFAULT_GRID_CELL_SIZE: f64 = 100.0;

/// What to do with a connection whose endpoint is not a known component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingPolicy {
    /// Reject the connection. Keeps every connection resolvable.
    #[default]
    Drop,
    /// Keep it and report it, so an import can be inspected with
    /// [`validate_integrity`](crate::validate_integrity) before it is accepted.
    Retain,
}

/// Configuration for a [`NormalizedState`](crate::NormalizedState).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Edge length of a spatial grid cell for the annotation index.
    pub grid_cell_size: f64,
    /// Assign generated ids to records that arrive without one during
    /// `normalize`, instead of skipping them.
    pub generate_missing_ids: bool,
    /// Handling of connections that reference unknown components.
    pub dangling_connections: DanglingPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: DEFAULT_GRID_CELL_SIZE,
            generate_missing_ids: false,
            dangling_connections: DanglingPolicy::Drop,
        }
    }
}
