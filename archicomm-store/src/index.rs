//! Secondary indices.
//!
//! [`BucketIndex`] groups ids by a discriminant (component type, layer,
//! connection endpoint). [`SpatialGrid`] buckets annotations by the grid cell
//! their position falls in; it is a coarse pre-filter for region queries,
//! not an exact index.
//!
//! Buckets are `BTreeSet`s so membership changes are O(log n) and iteration
//! order is deterministic. Empty buckets are dropped so that the set of keys
//! always reflects live entities.

use archicomm_model::Position;
use archicomm_types::EntityId;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use tracing::warn;

use crate::config::DEFAULT_GRID_CELL_SIZE;

/// Ids grouped by key.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketIndex<K: Eq + Hash> {
    buckets: HashMap<K, BTreeSet<EntityId>>,
}

impl<K: Eq + Hash> Default for BucketIndex<K> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> BucketIndex<K> {
    /// Returns the ids filed under `key`.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&BTreeSet<EntityId>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.buckets.get(key)
    }

    /// Iterates every bucket.
    pub fn buckets(&self) -> impl Iterator<Item = (&K, &BTreeSet<EntityId>)> {
        self.buckets.iter()
    }

    /// Total number of memberships across all buckets.
    #[must_use]
    pub fn membership_count(&self) -> usize {
        self.buckets.values().map(BTreeSet::len).sum()
    }

    pub(crate) fn insert(&mut self, key: K, id: EntityId) {
        self.buckets.entry(key).or_default().insert(id);
    }

    pub(crate) fn remove(&mut self, key: &K, id: &EntityId) {
        if let Some(bucket) = self.buckets.get_mut(key) {
            bucket.remove(id);
            if bucket.is_empty() {
                self.buckets.remove(key);
            }
        }
    }

    /// Moves `id` from `old` to `new`. A no-op when the keys are equal.
    pub(crate) fn relocate(&mut self, old: &K, new: K, id: &EntityId) {
        if old == &new {
            return;
        }
        self.remove(old, id);
        self.insert(new, id.clone());
    }
}

/// A grid cell coordinate.
pub type GridCell = (i64, i64);

/// Annotations bucketed by grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: BucketIndex<GridCell>,
}

impl SpatialGrid {
    /// Creates an empty grid. A non-positive or non-finite cell size falls
    /// back to the default.
    #[must_use]
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            warn!("invalid grid cell size {cell_size}, using {DEFAULT_GRID_CELL_SIZE}");
            DEFAULT_GRID_CELL_SIZE
        };
        Self {
            cell_size,
            cells: BucketIndex::default(),
        }
    }

    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// The cell containing `position`.
    #[must_use]
    pub fn cell_of(&self, position: Position) -> GridCell {
        (
            (position.x / self.cell_size).floor() as i64,
            (position.y / self.cell_size).floor() as i64,
        )
    }

    /// The underlying cell buckets.
    #[must_use]
    pub fn cells(&self) -> &BucketIndex<GridCell> {
        &self.cells
    }

    /// Ids in every cell overlapping the rectangle. Candidates only: callers
    /// must still check actual positions.
    #[must_use]
    pub fn candidates(&self, x: f64, y: f64, width: f64, height: f64) -> BTreeSet<EntityId> {
        let (min_cx, min_cy) = self.cell_of(Position::new(x, y));
        let (max_cx, max_cy) = self.cell_of(Position::new(x + width, y + height));

        let span = (max_cx.saturating_sub(min_cx) as i128 + 1)
            * (max_cy.saturating_sub(min_cy) as i128 + 1);

        let mut out = BTreeSet::new();
        if span > self.cells.buckets.len() as i128 {
            // Cheaper to scan occupied cells than to walk an enormous range.
            for (&(cx, cy), ids) in self.cells.buckets() {
                if (min_cx..=max_cx).contains(&cx) && (min_cy..=max_cy).contains(&cy) {
                    out.extend(ids.iter().cloned());
                }
            }
        } else {
            for cx in min_cx..=max_cx {
                for cy in min_cy..=max_cy {
                    if let Some(ids) = self.cells.get(&(cx, cy)) {
                        out.extend(ids.iter().cloned());
                    }
                }
            }
        }
        out
    }

    pub(crate) fn insert(&mut self, position: Position, id: EntityId) {
        let cell = self.cell_of(position);
        self.cells.insert(cell, id);
    }

    pub(crate) fn remove(&mut self, position: Position, id: &EntityId) {
        let cell = self.cell_of(position);
        self.cells.remove(&cell, id);
    }

    pub(crate) fn relocate(&mut self, old: Position, new: Position, id: &EntityId) {
        let old_cell = self.cell_of(old);
        let new_cell = self.cell_of(new);
        self.cells.relocate(&old_cell, new_cell, id);
    }
}
