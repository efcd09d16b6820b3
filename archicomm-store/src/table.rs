//! Per-kind entity storage: an id map plus the display order.

use archicomm_types::EntityId;
use std::collections::HashMap;

/// One entity kind's storage: an id map plus the display order.
///
/// `all_ids` and the keys of `by_id` are always the same set; `all_ids`
/// never holds an id twice.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTable<T> {
    pub(crate) by_id: HashMap<EntityId, T>,
    pub(crate) all_ids: Vec<EntityId>,
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            all_ids: Vec::new(),
        }
    }
}

impl<T> EntityTable<T> {
    /// Returns the entity with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id)
    }

    /// Returns true if the table holds `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Ids in display order.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.all_ids
    }

    /// Entities in display order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.all_ids.iter().filter_map(|id| self.by_id.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.all_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_ids.is_empty()
    }

    /// Inserts or replaces. Returns the previous value; a replaced entity
    /// keeps its display position.
    pub(crate) fn upsert(&mut self, id: EntityId, value: T) -> Option<T> {
        let previous = self.by_id.insert(id.clone(), value);
        if previous.is_none() {
            self.all_ids.push(id);
        }
        previous
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.by_id.remove(id)?;
        self.all_ids.retain(|existing| existing.as_str() != id);
        Some(removed)
    }
}
