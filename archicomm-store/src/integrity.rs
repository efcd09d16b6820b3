//! The integrity validator.
//!
//! Checks that the id tables agree with their display lists, that every
//! connection resolves both endpoints, and that each secondary index is
//! exactly the grouping its table implies. Mutations keep these invariants on
//! their own; the validator exists for data that arrived from outside
//! (imports, persisted documents) and for tests.

use archicomm_model::EntityKind;
use archicomm_types::EntityId;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::Endpoint;
use crate::index::BucketIndex;
use crate::state::NormalizedState;
use crate::table::EntityTable;

/// One violated invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("{kind} {id} is listed but has no entry")]
    OrphanedListEntry { kind: EntityKind, id: EntityId },

    #[error("{kind} {id} has an entry but is not listed")]
    UnlistedEntity { kind: EntityKind, id: EntityId },

    #[error("{kind} {id} is listed more than once")]
    RepeatedListEntry { kind: EntityKind, id: EntityId },

    #[error("{kind} stored under key {key} carries id {id}")]
    KeyMismatch {
        kind: EntityKind,
        key: EntityId,
        id: EntityId,
    },

    #[error("connection {connection} {endpoint} references missing component {component}")]
    DanglingReference {
        connection: EntityId,
        endpoint: Endpoint,
        component: EntityId,
    },

    #[error("index {index}: {id} is filed under {key} but should not be")]
    StaleIndexEntry {
        index: &'static str,
        key: String,
        id: EntityId,
    },

    #[error("index {index}: {id} should be filed under {key} but is not")]
    MissingIndexEntry {
        index: &'static str,
        key: String,
        id: EntityId,
    },
}

/// The validator's verdict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    pub valid: bool,
    pub errors: Vec<IntegrityError>,
}

/// Checks every structural invariant of `state`.
#[must_use]
pub fn validate_integrity(state: &NormalizedState) -> IntegrityReport {
    let mut errors = Vec::new();

    check_table(EntityKind::Component, &state.components, |c| &c.id, &mut errors);
    check_table(EntityKind::Connection, &state.connections, |c| &c.id, &mut errors);
    check_table(EntityKind::Annotation, &state.annotations, |a| &a.id, &mut errors);

    for (key, connection) in &state.connections.by_id {
        for (endpoint, component) in [(Endpoint::From, &connection.from), (Endpoint::To, &connection.to)] {
            if !state.components.contains(component.as_str()) {
                errors.push(IntegrityError::DanglingReference {
                    connection: key.clone(),
                    endpoint,
                    component: component.clone(),
                });
            }
        }
    }

    let components = &state.components.by_id;
    let connections = &state.connections.by_id;
    let grid = &state.annotations_by_cell;

    check_index(
        "components_by_type",
        &state.components_by_type,
        components.iter().map(|(id, c)| (c.component_type, id)),
        &mut errors,
    );
    check_index(
        "components_by_layer",
        &state.components_by_layer,
        components
            .iter()
            .filter_map(|(id, c)| c.layer_id.clone().map(|layer| (layer, id))),
        &mut errors,
    );
    check_index(
        "connections_by_source",
        &state.connections_by_source,
        connections.iter().map(|(id, c)| (c.from.clone(), id)),
        &mut errors,
    );
    check_index(
        "connections_by_target",
        &state.connections_by_target,
        connections.iter().map(|(id, c)| (c.to.clone(), id)),
        &mut errors,
    );
    check_index(
        "connections_by_type",
        &state.connections_by_type,
        connections.iter().map(|(id, c)| (c.connection_type, id)),
        &mut errors,
    );
    check_index(
        "annotations_by_cell",
        grid.cells(),
        state
            .annotations
            .by_id
            .iter()
            .map(|(id, a)| (grid.cell_of(a.position), id)),
        &mut errors,
    );

    if errors.is_empty() {
        debug!("integrity check passed for {} entities", state.entity_count());
    } else {
        warn!("integrity check found {} problems", errors.len());
        for error in &errors {
            debug!("  {error}");
        }
    }

    IntegrityReport {
        valid: errors.is_empty(),
        errors,
    }
}

fn check_table<T>(
    kind: EntityKind,
    table: &EntityTable<T>,
    id_of: impl Fn(&T) -> &EntityId,
    errors: &mut Vec<IntegrityError>,
) {
    let mut seen = HashSet::new();
    for id in &table.all_ids {
        if !seen.insert(id) {
            errors.push(IntegrityError::RepeatedListEntry { kind, id: id.clone() });
        } else if !table.by_id.contains_key(id) {
            errors.push(IntegrityError::OrphanedListEntry { kind, id: id.clone() });
        }
    }
    for (key, entity) in &table.by_id {
        if !seen.contains(key) {
            errors.push(IntegrityError::UnlistedEntity { kind, id: key.clone() });
        }
        let id = id_of(entity);
        if id != key {
            errors.push(IntegrityError::KeyMismatch {
                kind,
                key: key.clone(),
                id: id.clone(),
            });
        }
    }
}

fn check_index<'a, K>(
    name: &'static str,
    actual: &BucketIndex<K>,
    expected: impl Iterator<Item = (K, &'a EntityId)>,
    errors: &mut Vec<IntegrityError>,
) where
    K: Eq + Hash + Clone + Debug,
{
    let mut wanted = BucketIndex::default();
    for (key, id) in expected {
        wanted.insert(key, id.clone());
    }

    for (key, ids) in actual.buckets() {
        let expected_ids = wanted.get(key);
        for id in ids {
            if !expected_ids.is_some_and(|set| set.contains(id)) {
                errors.push(IntegrityError::StaleIndexEntry {
                    index: name,
                    key: format!("{key:?}"),
                    id: id.clone(),
                });
            }
        }
    }
    for (key, ids) in wanted.buckets() {
        let actual_ids = actual.get(key);
        for id in ids {
            if !actual_ids.is_some_and(|set| set.contains(id)) {
                errors.push(IntegrityError::MissingIndexEntry {
                    index: name,
                    key: format!("{key:?}"),
                    id: id.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archicomm_model::{Annotation, Component, ComponentType, Connection, ConnectionType};
    use std::sync::Arc;

    fn sample() -> NormalizedState {
        let state = NormalizedState::default()
            .add_component(Component::new("c1", ComponentType::Server, "api").on_layer("edge"))
            .state
            .add_component(Component::new("c2", ComponentType::Database, "db"))
            .state
            .add_connection(Connection::new("e1", "c1", "c2", ConnectionType::Sync))
            .state
            .add_annotation(Annotation::new("a1", "note", 10.0, 10.0))
            .state;
        assert!(validate_integrity(&state).valid);
        state
    }

    #[test]
    fn detects_orphaned_list_entry() {
        let mut state = sample();
        Arc::make_mut(&mut state.components).all_ids.push(EntityId::new("ghost"));

        let report = validate_integrity(&state);
        assert!(!report.valid);
        assert!(report.errors.contains(&IntegrityError::OrphanedListEntry {
            kind: EntityKind::Component,
            id: EntityId::new("ghost"),
        }));
    }

    #[test]
    fn detects_unlisted_entity() {
        let mut state = sample();
        Arc::make_mut(&mut state.annotations).all_ids.clear();

        let report = validate_integrity(&state);
        assert_eq!(
            report.errors,
            vec![IntegrityError::UnlistedEntity {
                kind: EntityKind::Annotation,
                id: EntityId::new("a1"),
            }]
        );
    }

    #[test]
    fn detects_repeated_list_entry() {
        let mut state = sample();
        Arc::make_mut(&mut state.connections).all_ids.push(EntityId::new("e1"));

        let report = validate_integrity(&state);
        assert_eq!(
            report.errors,
            vec![IntegrityError::RepeatedListEntry {
                kind: EntityKind::Connection,
                id: EntityId::new("e1"),
            }]
        );
    }

    #[test]
    fn detects_dangling_reference_and_stale_index() {
        let mut state = sample();
        // Drop c2 from the table only, leaving its index entries behind.
        Arc::make_mut(&mut state.components).remove("c2");

        let report = validate_integrity(&state);
        assert!(!report.valid);
        assert!(report.errors.contains(&IntegrityError::DanglingReference {
            connection: EntityId::new("e1"),
            endpoint: Endpoint::To,
            component: EntityId::new("c2"),
        }));
        assert!(report.errors.iter().any(|e| matches!(
            e,
            IntegrityError::StaleIndexEntry { index: "components_by_type", id, .. } if id.as_str() == "c2"
        )));
    }

    #[test]
    fn detects_missing_index_entry() {
        let mut state = sample();
        Arc::make_mut(&mut state.connections_by_type).remove(&ConnectionType::Sync, &EntityId::new("e1"));

        let report = validate_integrity(&state);
        assert_eq!(
            report.errors,
            vec![IntegrityError::MissingIndexEntry {
                index: "connections_by_type",
                key: "Sync".into(),
                id: EntityId::new("e1"),
            }]
        );
    }

    #[test]
    fn detects_annotation_in_wrong_cell() {
        let mut state = sample();
        let id = EntityId::new("a1");
        let grid = Arc::make_mut(&mut state.annotations_by_cell);
        grid.remove(archicomm_model::Position::new(10.0, 10.0), &id);
        grid.insert(archicomm_model::Position::new(500.0, 500.0), id.clone());

        let report = validate_integrity(&state);
        assert!(report.errors.contains(&IntegrityError::StaleIndexEntry {
            index: "annotations_by_cell",
            key: "(5, 5)".into(),
            id: id.clone(),
        }));
        assert!(report.errors.contains(&IntegrityError::MissingIndexEntry {
            index: "annotations_by_cell",
            key: "(0, 0)".into(),
            id,
        }));
    }

    #[test]
    fn detects_key_mismatch() {
        let mut state = sample();
        let table = Arc::make_mut(&mut state.components);
        if let Some(c) = table.by_id.get_mut("c1") {
            c.label = "renamed".into();
        }
        assert!(validate_integrity(&state).valid);

        let table = Arc::make_mut(&mut state.components);
        if let Some(c) = table.by_id.get_mut("c1") {
            c.id = EntityId::new("c9");
        }
        let report = validate_integrity(&state);
        assert!(report.errors.contains(&IntegrityError::KeyMismatch {
            kind: EntityKind::Component,
            key: EntityId::new("c1"),
            id: EntityId::new("c9"),
        }));
    }
}
