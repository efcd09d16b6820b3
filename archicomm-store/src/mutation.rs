//! Add, update, remove and batch operations.
//!
//! Public operations take `&self` and return a [`MutationResult`] holding the
//! next version. Internally each operation clones the state (cheap: `Arc`
//! clones) and edits the clone in place; `Arc::make_mut` copies a table or
//! index only on its first write, so untouched parts stay shared with the
//! previous version. A batch shares one clone across all its updates.

use archicomm_model::{
    Annotation, Component, Connection, Entity, EntityKind, EntityPatch,
};
use archicomm_types::EntityId;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::DanglingPolicy;
use crate::error::{Endpoint, StoreIssue};
use crate::state::{MutationResult, NormalizedState, Outcome};

/// Logs an issue and records it on the result.
pub(crate) fn report(issues: &mut Vec<StoreIssue>, issue: StoreIssue) {
    if issue.is_informational() {
        debug!("{issue}");
    } else {
        warn!("{issue}");
    }
    issues.push(issue);
}

fn finish(
    previous: &NormalizedState,
    next: NormalizedState,
    outcome: Outcome,
    issues: Vec<StoreIssue>,
) -> MutationResult {
    match outcome {
        Outcome::Applied => MutationResult {
            state: next,
            outcome,
            issues,
        },
        _ => MutationResult::unchanged(previous, outcome, issues),
    }
}

impl NormalizedState {
    // ── Public operations ────────────────────────────────────────

    /// Adds an entity. A missing id is replaced with a generated one.
    ///
    /// Re-adding an existing id of the same kind overwrites it (the newest
    /// value wins, with a [`StoreIssue::DuplicateId`] warning). Reusing an id
    /// held by another kind, or adding a connection to an unknown component
    /// under [`DanglingPolicy::Drop`], is rejected.
    #[must_use]
    pub fn add_entity(&self, entity: impl Into<Entity>) -> MutationResult {
        let mut next = self.clone();
        let mut issues = Vec::new();
        let outcome = next.apply_add(entity.into(), true, &mut issues);
        finish(self, next, outcome, issues)
    }

    #[must_use]
    pub fn add_component(&self, component: Component) -> MutationResult {
        self.add_entity(component)
    }

    #[must_use]
    pub fn add_connection(&self, connection: Connection) -> MutationResult {
        self.add_entity(connection)
    }

    #[must_use]
    pub fn add_annotation(&self, annotation: Annotation) -> MutationResult {
        self.add_entity(annotation)
    }

    /// Applies a partial update. Unknown ids are a logged no-op.
    #[must_use]
    pub fn update_entity(&self, id: &str, patch: impl Into<EntityPatch>) -> MutationResult {
        let mut next = self.clone();
        let mut issues = Vec::new();
        let outcome = next.apply_update(id, patch.into(), &mut issues);
        finish(self, next, outcome, issues)
    }

    /// Removes an entity. Removing a component also removes every
    /// connection that starts or ends at it.
    #[must_use]
    pub fn remove_entity(&self, id: &str) -> MutationResult {
        let mut next = self.clone();
        let mut issues = Vec::new();
        let outcome = next.apply_remove(id, &mut issues);
        finish(self, next, outcome, issues)
    }

    /// Applies several updates in order, as if `update_entity` were called
    /// for each, but on a single working copy.
    ///
    /// The outcome is `Applied` if any update applied; otherwise `Rejected`
    /// if any was rejected, else `NoOp`.
    #[must_use]
    pub fn batch_update<I>(&self, updates: I) -> MutationResult
    where
        I: IntoIterator<Item = (EntityId, EntityPatch)>,
    {
        let mut next = self.clone();
        let mut issues = Vec::new();
        let mut applied = 0usize;
        let mut rejected = 0usize;
        for (id, patch) in updates {
            match next.apply_update(id.as_str(), patch, &mut issues) {
                Outcome::Applied => applied += 1,
                Outcome::Rejected => rejected += 1,
                Outcome::NoOp => {}
            }
        }
        let outcome = if applied > 0 {
            Outcome::Applied
        } else if rejected > 0 {
            Outcome::Rejected
        } else {
            Outcome::NoOp
        };
        debug!("batch update: {applied} applied, {rejected} rejected");
        finish(self, next, outcome, issues)
    }

    // ── In-place steps ───────────────────────────────────────────

    pub(crate) fn apply_add(
        &mut self,
        mut entity: Entity,
        generate_missing_id: bool,
        issues: &mut Vec<StoreIssue>,
    ) -> Outcome {
        if entity.id().is_missing() {
            if !generate_missing_id {
                report(issues, StoreIssue::MissingId { kind: entity.kind() });
                return Outcome::Rejected;
            }
            let id = EntityId::generate();
            debug!("assigned generated id {id} to new {}", entity.kind());
            entity.set_id(id);
        }

        let id = entity.id().clone();
        if let Some(existing) = self.kind_of(id.as_str()) {
            if existing != entity.kind() {
                report(issues, StoreIssue::IdInUse { id, existing });
                return Outcome::Rejected;
            }
            report(
                issues,
                StoreIssue::DuplicateId {
                    kind: existing,
                    id: id.clone(),
                },
            );
        }

        match entity {
            Entity::Component(component) => {
                self.store_component(component);
            }
            Entity::Connection(connection) => {
                if !self.endpoints_acceptable(&connection, issues) {
                    return Outcome::Rejected;
                }
                self.store_connection(connection);
            }
            Entity::Annotation(annotation) => {
                self.store_annotation(annotation);
            }
        }
        Outcome::Applied
    }

    pub(crate) fn apply_update(
        &mut self,
        id: &str,
        patch: EntityPatch,
        issues: &mut Vec<StoreIssue>,
    ) -> Outcome {
        let Some(kind) = self.kind_of(id) else {
            report(issues, StoreIssue::UnknownId { id: id.into() });
            return Outcome::NoOp;
        };
        if kind != patch.kind() {
            report(
                issues,
                StoreIssue::KindMismatch {
                    id: id.into(),
                    kind,
                    patch: patch.kind(),
                },
            );
            return Outcome::Rejected;
        }

        match patch {
            EntityPatch::Component(patch) => {
                let Some(current) = self.components.get(id) else {
                    return Outcome::NoOp;
                };
                let mut updated = current.clone();
                patch.apply_to(&mut updated);
                if &updated == current {
                    return Outcome::NoOp;
                }
                self.store_component(updated);
            }
            EntityPatch::Connection(patch) => {
                let Some(current) = self.connections.get(id) else {
                    return Outcome::NoOp;
                };
                let mut updated = current.clone();
                patch.apply_to(&mut updated);
                if &updated == current {
                    return Outcome::NoOp;
                }
                if !self.endpoints_acceptable(&updated, issues) {
                    return Outcome::Rejected;
                }
                self.store_connection(updated);
            }
            EntityPatch::Annotation(patch) => {
                let Some(current) = self.annotations.get(id) else {
                    return Outcome::NoOp;
                };
                let mut updated = current.clone();
                patch.apply_to(&mut updated);
                if &updated == current {
                    return Outcome::NoOp;
                }
                self.store_annotation(updated);
            }
        }
        Outcome::Applied
    }

    pub(crate) fn apply_remove(&mut self, id: &str, issues: &mut Vec<StoreIssue>) -> Outcome {
        match self.kind_of(id) {
            None => {
                report(issues, StoreIssue::UnknownId { id: id.into() });
                Outcome::NoOp
            }
            Some(EntityKind::Component) => {
                let mut dependents: BTreeSet<EntityId> = BTreeSet::new();
                if let Some(outgoing) = self.connections_by_source.get(id) {
                    dependents.extend(outgoing.iter().cloned());
                }
                if let Some(incoming) = self.connections_by_target.get(id) {
                    dependents.extend(incoming.iter().cloned());
                }
                for connection in dependents {
                    self.unstore_connection(connection.as_str());
                    report(
                        issues,
                        StoreIssue::CascadeRemoved {
                            connection,
                            component: id.into(),
                        },
                    );
                }
                self.unstore_component(id);
                Outcome::Applied
            }
            Some(EntityKind::Connection) => {
                self.unstore_connection(id);
                Outcome::Applied
            }
            Some(EntityKind::Annotation) => {
                self.unstore_annotation(id);
                Outcome::Applied
            }
        }
    }

    /// Reports unresolved endpoints. Returns false if the connection must be
    /// refused under the configured policy.
    fn endpoints_acceptable(&self, connection: &Connection, issues: &mut Vec<StoreIssue>) -> bool {
        let mut dangling = false;
        for (endpoint, component) in [(Endpoint::From, &connection.from), (Endpoint::To, &connection.to)] {
            if !self.components.contains(component.as_str()) {
                dangling = true;
                report(
                    issues,
                    StoreIssue::DanglingReference {
                        connection: connection.id.clone(),
                        endpoint,
                        component: component.clone(),
                    },
                );
            }
        }
        !dangling || self.config.dangling_connections == DanglingPolicy::Retain
    }

    // ── Table + index maintenance ────────────────────────────────

    fn store_component(&mut self, component: Component) -> Option<Component> {
        let id = component.id.clone();
        let component_type = component.component_type;
        let layer = component.layer_id.clone();
        let previous = Arc::make_mut(&mut self.components).upsert(id.clone(), component);

        match &previous {
            Some(old) => {
                if old.component_type != component_type {
                    Arc::make_mut(&mut self.components_by_type).relocate(
                        &old.component_type,
                        component_type,
                        &id,
                    );
                }
                if old.layer_id != layer {
                    let index = Arc::make_mut(&mut self.components_by_layer);
                    if let Some(old_layer) = &old.layer_id {
                        index.remove(old_layer, &id);
                    }
                    if let Some(new_layer) = layer {
                        index.insert(new_layer, id);
                    }
                }
            }
            None => {
                Arc::make_mut(&mut self.components_by_type).insert(component_type, id.clone());
                if let Some(layer) = layer {
                    Arc::make_mut(&mut self.components_by_layer).insert(layer, id);
                }
            }
        }
        previous
    }

    fn store_connection(&mut self, connection: Connection) -> Option<Connection> {
        let id = connection.id.clone();
        let from = connection.from.clone();
        let to = connection.to.clone();
        let connection_type = connection.connection_type;
        let previous = Arc::make_mut(&mut self.connections).upsert(id.clone(), connection);

        match &previous {
            Some(old) => {
                if old.from != from {
                    Arc::make_mut(&mut self.connections_by_source).relocate(&old.from, from, &id);
                }
                if old.to != to {
                    Arc::make_mut(&mut self.connections_by_target).relocate(&old.to, to, &id);
                }
                if old.connection_type != connection_type {
                    Arc::make_mut(&mut self.connections_by_type).relocate(
                        &old.connection_type,
                        connection_type,
                        &id,
                    );
                }
            }
            None => {
                Arc::make_mut(&mut self.connections_by_source).insert(from, id.clone());
                Arc::make_mut(&mut self.connections_by_target).insert(to, id.clone());
                Arc::make_mut(&mut self.connections_by_type).insert(connection_type, id);
            }
        }
        previous
    }

    fn store_annotation(&mut self, annotation: Annotation) -> Option<Annotation> {
        let id = annotation.id.clone();
        let position = annotation.position;
        let previous = Arc::make_mut(&mut self.annotations).upsert(id.clone(), annotation);

        match &previous {
            Some(old) => {
                let grid = &self.annotations_by_cell;
                if grid.cell_of(old.position) != grid.cell_of(position) {
                    Arc::make_mut(&mut self.annotations_by_cell).relocate(old.position, position, &id);
                }
            }
            None => Arc::make_mut(&mut self.annotations_by_cell).insert(position, id),
        }
        previous
    }

    fn unstore_component(&mut self, id: &str) -> Option<Component> {
        let removed = Arc::make_mut(&mut self.components).remove(id)?;
        Arc::make_mut(&mut self.components_by_type).remove(&removed.component_type, &removed.id);
        if let Some(layer) = &removed.layer_id {
            Arc::make_mut(&mut self.components_by_layer).remove(layer, &removed.id);
        }
        Some(removed)
    }

    fn unstore_connection(&mut self, id: &str) -> Option<Connection> {
        let removed = Arc::make_mut(&mut self.connections).remove(id)?;
        Arc::make_mut(&mut self.connections_by_source).remove(&removed.from, &removed.id);
        Arc::make_mut(&mut self.connections_by_target).remove(&removed.to, &removed.id);
        Arc::make_mut(&mut self.connections_by_type).remove(&removed.connection_type, &removed.id);
        Some(removed)
    }

    fn unstore_annotation(&mut self, id: &str) -> Option<Annotation> {
        let removed = Arc::make_mut(&mut self.annotations).remove(id)?;
        Arc::make_mut(&mut self.annotations_by_cell).remove(removed.position, &removed.id);
        Some(removed)
    }
}
