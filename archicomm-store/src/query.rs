//! Read-side lookups. Multi-result queries return entities in id order.

use archicomm_model::{Annotation, Component, ComponentType, Connection, ConnectionType};
use std::collections::BTreeSet;

use archicomm_types::EntityId;

use crate::state::NormalizedState;
use crate::table::EntityTable;

/// Connections touching one component, split by direction.
///
/// A self-loop shows up in both lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentConnections<'a> {
    pub incoming: Vec<&'a Connection>,
    pub outgoing: Vec<&'a Connection>,
}

impl<'a> ComponentConnections<'a> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty() && self.outgoing.is_empty()
    }

    /// Ids of the incoming connections.
    #[must_use]
    pub fn incoming_ids(&self) -> Vec<&'a EntityId> {
        self.incoming.iter().map(|&c| &c.id).collect()
    }

    /// Ids of the outgoing connections.
    #[must_use]
    pub fn outgoing_ids(&self) -> Vec<&'a EntityId> {
        self.outgoing.iter().map(|&c| &c.id).collect()
    }
}

fn resolve<'a, T>(table: &'a EntityTable<T>, ids: Option<&BTreeSet<EntityId>>) -> Vec<&'a T> {
    ids.map(|ids| ids.iter().filter_map(|id| table.get(id.as_str())).collect())
        .unwrap_or_default()
}

impl NormalizedState {
    #[must_use]
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    #[must_use]
    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.get(id)
    }

    #[must_use]
    pub fn annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    #[must_use]
    pub fn components_of_type(&self, component_type: ComponentType) -> Vec<&Component> {
        resolve(&self.components, self.components_by_type.get(&component_type))
    }

    #[must_use]
    pub fn components_on_layer(&self, layer: &str) -> Vec<&Component> {
        resolve(&self.components, self.components_by_layer.get(layer))
    }

    #[must_use]
    pub fn connections_of_type(&self, connection_type: ConnectionType) -> Vec<&Connection> {
        resolve(&self.connections, self.connections_by_type.get(&connection_type))
    }

    /// Incoming and outgoing connections of a component. Empty for unknown ids.
    #[must_use]
    pub fn connections_for_component(&self, id: &str) -> ComponentConnections<'_> {
        ComponentConnections {
            incoming: resolve(&self.connections, self.connections_by_target.get(id)),
            outgoing: resolve(&self.connections, self.connections_by_source.get(id)),
        }
    }

    /// Annotations whose position lies inside the rectangle, edges included.
    ///
    /// A negative width or height extends the rectangle left or up from
    /// `(x, y)`.
    #[must_use]
    pub fn annotations_in_region(&self, x: f64, y: f64, width: f64, height: f64) -> Vec<&Annotation> {
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return Vec::new();
        }
        let (left, right) = if width < 0.0 { (x + width, x) } else { (x, x + width) };
        let (top, bottom) = if height < 0.0 { (y + height, y) } else { (y, y + height) };

        self.annotations_by_cell
            .candidates(left, top, right - left, bottom - top)
            .iter()
            .filter_map(|id| self.annotations.get(id.as_str()))
            .filter(|a| {
                let p = a.position;
                p.x >= left && p.x <= right && p.y >= top && p.y <= bottom
            })
            .collect()
    }
}
