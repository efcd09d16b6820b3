//! Conversion between the flat snapshot and the normalized state.

use archicomm_model::{DiagramSnapshot, Entity};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::StoreIssue;
use crate::state::{NormalizedState, Outcome};

/// A freshly normalized state plus everything that was skipped or repaired
/// on the way in.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub state: NormalizedState,
    pub issues: Vec<StoreIssue>,
}

impl Normalized {
    /// True when the snapshot went in without any warnings.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.iter().all(StoreIssue::is_informational)
    }
}

/// Builds a normalized state from a snapshot.
///
/// Components are loaded first so connection endpoints resolve regardless of
/// the snapshot's ordering. Entities without an id are skipped unless
/// `config.generate_missing_ids` is set. A repeated id overwrites the earlier
/// entity in place. Connections with unresolved endpoints follow
/// `config.dangling_connections`.
#[must_use]
pub fn normalize(snapshot: &DiagramSnapshot, config: &StoreConfig) -> Normalized {
    let mut state = NormalizedState::new(config.clone());
    let mut issues = Vec::new();
    let generate = config.generate_missing_ids;

    let entities = snapshot
        .components
        .iter()
        .cloned()
        .map(Entity::from)
        .chain(snapshot.connections.iter().cloned().map(Entity::from))
        .chain(snapshot.annotations.iter().cloned().map(Entity::from));

    let mut skipped = 0usize;
    for entity in entities {
        if state.apply_add(entity, generate, &mut issues) != Outcome::Applied {
            skipped += 1;
        }
    }

    if skipped > 0 || !issues.is_empty() {
        info!(
            "normalized {} entities ({skipped} skipped, {} issues)",
            state.entity_count(),
            issues.len()
        );
    } else {
        debug!("normalized {} entities", state.entity_count());
    }

    Normalized { state, issues }
}

/// Flattens a normalized state back into a snapshot, in display order.
#[must_use]
pub fn denormalize(state: &NormalizedState) -> DiagramSnapshot {
    DiagramSnapshot {
        components: state.components().iter().cloned().collect(),
        connections: state.connections().iter().cloned().collect(),
        annotations: state.annotations().iter().cloned().collect(),
    }
}
