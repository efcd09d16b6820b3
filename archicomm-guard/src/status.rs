//! Guard status snapshot.

use archicomm_types::Timestamp;
use serde::Serialize;

/// Read-only view of the guard for a "paused, click to resume" affordance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardStatus {
    /// True while propagation is suppressed.
    pub open: bool,
    pub reason: Option<String>,
    pub tripped_at: Option<Timestamp>,
    /// Updates counted by the rate breaker in its current window.
    pub updates_in_window: usize,
    /// Subjects frozen by oscillation, in name order.
    pub frozen_subjects: Vec<String>,
}
