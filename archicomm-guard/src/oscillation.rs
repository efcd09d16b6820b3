//! Per-field flip counting.
//!
//! A flip is a change in a field's value relative to the previous sample,
//! arriving within the oscillation window. A change that arrives later than
//! the window resets every counter: slow, deliberate edits are progress, not
//! a feedback loop.

use archicomm_types::Timestamp;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct OscillationTracker {
    last_values: BTreeMap<String, String>,
    flips: BTreeMap<String, u32>,
    last_at: Option<Timestamp>,
}

impl OscillationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the field values of one sample.
    pub fn record(&mut self, fields: &BTreeMap<String, String>, at: Timestamp, window_ms: u64) {
        let within_window = self
            .last_at
            .is_some_and(|last| at.saturating_since(last) <= window_ms);
        if !within_window {
            self.flips.clear();
        }

        for (field, value) in fields {
            let changed = self
                .last_values
                .get(field)
                .is_some_and(|previous| previous != value);
            if changed && within_window {
                *self.flips.entry(field.clone()).or_insert(0) += 1;
            }
            self.last_values.insert(field.clone(), value.clone());
        }
        self.last_at = Some(at);
    }

    /// Current flip count of `field`.
    #[must_use]
    pub fn flips(&self, field: &str) -> u32 {
        self.flips.get(field).copied().unwrap_or(0)
    }

    /// Fields whose flip count has reached `threshold`.
    #[must_use]
    pub fn unstable_fields(&self, threshold: u32) -> BTreeSet<String> {
        self.flips
            .iter()
            .filter(|(_, count)| **count >= threshold)
            .map(|(field, _)| field.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.last_values.clear();
        self.flips.clear();
        self.last_at = None;
    }
}
