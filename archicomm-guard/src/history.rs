//! Bounded per-subject sample history.

use archicomm_types::Timestamp;
use serde::Serialize;
use std::collections::VecDeque;

/// One observed update of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StabilitySample {
    pub props_fingerprint: String,
    pub state_fingerprint: String,
    pub at: Timestamp,
    /// Milliseconds since the previous sample; `None` for the first.
    pub since_previous: Option<u64>,
}

impl StabilitySample {
    /// True when both fingerprints equal `other`'s.
    #[must_use]
    pub fn same_content(&self, other: &StabilitySample) -> bool {
        self.props_fingerprint == other.props_fingerprint
            && self.state_fingerprint == other.state_fingerprint
    }
}

/// A fixed-capacity ring of recent samples. The oldest sample is evicted
/// when a new one arrives at capacity.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    capacity: usize,
    samples: VecDeque<StabilitySample>,
}

impl SampleHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: StabilitySample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    #[must_use]
    pub fn last(&self) -> Option<&StabilitySample> {
        self.samples.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &StabilitySample> {
        self.samples.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Among the last `window` samples, how many repeat the content of an
    /// earlier sample in that same window.
    #[must_use]
    pub fn repeats_in_last(&self, window: usize) -> usize {
        let skip = self.samples.len().saturating_sub(window);
        let recent: Vec<&StabilitySample> = self.samples.iter().skip(skip).collect();
        recent
            .iter()
            .enumerate()
            .filter(|(i, sample)| recent[..*i].iter().any(|earlier| earlier.same_content(sample)))
            .count()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
