//! The stability guard: per-subject oscillation tracking combined with the
//! rate breaker.

use archicomm_types::Timestamp;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::breaker::{BreakerState, RateBreaker};
use crate::config::GuardConfig;
use crate::history::{SampleHistory, StabilitySample};
use crate::oscillation::OscillationTracker;
use crate::status::GuardStatus;

/// Field name used when an observation carries no explicit fields.
pub const STATE_FIELD: &str = "state";

/// What the caller supplies for each update of a subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    pub props_fingerprint: String,
    pub state_fingerprint: String,
    /// Per-field value digests, for oscillation tracking. When empty the
    /// state fingerprint is tracked as a single field.
    pub fields: BTreeMap<String, String>,
}

impl Observation {
    #[must_use]
    pub fn new(props_fingerprint: impl Into<String>, state_fingerprint: impl Into<String>) -> Self {
        Self {
            props_fingerprint: props_fingerprint.into(),
            state_fingerprint: state_fingerprint.into(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// The guard's advice after an observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    /// Nothing suspicious.
    Continue,
    /// The subject re-rendered identical content too quickly.
    RapidRender { since_previous_ms: u64 },
    /// Stop propagating until resumed.
    Freeze { reason: String },
}

impl Recommendation {
    #[must_use]
    pub fn is_freeze(&self) -> bool {
        matches!(self, Recommendation::Freeze { .. })
    }
}

#[derive(Debug, Clone)]
struct Freeze {
    reason: String,
    at: Timestamp,
}

#[derive(Debug, Clone)]
struct SubjectState {
    history: SampleHistory,
    oscillation: OscillationTracker,
    frozen: Option<Freeze>,
}

impl SubjectState {
    fn new(capacity: usize) -> Self {
        Self {
            history: SampleHistory::new(capacity),
            oscillation: OscillationTracker::new(),
            frozen: None,
        }
    }
}

/// Oscillation detector and circuit breaker.
///
/// Closed while updates flow normally. Opens when any tracked subject
/// oscillates (a field keeps flipping and whole states keep repeating) or
/// when the rate breaker sees too many updates. An oscillation freeze stays
/// until [`resume`](Self::resume) is called; the rate breaker closes after
/// its cooldown, and a resume does not close it early.
#[derive(Debug, Clone)]
pub struct StabilityGuard {
    config: GuardConfig,
    subjects: HashMap<String, SubjectState>,
    breaker: RateBreaker,
}

impl StabilityGuard {
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        let breaker = RateBreaker::new(config.breaker.clone());
        Self {
            config,
            subjects: HashMap::new(),
            breaker,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Records one update of `subject` and returns the guard's advice.
    pub fn observe(&mut self, subject: &str, observation: Observation, at: Timestamp) -> Recommendation {
        self.breaker.poll(at);
        self.breaker.record_update(at);

        let config = &self.config;
        let state = self
            .subjects
            .entry(subject.to_string())
            .or_insert_with(|| SubjectState::new(config.history_capacity));

        if let Some(freeze) = &state.frozen {
            return Recommendation::Freeze {
                reason: freeze.reason.clone(),
            };
        }

        let since_previous = state.history.last().map(|last| at.saturating_since(last.at));
        let sample = StabilitySample {
            props_fingerprint: observation.props_fingerprint,
            state_fingerprint: observation.state_fingerprint,
            at,
            since_previous,
        };

        let mut recommendation = Recommendation::Continue;
        if let (Some(last), Some(gap)) = (state.history.last(), since_previous) {
            if gap <= config.rapid_render_threshold_ms && last.same_content(&sample) {
                warn!("{subject} re-rendered identical content after {gap}ms");
                recommendation = Recommendation::RapidRender {
                    since_previous_ms: gap,
                };
            }
        }

        let mut fields = observation.fields;
        if fields.is_empty() {
            fields.insert(STATE_FIELD.to_string(), sample.state_fingerprint.clone());
        }
        state.oscillation.record(&fields, at, config.oscillation_window_ms);
        state.history.push(sample);

        let unstable = state.oscillation.unstable_fields(config.flip_threshold);
        if !unstable.is_empty() {
            let repeats = state.history.repeats_in_last(config.repeat_window);
            debug!("{subject}: unstable {unstable:?}, {repeats} repeated states");
            if repeats >= config.repeat_limit {
                let names: Vec<&str> = unstable.iter().map(String::as_str).collect();
                let reason = format!(
                    "{subject} oscillating on {} ({repeats} repeated states)",
                    names.join(", ")
                );
                warn!("stability guard tripped: {reason}");
                state.frozen = Some(Freeze {
                    reason: reason.clone(),
                    at,
                });
                return Recommendation::Freeze { reason };
            }
        }

        if let BreakerState::Open { reason, .. } = self.breaker.state() {
            return Recommendation::Freeze {
                reason: reason.clone(),
            };
        }
        recommendation
    }

    /// Clears every subject's history, counters and freeze. The rate breaker
    /// keeps its own state. Returns true if the guard is now closed.
    pub fn resume(&mut self, at: Timestamp) -> bool {
        self.breaker.poll(at);
        let frozen = self.frozen_subjects();
        self.subjects.clear();
        info!("stability guard resumed ({} subjects were frozen)", frozen.len());
        !self.breaker.is_open()
    }

    /// Clears one subject. Returns true if it was frozen.
    pub fn resume_subject(&mut self, subject: &str) -> bool {
        let was_frozen = self
            .subjects
            .remove(subject)
            .is_some_and(|s| s.frozen.is_some());
        if was_frozen {
            info!("stability guard resumed {subject}");
        }
        was_frozen
    }

    /// Opens the rate breaker from outside.
    pub fn trip_breaker(&mut self, reason: impl Into<String>, at: Timestamp) {
        self.breaker.force_open(reason, at);
    }

    /// Lets the rate breaker close if its cooldown has elapsed. Returns true
    /// if it closed on this call.
    pub fn poll(&mut self, at: Timestamp) -> bool {
        self.breaker.poll(at)
    }

    /// When the rate breaker will close on its own, if it is open.
    #[must_use]
    pub fn cooldown_deadline(&self) -> Option<Timestamp> {
        self.breaker.cooldown_deadline()
    }

    /// True while propagation should be suppressed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.breaker.is_open() || self.subjects.values().any(|s| s.frozen.is_some())
    }

    #[must_use]
    pub fn is_frozen(&self, subject: &str) -> bool {
        self.subjects
            .get(subject)
            .is_some_and(|s| s.frozen.is_some())
    }

    /// The samples currently held for `subject`, oldest first.
    #[must_use]
    pub fn history(&self, subject: &str) -> Vec<StabilitySample> {
        self.subjects
            .get(subject)
            .map(|s| s.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Current flip count of `field` for `subject`.
    #[must_use]
    pub fn flips(&self, subject: &str, field: &str) -> u32 {
        self.subjects
            .get(subject)
            .map_or(0, |s| s.oscillation.flips(field))
    }

    #[must_use]
    pub fn frozen_subjects(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .subjects
            .iter()
            .filter(|(_, s)| s.frozen.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// A snapshot for display. The breaker's reason wins when both the
    /// breaker and a subject freeze are active.
    #[must_use]
    pub fn status(&self, at: Timestamp) -> GuardStatus {
        let frozen_subjects = self.frozen_subjects();
        let earliest_freeze = self
            .subjects
            .values()
            .filter_map(|s| s.frozen.as_ref())
            .min_by_key(|f| f.at);

        let (reason, tripped_at) = match self.breaker.state() {
            BreakerState::Open { reason, since } => (Some(reason.clone()), Some(*since)),
            BreakerState::Closed => match earliest_freeze {
                Some(freeze) => (Some(freeze.reason.clone()), Some(freeze.at)),
                None => (None, None),
            },
        };

        GuardStatus {
            open: self.is_open(),
            reason,
            tripped_at,
            updates_in_window: self.breaker.updates_in_window(at),
            frozen_subjects,
        }
    }

    /// Drops all subjects and resets the breaker.
    pub fn clear(&mut self) {
        self.subjects.clear();
        self.breaker.reset();
    }
}

impl Default for StabilityGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}
