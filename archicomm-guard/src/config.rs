//! Guard configuration.

use serde::{Deserialize, Serialize};

use crate::GuardError;

/// Tuning for the per-subject oscillation detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Samples kept per subject.
    pub history_capacity: usize,
    /// Identical samples closer together than this are a spurious render.
    pub rapid_render_threshold_ms: u64,
    /// Flips after which a field counts as unstable.
    pub flip_threshold: u32,
    /// A change counts as a flip only if it follows the previous sample
    /// within this many milliseconds; a slower change resets the counters.
    pub oscillation_window_ms: u64,
    /// How many recent samples are searched for repeated states.
    pub repeat_window: usize,
    /// Repeated states within `repeat_window` needed to freeze.
    pub repeat_limit: usize,
    /// Store-level update-rate breaker.
    pub breaker: BreakerConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            history_capacity: 24,
            rapid_render_threshold_ms: 6,
            flip_threshold: 3,
            oscillation_window_ms: 50,
            repeat_window: 8,
            repeat_limit: 2,
            breaker: BreakerConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Parses a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, GuardError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Tuning for the update-rate breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Length of the rolling window.
    pub window_ms: u64,
    /// Updates allowed inside one window before the breaker opens.
    pub max_updates: usize,
    /// How long the breaker stays open before closing on its own.
    pub cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_ms: 1_000,
            max_updates: 120,
            cooldown_ms: 2_000,
        }
    }
}
