//! Stability guard for the ArchiComm canvas core.
//!
//! Watches update timing per subject (a UI region, or the sync coordinator
//! itself) and recommends freezing propagation when a subject oscillates.
//! Independently, a store-level rate breaker opens when the overall update
//! volume in a rolling window gets too high.
//!
//! The guard never reads the clock: every call takes the timestamp of the
//! signal it is reacting to, so callers decide what "now" is.
//!
//! # Modules
//!
//! - [`config`]: GuardConfig and BreakerConfig
//! - [`history`]: ring-buffer sample history
//! - [`oscillation`]: per-field flip counters
//! - [`breaker`]: rolling-window rate breaker
//! - [`guard`]: StabilityGuard, tying the above together
//! - [`status`]: read-only status snapshot

pub mod breaker;
pub mod config;
pub mod guard;
pub mod history;
pub mod oscillation;
pub mod status;

pub use breaker::{BreakerState, RateBreaker};
pub use config::{BreakerConfig, GuardConfig};
pub use guard::{Observation, Recommendation, StabilityGuard, STATE_FIELD};
pub use history::{SampleHistory, StabilitySample};
pub use oscillation::OscillationTracker;
pub use status::GuardStatus;

use thiserror::Error;

/// Errors from loading guard configuration.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("invalid guard config: {0}")]
    Config(#[from] serde_json::Error),
}
