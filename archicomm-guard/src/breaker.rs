//! Store-level update-rate breaker.
//!
//! Counts updates in a rolling window regardless of content. Too many opens
//! the breaker; it closes again once the cooldown has elapsed. The breaker
//! can also be opened from outside (for example by a persistence layer that
//! is falling behind).

use archicomm_types::Timestamp;
use std::collections::VecDeque;
use tracing::{info, warn};

use crate::config::BreakerConfig;

/// Breaker position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open { reason: String, since: Timestamp },
}

#[derive(Debug, Clone)]
pub struct RateBreaker {
    config: BreakerConfig,
    updates: VecDeque<Timestamp>,
    state: BreakerState,
}

impl RateBreaker {
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            updates: VecDeque::new(),
            state: BreakerState::Closed,
        }
    }

    /// Counts one update. Returns true if this update opened the breaker.
    pub fn record_update(&mut self, at: Timestamp) -> bool {
        self.updates.push_back(at);
        self.evict(at);

        if self.is_open() || self.updates.len() <= self.config.max_updates {
            return false;
        }
        let reason = format!(
            "{} updates within {}ms (limit {})",
            self.updates.len(),
            self.config.window_ms,
            self.config.max_updates
        );
        warn!("rate breaker opened: {reason}");
        self.state = BreakerState::Open { reason, since: at };
        true
    }

    /// Opens the breaker on behalf of an external caller.
    pub fn force_open(&mut self, reason: impl Into<String>, at: Timestamp) {
        let reason = reason.into();
        warn!("rate breaker forced open: {reason}");
        self.state = BreakerState::Open { reason, since: at };
    }

    /// Closes the breaker if its cooldown has elapsed. Returns true if it
    /// closed on this call.
    pub fn poll(&mut self, at: Timestamp) -> bool {
        match self.cooldown_deadline() {
            Some(deadline) if at >= deadline => {
                info!("rate breaker closed after cooldown");
                self.state = BreakerState::Closed;
                self.updates.clear();
                true
            }
            _ => false,
        }
    }

    /// When an open breaker will close on its own.
    #[must_use]
    pub fn cooldown_deadline(&self) -> Option<Timestamp> {
        match &self.state {
            BreakerState::Open { since, .. } => Some(since.plus(self.config.cooldown_ms)),
            BreakerState::Closed => None,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, BreakerState::Open { .. })
    }

    #[must_use]
    pub fn state(&self) -> &BreakerState {
        &self.state
    }

    /// Updates inside the window ending at `at`.
    #[must_use]
    pub fn updates_in_window(&self, at: Timestamp) -> usize {
        self.updates
            .iter()
            .filter(|t| at.saturating_since(**t) <= self.config.window_ms)
            .count()
    }

    pub fn reset(&mut self) {
        self.updates.clear();
        self.state = BreakerState::Closed;
    }

    fn evict(&mut self, at: Timestamp) {
        while let Some(oldest) = self.updates.front() {
            if at.saturating_since(*oldest) > self.config.window_ms {
                self.updates.pop_front();
            } else {
                break;
            }
        }
    }
}
