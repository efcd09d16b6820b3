//! Tokio driver for the timer queue.
//!
//! The core never spawns anything. Hosts that run a tokio current-thread
//! runtime (or a `LocalSet`) can hand the queue to [`drive_timers`] instead of
//! calling `run_due` from a frame loop.

use archicomm_types::{Clock, Timestamp};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

use crate::timer::TimerQueue;

/// A clock that follows tokio's time, so a paused test runtime drives
/// deadlines too.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
    base: Timestamp,
}

impl TokioClock {
    /// Starts at `base` now.
    #[must_use]
    pub fn starting_at(base: Timestamp) -> Self {
        Self {
            origin: Instant::now(),
            base,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::starting_at(Timestamp::now())
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.base.plus(elapsed)
    }
}

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Runs due timers every `period` until `shutdown` completes. Returns how
/// many tasks ran. Periods shorter than a millisecond are raised to one.
pub async fn drive_timers<F>(timers: Rc<TimerQueue>, period: Duration, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    let mut ticker = interval(period.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut ran = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                ran += timers.run_due();
            }
        }
    }
    // Catch anything that fell due on the last tick boundary.
    ran += timers.run_due();
    debug!("timer driver stopped after {ran} tasks");
    ran
}
