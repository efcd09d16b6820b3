//! A caller-driven timer queue.
//!
//! Tasks are scheduled against the queue's [`Clock`] and run when the owner
//! calls [`TimerQueue::run_due`]. Nothing runs on its own: a UI host calls
//! `run_due` from its frame loop, tests advance a `ManualClock`, and
//! [`drive_timers`](crate::drive_timers) ticks it from a tokio runtime.

use archicomm_types::{Clock, Timestamp};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Identifies a scheduled task for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

type Task = Box<dyn FnOnce()>;

pub struct TimerQueue {
    clock: Rc<dyn Clock>,
    next_id: Cell<u64>,
    tasks: RefCell<BTreeMap<(Timestamp, u64), Task>>,
}

impl TimerQueue {
    #[must_use]
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            next_id: Cell::new(0),
            tasks: RefCell::new(BTreeMap::new()),
        }
    }

    /// Current time on the queue's clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    #[must_use]
    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.clock)
    }

    /// Runs `task` once `delay_ms` have elapsed.
    pub fn schedule(&self, delay_ms: u64, task: impl FnOnce() + 'static) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let deadline = self.now().plus(delay_ms);
        self.tasks.borrow_mut().insert((deadline, id), Box::new(task));
        TimerHandle(id)
    }

    /// Runs `task` on the next [`run_due`](Self::run_due), never during the
    /// current one.
    pub fn schedule_after_render(&self, task: impl FnOnce() + 'static) -> TimerHandle {
        self.schedule(0, task)
    }

    /// Cancels a pending task. Returns false if it already ran or was
    /// cancelled.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        let mut tasks = self.tasks.borrow_mut();
        let key = tasks.keys().find(|(_, id)| *id == handle.0).copied();
        key.and_then(|key| tasks.remove(&key)).is_some()
    }

    /// Runs every task whose deadline has passed, earliest first. Tasks
    /// scheduled while this runs wait for the next call. Returns how many
    /// tasks ran.
    pub fn run_due(&self) -> usize {
        let now = self.now();
        let cutoff = self.next_id.get();
        let mut ran = 0;
        loop {
            // The borrow ends before the task runs, so tasks may schedule.
            let task = {
                let mut tasks = self.tasks.borrow_mut();
                let key = tasks
                    .keys()
                    .take_while(|(deadline, _)| *deadline <= now)
                    .find(|(_, id)| *id < cutoff)
                    .copied();
                key.and_then(|key| tasks.remove(&key))
            };
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        if ran > 0 {
            debug!("ran {ran} timer tasks");
        }
        ran
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.tasks.borrow().keys().next().map(|(deadline, _)| *deadline)
    }

    #[must_use]
    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.tasks.borrow().keys().any(|(_, id)| *id == handle.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Drops every pending task without running it.
    pub fn clear(&self) {
        // Dropping a task may drop an Rc that owns this queue; take first.
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        drop(tasks);
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.now())
            .field("pending", &self.len())
            .finish()
    }
}
