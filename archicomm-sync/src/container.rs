//! State containers.
//!
//! A container holds one side's view of the diagram and notifies listeners
//! when it changes. The application container holds the flat design
//! document ([`DiagramSnapshot`]); the canvas container holds the normalized
//! editing state ([`NormalizedState`]).
//!
//! Writes carry [`WriteOptions`]. Deferred user writes wait in a buffer and
//! commit after the debounce delay or on [`Container::flush`]. User and
//! import writes record the replaced version for [`Container::undo`]. A sync
//! write is never recorded and clears the history: every earlier version
//! predates the other side's edit, so restoring one would erase it.
//!
//! Listeners run after every borrow has been released, so a listener may
//! read the container, write to it, or subscribe and unsubscribe freely.

use archicomm_model::DiagramSnapshot;
use archicomm_store::{denormalize, normalize, MutationResult, NormalizedState};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

use crate::timer::{TimerHandle, TimerQueue};

/// State that can be exchanged through the flat snapshot form.
pub trait SyncedState: Clone + 'static {
    /// The synchronized fields as a snapshot.
    fn to_snapshot(&self) -> DiagramSnapshot;

    /// A new state of the same shape holding `snapshot`'s content.
    fn with_snapshot(&self, snapshot: &DiagramSnapshot) -> Self;
}

impl SyncedState for DiagramSnapshot {
    fn to_snapshot(&self) -> DiagramSnapshot {
        self.clone()
    }

    fn with_snapshot(&self, snapshot: &DiagramSnapshot) -> Self {
        snapshot.clone()
    }
}

impl SyncedState for NormalizedState {
    fn to_snapshot(&self) -> DiagramSnapshot {
        denormalize(self)
    }

    fn with_snapshot(&self, snapshot: &DiagramSnapshot) -> Self {
        let normalized = normalize(snapshot, self.config());
        if !normalized.issues.is_empty() {
            debug!("normalizing incoming snapshot: {} issues", normalized.issues.len());
        }
        normalized.state
    }
}

/// Who caused a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSource {
    /// An edit made by the user.
    User,
    /// The coordinator mirroring the other container.
    Sync,
    /// A whole document loaded from outside.
    Import,
}

impl WriteSource {
    /// True for writes that belong in the undo history.
    #[must_use]
    pub fn records_history(self) -> bool {
        matches!(self, WriteSource::User | WriteSource::Import)
    }
}

impl fmt::Display for WriteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteSource::User => "user",
            WriteSource::Sync => "sync",
            WriteSource::Import => "import",
        })
    }
}

/// How a write is applied and announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub source: WriteSource,
    /// Commit now instead of waiting for the debounce delay.
    pub immediate: bool,
    /// Listeners should skip user-edit side effects for this change.
    pub silent: bool,
}

impl WriteOptions {
    /// An immediate user edit.
    #[must_use]
    pub const fn user() -> Self {
        Self {
            source: WriteSource::User,
            immediate: true,
            silent: false,
        }
    }

    /// A user edit that waits for the debounce delay (drags, typing).
    #[must_use]
    pub const fn deferred() -> Self {
        Self {
            source: WriteSource::User,
            immediate: false,
            silent: false,
        }
    }

    /// A coordinator write.
    #[must_use]
    pub const fn sync() -> Self {
        Self {
            source: WriteSource::Sync,
            immediate: true,
            silent: true,
        }
    }

    /// A document import.
    #[must_use]
    pub const fn import() -> Self {
        Self {
            source: WriteSource::Import,
            immediate: true,
            silent: false,
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::user()
    }
}

/// A committed change, as seen by listeners.
#[derive(Debug)]
pub struct ChangeEvent<'a, S> {
    pub container: &'static str,
    pub state: &'a S,
    pub source: WriteSource,
    pub silent: bool,
}

type Listener<S> = Rc<dyn Fn(&ChangeEvent<'_, S>)>;

/// Registered listeners of one container.
pub struct ListenerRegistry<S> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, Listener<S>)>>,
}

impl<S> ListenerRegistry<S> {
    fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    fn add(&self, listener: Listener<S>) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn snapshot(&self) -> Vec<Listener<S>> {
        self.listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect()
    }

    fn clear(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        drop(listeners);
    }

    fn len(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener
/// registered; call [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct Subscription<S> {
    id: u64,
    registry: Weak<ListenerRegistry<S>>,
}

impl<S> Subscription<S> {
    /// Removes the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }

    /// True while the listener is registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry
                .listeners
                .borrow()
                .iter()
                .any(|(id, _)| *id == self.id)
        })
    }
}

impl<S> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// One side's state plus its listeners, debounce buffer and undo history.
pub struct Container<S> {
    name: &'static str,
    committed: RefCell<S>,
    pending: RefCell<Option<(S, WriteSource)>>,
    flush_timer: Cell<Option<TimerHandle>>,
    history: RefCell<VecDeque<S>>,
    history_limit: usize,
    debounce_ms: u64,
    writes: Cell<u64>,
    listeners: Rc<ListenerRegistry<S>>,
    timers: Rc<TimerQueue>,
}

/// The application-level design document.
pub type AppContainer = Container<DiagramSnapshot>;

/// The canvas-level editing state.
pub type CanvasContainer = Container<NormalizedState>;

impl<S: SyncedState> Container<S> {
    #[must_use]
    pub fn new(
        name: &'static str,
        initial: S,
        timers: Rc<TimerQueue>,
        debounce_ms: u64,
        history_limit: usize,
    ) -> Rc<Self> {
        Rc::new(Self {
            name,
            committed: RefCell::new(initial),
            pending: RefCell::new(None),
            flush_timer: Cell::new(None),
            history: RefCell::new(VecDeque::new()),
            history_limit,
            debounce_ms,
            writes: Cell::new(0),
            listeners: Rc::new(ListenerRegistry::new()),
            timers,
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The current view: the buffered write if there is one, otherwise the
    /// committed state.
    #[must_use]
    pub fn state(&self) -> S {
        match &*self.pending.borrow() {
            Some((pending, _)) => pending.clone(),
            None => self.committed.borrow().clone(),
        }
    }

    /// The last committed (and announced) state.
    #[must_use]
    pub fn committed(&self) -> S {
        self.committed.borrow().clone()
    }

    /// The committed state's synchronized fields.
    #[must_use]
    pub fn snapshot(&self) -> DiagramSnapshot {
        self.committed.borrow().to_snapshot()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Number of committed writes so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.get()
    }

    /// Undo steps available.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }

    /// Writes a new state.
    pub fn write(self: &Rc<Self>, next: S, options: WriteOptions) {
        if options.immediate {
            let superseded = self.pending.borrow_mut().take();
            self.cancel_flush_timer();
            if superseded.is_some() && options.source == WriteSource::Sync {
                warn!("{}: buffered edit superseded by sync write", self.name);
            }
            self.commit(next, options.source, options.silent);
            return;
        }

        *self.pending.borrow_mut() = Some((next, options.source));
        self.cancel_flush_timer();
        let weak = Rc::downgrade(self);
        let handle = self.timers.schedule(self.debounce_ms, move || {
            if let Some(container) = weak.upgrade() {
                container.flush_timer.set(None);
                container.flush();
            }
        });
        self.flush_timer.set(Some(handle));
    }

    /// Replaces the content with `snapshot`, keeping the state's shape
    /// (for the canvas, its store configuration).
    pub fn write_snapshot(self: &Rc<Self>, snapshot: &DiagramSnapshot, options: WriteOptions) {
        let next = self.committed.borrow().with_snapshot(snapshot);
        self.write(next, options);
    }

    /// Commits a buffered write now. Returns false if nothing was buffered.
    pub fn flush(&self) -> bool {
        let Some((next, source)) = self.pending.borrow_mut().take() else {
            return false;
        };
        self.cancel_flush_timer();
        debug!("{}: flushing buffered write", self.name);
        self.commit(next, source, false);
        true
    }

    /// Steps back to the state before the last user or import write.
    /// Buffered writes are committed first so they can be undone too.
    pub fn undo(&self) -> bool {
        self.flush();
        let Some(previous) = self.history.borrow_mut().pop_back() else {
            return false;
        };
        *self.committed.borrow_mut() = previous.clone();
        self.writes.set(self.writes.get() + 1);
        debug!("{}: undo ({} steps left)", self.name, self.history_len());
        self.notify(&previous, WriteSource::User, false);
        true
    }

    /// Registers a listener for committed changes.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent<'_, S>) + 'static) -> Subscription<S> {
        let id = self.listeners.add(Rc::new(listener));
        Subscription {
            id,
            registry: Rc::downgrade(&self.listeners),
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Removes every listener and drops any buffered write.
    pub fn close(&self) {
        self.listeners.clear();
        self.cancel_flush_timer();
        if self.pending.borrow_mut().take().is_some() {
            debug!("{}: dropped buffered write on close", self.name);
        }
    }

    fn commit(&self, next: S, source: WriteSource, silent: bool) {
        let previous = self.committed.replace(next.clone());
        {
            let mut history = self.history.borrow_mut();
            if source == WriteSource::Sync {
                if !history.is_empty() {
                    debug!("{}: sync write cleared {} undo steps", self.name, history.len());
                    history.clear();
                }
            } else if source.records_history() && self.history_limit > 0 {
                if history.len() == self.history_limit {
                    history.pop_front();
                }
                history.push_back(previous);
            }
        }
        self.writes.set(self.writes.get() + 1);
        self.notify(&next, source, silent);
    }

    fn notify(&self, state: &S, source: WriteSource, silent: bool) {
        let event = ChangeEvent {
            container: self.name,
            state,
            source,
            silent,
        };
        for listener in self.listeners.snapshot() {
            listener(&event);
        }
    }

    fn cancel_flush_timer(&self) {
        if let Some(handle) = self.flush_timer.take() {
            self.timers.cancel(handle);
        }
    }
}

impl CanvasContainer {
    /// Runs a store mutation against the current view and writes the result
    /// if it applied.
    pub fn mutate(
        self: &Rc<Self>,
        options: WriteOptions,
        mutation: impl FnOnce(&NormalizedState) -> MutationResult,
    ) -> MutationResult {
        let base = self.state();
        let result = mutation(&base);
        if result.is_applied() {
            self.write(result.state.clone(), options);
        }
        result
    }
}

impl<S> fmt::Debug for Container<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.name)
            .field("writes", &self.writes.get())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
