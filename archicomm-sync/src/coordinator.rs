//! The sync coordinator.
//!
//! Keeps the application container and the canvas container holding the
//! same diagram. A change on one side is fingerprinted; if the other side
//! already matches, nothing happens. Otherwise the change is written into
//! the other side as a silent sync write while the coordinator's phase says
//! which side it is syncing from. The notification that write produces is
//! recognized as an echo by the phase and dropped, so a sync write can never
//! trigger another one. If the canvas stores a different form than it was
//! given (normalizing drops dangling connections and repeated ids), that
//! form is mirrored back into the application in the same cycle.
//!
//! Every propagation is also reported to the [`StabilityGuard`]. When the
//! guard recommends freezing, buffered writes on both sides are flushed and
//! propagation stops; changes made while paused mark their side dirty, and
//! the newest dirty side is propagated on resume.

use archicomm_guard::{GuardStatus, Observation, Recommendation, StabilityGuard};
use archicomm_types::Clock;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::container::{AppContainer, CanvasContainer, ChangeEvent, Subscription, WriteOptions, WriteSource};
use crate::fingerprint::Fingerprint;
use crate::timer::{TimerHandle, TimerQueue};
use archicomm_model::DiagramSnapshot;
use archicomm_store::NormalizedState;

/// One of the two synchronized containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    App,
    Canvas,
}

impl Side {
    #[must_use]
    pub fn other(self) -> Side {
        match self {
            Side::App => Side::Canvas,
            Side::Canvas => Side::App,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Side::App => "app",
            Side::Canvas => "canvas",
        }
    }

    fn syncing_phase(self) -> SyncPhase {
        match self {
            Side::App => SyncPhase::SyncingFromApp,
            Side::Canvas => SyncPhase::SyncingFromCanvas,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the coordinator is doing right now. At most one direction can be
/// in flight at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    /// Writing the application state into the canvas.
    SyncingFromApp,
    /// Writing the canvas state into the application.
    SyncingFromCanvas,
}

impl SyncPhase {
    /// The side being written into, if any.
    #[must_use]
    pub fn target(self) -> Option<Side> {
        match self {
            SyncPhase::Idle => None,
            SyncPhase::SyncingFromApp => Some(Side::Canvas),
            SyncPhase::SyncingFromCanvas => Some(Side::App),
        }
    }
}

/// Result of handling one change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The change was written into the other side.
    Propagated,
    /// Both sides already matched.
    AlreadyConsistent,
    /// The notification was the coordinator's own write coming back.
    EchoSuppressed,
    /// Propagation is paused; the side was marked dirty.
    Deferred,
    /// The guard froze propagation on this change.
    Frozen { reason: String },
    /// A change arrived mid-propagation; it will be re-evaluated afterwards.
    Reentrant,
    /// The coordinator has been destroyed.
    Inactive,
}

#[derive(Debug, Clone, Default)]
struct FingerprintCache {
    app: Option<Fingerprint>,
    canvas: Option<Fingerprint>,
}

pub struct SyncCoordinator {
    app: Rc<AppContainer>,
    canvas: Rc<CanvasContainer>,
    timers: Rc<TimerQueue>,
    clock: Rc<dyn Clock>,
    subject: String,
    phase: Cell<SyncPhase>,
    cache: RefCell<FingerprintCache>,
    guard: RefCell<StabilityGuard>,
    dirty: Cell<Option<Side>>,
    recheck: Cell<Option<Side>>,
    propagations: Cell<u64>,
    cooldown_timer: Cell<Option<TimerHandle>>,
    app_subscription: RefCell<Option<Subscription<DiagramSnapshot>>>,
    canvas_subscription: RefCell<Option<Subscription<NormalizedState>>>,
    destroyed: Cell<bool>,
}

impl SyncCoordinator {
    /// Creates a coordinator and subscribes it to both containers. If the
    /// containers disagree at this point the application side wins.
    #[must_use]
    pub fn new(
        app: Rc<AppContainer>,
        canvas: Rc<CanvasContainer>,
        timers: Rc<TimerQueue>,
        config: &SyncConfig,
    ) -> Rc<Self> {
        let clock = timers.clock();
        let coordinator = Rc::new(Self {
            app,
            canvas,
            timers,
            clock,
            subject: config.subject.clone(),
            phase: Cell::new(SyncPhase::Idle),
            cache: RefCell::new(FingerprintCache::default()),
            guard: RefCell::new(StabilityGuard::new(config.guard.clone())),
            dirty: Cell::new(None),
            recheck: Cell::new(None),
            propagations: Cell::new(0),
            cooldown_timer: Cell::new(None),
            app_subscription: RefCell::new(None),
            canvas_subscription: RefCell::new(None),
            destroyed: Cell::new(false),
        });
        coordinator.attach();
        coordinator.reconcile();
        coordinator
    }

    fn attach(self: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let app_subscription = self.app.subscribe(move |event: &ChangeEvent<'_, DiagramSnapshot>| {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.on_change(Side::App, event.source);
            }
        });
        let weak: Weak<Self> = Rc::downgrade(self);
        let canvas_subscription = self.canvas.subscribe(move |event: &ChangeEvent<'_, NormalizedState>| {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.on_change(Side::Canvas, event.source);
            }
        });
        *self.app_subscription.borrow_mut() = Some(app_subscription);
        *self.canvas_subscription.borrow_mut() = Some(canvas_subscription);
    }

    fn reconcile(self: &Rc<Self>) {
        let app = self.fingerprint(Side::App);
        let canvas = self.fingerprint(Side::Canvas);
        if app == canvas {
            self.remember(app);
            return;
        }
        info!("containers disagree at start, loading canvas from app");
        self.write_across(Side::App, app);
    }

    // ── Accessors ────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.phase.get()
    }

    /// Sync writes performed so far.
    #[must_use]
    pub fn propagation_count(&self) -> u64 {
        self.propagations.get()
    }

    /// The last fingerprints the coordinator recorded for (app, canvas).
    #[must_use]
    pub fn cached_fingerprints(&self) -> (Option<Fingerprint>, Option<Fingerprint>) {
        let cache = self.cache.borrow();
        (cache.app.clone(), cache.canvas.clone())
    }

    /// The side whose changes are waiting for a resume.
    #[must_use]
    pub fn dirty_side(&self) -> Option<Side> {
        self.dirty.get()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.guard.borrow().is_open()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.destroyed.get()
    }

    #[must_use]
    pub fn status(&self) -> GuardStatus {
        self.guard.borrow().status(self.clock.now())
    }

    // ── Change handling ──────────────────────────────────────────

    /// Handles a committed change on `origin`.
    pub fn on_change(self: &Rc<Self>, origin: Side, source: WriteSource) -> SyncOutcome {
        if self.destroyed.get() {
            return SyncOutcome::Inactive;
        }

        let phase = self.phase.get();
        if let Some(target) = phase.target() {
            if origin == target && source == WriteSource::Sync {
                debug!("echo from {origin} suppressed");
                return SyncOutcome::EchoSuppressed;
            }
            // A listener wrote to a container while a sync write was in
            // flight. Never nest; look at it again once this one finishes.
            error!("reentrant {source} change on {origin} during {phase:?}");
            self.recheck.set(Some(origin));
            return SyncOutcome::Reentrant;
        }

        let outcome = self.propagate_from(origin);
        let mut rechecked = false;
        while let Some(side) = self.recheck.take() {
            if rechecked {
                error!("repeated reentrant change on {side}, not re-evaluating again");
                break;
            }
            rechecked = true;
            self.propagate_from(side);
        }
        outcome
    }

    fn propagate_from(self: &Rc<Self>, origin: Side) -> SyncOutcome {
        if self.guard.borrow().is_open() {
            debug!("paused: {origin} marked dirty");
            self.dirty.set(Some(origin));
            return SyncOutcome::Deferred;
        }

        let source = self.fingerprint(origin);
        let target = self.fingerprint(origin.other());
        if source == target {
            debug!("{origin} change already consistent ({source})");
            self.remember(source);
            return SyncOutcome::AlreadyConsistent;
        }

        let observation = Observation::new(origin.as_str(), source.as_str());
        let recommendation = self
            .guard
            .borrow_mut()
            .observe(&self.subject, observation, self.clock.now());
        if let Recommendation::Freeze { reason } = recommendation {
            self.freeze(origin, &reason);
            return SyncOutcome::Frozen { reason };
        }

        self.write_across(origin, source);
        SyncOutcome::Propagated
    }

    fn write_across(self: &Rc<Self>, origin: Side, fingerprint: Fingerprint) {
        self.phase.set(origin.syncing_phase());
        match origin {
            Side::App => {
                let snapshot = self.app.snapshot();
                self.canvas.write_snapshot(&snapshot, WriteOptions::sync());
            }
            Side::Canvas => {
                let snapshot = self.canvas.snapshot();
                self.app.write_snapshot(&snapshot, WriteOptions::sync());
            }
        }
        self.phase.set(SyncPhase::Idle);
        self.propagations.set(self.propagations.get() + 1);
        debug!("propagated {origin} -> {} ({fingerprint})", origin.other());

        let written = self.fingerprint(origin.other());
        if written != fingerprint && !fingerprint.is_fallback() && self.recheck.get().is_none() {
            self.write_back(origin, &written);
        }
        self.remember_both();
    }

    /// The target stored something other than what was written (the canvas
    /// drops dangling connections and duplicate ids while normalizing).
    /// Mirrors the stored form back so both sides hold the same content.
    fn write_back(self: &Rc<Self>, origin: Side, written: &Fingerprint) {
        let target = origin.other();
        warn!("{target} rewrote content from {origin}, writing {written} back");
        self.phase.set(target.syncing_phase());
        match target {
            Side::App => {
                let snapshot = self.app.snapshot();
                self.canvas.write_snapshot(&snapshot, WriteOptions::sync());
            }
            Side::Canvas => {
                let snapshot = self.canvas.snapshot();
                self.app.write_snapshot(&snapshot, WriteOptions::sync());
            }
        }
        self.phase.set(SyncPhase::Idle);
    }

    fn freeze(self: &Rc<Self>, origin: Side, reason: &str) {
        warn!("propagation paused: {reason}");
        self.dirty.set(Some(origin));
        // Commit buffered edits so nothing is lost while paused. Their
        // notifications arrive here and only mark sides dirty.
        self.flush_containers();
        self.schedule_cooldown();
    }

    /// Commits buffered writes on both containers.
    pub fn flush_containers(&self) {
        self.app.flush();
        self.canvas.flush();
    }

    fn schedule_cooldown(self: &Rc<Self>) {
        let deadline = self.guard.borrow().cooldown_deadline();
        let Some(deadline) = deadline else {
            return;
        };
        if let Some(previous) = self.cooldown_timer.take() {
            self.timers.cancel(previous);
        }
        let delay = deadline.saturating_since(self.clock.now());
        let weak = Rc::downgrade(self);
        let handle = self.timers.schedule(delay, move || {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.cooldown_elapsed();
            }
        });
        self.cooldown_timer.set(Some(handle));
    }

    fn cooldown_elapsed(self: &Rc<Self>) {
        self.cooldown_timer.set(None);
        let closed = {
            let mut guard = self.guard.borrow_mut();
            guard.poll(self.clock.now());
            !guard.is_open()
        };
        if closed {
            info!("rate breaker cooled down, propagation resumed");
            self.propagate_dirty();
        }
    }

    /// Clears the guard and, if it is now closed, propagates whatever
    /// changed while paused.
    pub fn resume(self: &Rc<Self>) -> GuardStatus {
        let now = self.clock.now();
        let closed = self.guard.borrow_mut().resume(now);
        if closed {
            self.propagate_dirty();
        } else {
            info!("resume requested but the rate breaker is still open");
            self.schedule_cooldown();
        }
        self.status()
    }

    fn propagate_dirty(self: &Rc<Self>) {
        if let Some(side) = self.dirty.take() {
            debug!("propagating changes held while paused ({side})");
            self.on_change(side, WriteSource::User);
        }
    }

    /// Feeds a render-timing signal for `subject` to the guard. A freeze
    /// takes effect at once; the flush of buffered writes waits until after
    /// the current render.
    pub fn record_render(
        self: &Rc<Self>,
        subject: &str,
        props_fingerprint: &str,
        state_fingerprint: &str,
    ) -> Recommendation {
        let observation = Observation::new(props_fingerprint, state_fingerprint);
        let recommendation = self
            .guard
            .borrow_mut()
            .observe(subject, observation, self.clock.now());
        if recommendation.is_freeze() {
            warn!("render guard froze {subject}");
            let weak = Rc::downgrade(self);
            self.timers.schedule_after_render(move || {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.flush_containers();
                }
            });
            self.schedule_cooldown();
        }
        recommendation
    }

    /// Opens the rate breaker on behalf of an outside component.
    pub fn trip_breaker(self: &Rc<Self>, reason: &str) {
        self.guard.borrow_mut().trip_breaker(reason, self.clock.now());
        self.flush_containers();
        self.schedule_cooldown();
    }

    /// Unsubscribes from both containers and cancels the cooldown timer.
    /// Further notifications are ignored.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        if let Some(subscription) = self.app_subscription.borrow_mut().take() {
            subscription.unsubscribe();
        }
        if let Some(subscription) = self.canvas_subscription.borrow_mut().take() {
            subscription.unsubscribe();
        }
        if let Some(handle) = self.cooldown_timer.take() {
            self.timers.cancel(handle);
        }
        self.guard.borrow_mut().clear();
        self.dirty.set(None);
        info!("sync coordinator destroyed");
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn fingerprint(&self, side: Side) -> Fingerprint {
        let snapshot = match side {
            Side::App => self.app.snapshot(),
            Side::Canvas => self.canvas.snapshot(),
        };
        Fingerprint::of_snapshot(&snapshot)
    }

    fn remember(&self, fingerprint: Fingerprint) {
        let mut cache = self.cache.borrow_mut();
        cache.app = Some(fingerprint.clone());
        cache.canvas = Some(fingerprint);
    }

    fn remember_both(&self) {
        let app = self.fingerprint(Side::App);
        let canvas = self.fingerprint(Side::Canvas);
        if app != canvas {
            debug!("containers differ until the pending recheck ({app} vs {canvas})");
        }
        let mut cache = self.cache.borrow_mut();
        cache.app = Some(app);
        cache.canvas = Some(canvas);
    }
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("phase", &self.phase.get())
            .field("propagations", &self.propagations.get())
            .field("dirty", &self.dirty.get())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}
