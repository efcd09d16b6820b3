//! The canvas service: one object owning both containers, the coordinator
//! and the timer queue for an open diagram.

use archicomm_guard::{GuardStatus, Recommendation};
use archicomm_model::{
    Annotation, Component, Connection, DiagramSnapshot, Entity, EntityPatch,
};
use archicomm_store::{
    normalize, validate_integrity, DanglingPolicy, IntegrityReport, MutationResult,
    NormalizedState, StoreConfig, StoreIssue,
};
use archicomm_types::{Clock, EntityId, SystemClock};
use std::fmt;
use std::rc::Rc;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::container::{
    AppContainer, CanvasContainer, ChangeEvent, Container, Subscription, WriteOptions,
};
use crate::coordinator::{SyncCoordinator, SyncPhase};
use crate::error::SyncResult;
use crate::timer::TimerQueue;

/// Result of [`CanvasService::import_snapshot`].
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// True if the canvas now holds the imported document.
    pub applied: bool,
    /// The validator's verdict on the document.
    pub report: IntegrityReport,
    /// Normalization diagnostics (skipped records, duplicates, ...).
    pub issues: Vec<StoreIssue>,
}

pub struct CanvasService {
    config: SyncConfig,
    timers: Rc<TimerQueue>,
    app: Rc<AppContainer>,
    canvas: Rc<CanvasContainer>,
    coordinator: Rc<SyncCoordinator>,
}

impl CanvasService {
    /// Wires a coordinator between two existing containers.
    #[must_use]
    pub fn new(
        app: Rc<AppContainer>,
        canvas: Rc<CanvasContainer>,
        timers: Rc<TimerQueue>,
        config: SyncConfig,
    ) -> Self {
        let coordinator = SyncCoordinator::new(Rc::clone(&app), Rc::clone(&canvas), Rc::clone(&timers), &config);
        info!("canvas service started ({} entities)", canvas.committed().entity_count());
        Self {
            config,
            timers,
            app,
            canvas,
            coordinator,
        }
    }

    /// Builds both containers from `initial` on the given clock.
    #[must_use]
    pub fn with_clock(config: SyncConfig, clock: Rc<dyn Clock>, initial: DiagramSnapshot) -> Self {
        let timers = Rc::new(TimerQueue::new(clock));
        let normalized = normalize(&initial, &config.store);
        if !normalized.issues.is_empty() {
            warn!("initial document normalized with {} issues", normalized.issues.len());
        }
        let app = Container::new(
            "app",
            initial,
            Rc::clone(&timers),
            config.debounce_ms,
            config.history_limit,
        );
        let canvas = Container::new(
            "canvas",
            normalized.state,
            Rc::clone(&timers),
            config.debounce_ms,
            config.history_limit,
        );
        Self::new(app, canvas, timers, config)
    }

    /// Builds both containers from `initial` on the system clock.
    #[must_use]
    pub fn open(config: SyncConfig, initial: DiagramSnapshot) -> Self {
        Self::with_clock(config, Rc::new(SystemClock), initial)
    }

    // ── Accessors ────────────────────────────────────────────────

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The canvas's current normalized state (including buffered edits).
    #[must_use]
    pub fn state(&self) -> NormalizedState {
        self.canvas.state()
    }

    /// The application container's document.
    #[must_use]
    pub fn document(&self) -> DiagramSnapshot {
        self.app.committed()
    }

    #[must_use]
    pub fn app(&self) -> &Rc<AppContainer> {
        &self.app
    }

    #[must_use]
    pub fn canvas(&self) -> &Rc<CanvasContainer> {
        &self.canvas
    }

    #[must_use]
    pub fn coordinator(&self) -> &Rc<SyncCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn timers(&self) -> &Rc<TimerQueue> {
        &self.timers
    }

    #[must_use]
    pub fn sync_phase(&self) -> SyncPhase {
        self.coordinator.phase()
    }

    // ── Mutations ────────────────────────────────────────────────

    pub fn add_entity(&self, entity: impl Into<Entity>) -> MutationResult {
        let entity = entity.into();
        self.canvas.mutate(WriteOptions::user(), |state| state.add_entity(entity))
    }

    pub fn add_component(&self, component: Component) -> MutationResult {
        self.add_entity(component)
    }

    pub fn add_connection(&self, connection: Connection) -> MutationResult {
        self.add_entity(connection)
    }

    pub fn add_annotation(&self, annotation: Annotation) -> MutationResult {
        self.add_entity(annotation)
    }

    pub fn update_entity(&self, id: &str, patch: impl Into<EntityPatch>) -> MutationResult {
        let patch = patch.into();
        self.canvas
            .mutate(WriteOptions::user(), |state| state.update_entity(id, patch))
    }

    /// Like [`update_entity`](Self::update_entity) but committed after the
    /// debounce delay, for high-frequency edits such as drags.
    pub fn update_entity_deferred(&self, id: &str, patch: impl Into<EntityPatch>) -> MutationResult {
        let patch = patch.into();
        self.canvas
            .mutate(WriteOptions::deferred(), |state| state.update_entity(id, patch))
    }

    pub fn remove_entity(&self, id: &str) -> MutationResult {
        self.canvas
            .mutate(WriteOptions::user(), |state| state.remove_entity(id))
    }

    pub fn batch_update<I>(&self, updates: I) -> MutationResult
    where
        I: IntoIterator<Item = (EntityId, EntityPatch)>,
    {
        self.canvas
            .mutate(WriteOptions::user(), |state| state.batch_update(updates))
    }

    /// Steps the canvas back one user edit.
    pub fn undo(&self) -> bool {
        self.canvas.undo()
    }

    /// Commits buffered edits on both containers.
    pub fn flush(&self) {
        self.coordinator.flush_containers();
    }

    // ── Import ───────────────────────────────────────────────────

    /// Validates an external document and, if it is sound, replaces the
    /// canvas with it. A document that fails validation changes nothing.
    pub fn import_snapshot(&self, snapshot: &DiagramSnapshot) -> ImportOutcome {
        let inspect = StoreConfig {
            dangling_connections: DanglingPolicy::Retain,
            ..self.config.store.clone()
        };
        let candidate = normalize(snapshot, &inspect);
        let report = validate_integrity(&candidate.state);
        if !report.valid {
            warn!("import rejected: {} integrity errors", report.errors.len());
            return ImportOutcome {
                applied: false,
                report,
                issues: candidate.issues,
            };
        }

        let accepted = normalize(snapshot, &self.config.store);
        self.canvas.write(accepted.state, WriteOptions::import());
        info!("imported document ({} entities)", snapshot.len());
        ImportOutcome {
            applied: true,
            report,
            issues: candidate.issues,
        }
    }

    /// Parses a JSON document and imports it.
    pub fn import_json(&self, json: &str) -> SyncResult<ImportOutcome> {
        let snapshot = DiagramSnapshot::from_json(json)?;
        Ok(self.import_snapshot(&snapshot))
    }

    /// The application document as JSON.
    pub fn export_json(&self) -> SyncResult<String> {
        Ok(self.document().to_json()?)
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Registers a listener for every change of the synchronized state,
    /// whichever side it came from.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ChangeEvent<'_, NormalizedState>) + 'static,
    ) -> Subscription<NormalizedState> {
        self.canvas.subscribe(listener)
    }

    // ── Guard ────────────────────────────────────────────────────

    /// Feeds a render-timing sample from the UI layer.
    pub fn record_render(&self, subject: &str, props_fingerprint: &str, state_fingerprint: &str) -> Recommendation {
        self.coordinator
            .record_render(subject, props_fingerprint, state_fingerprint)
    }

    /// Resumes propagation after a freeze.
    pub fn resume(&self) -> GuardStatus {
        self.coordinator.resume()
    }

    /// Read-only breaker status for display.
    #[must_use]
    pub fn breaker_status(&self) -> GuardStatus {
        self.coordinator.status()
    }

    /// Runs due timers (debounce flushes, cooldowns, after-render tasks).
    pub fn run_timers(&self) -> usize {
        self.timers.run_due()
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Commits buffered edits, then unsubscribes every listener and cancels
    /// every timer.
    pub fn destroy(&self) {
        if !self.coordinator.is_active() {
            return;
        }
        self.coordinator.flush_containers();
        self.coordinator.destroy();
        self.app.close();
        self.canvas.close();
        self.timers.clear();
        info!("canvas service destroyed");
    }
}

impl fmt::Debug for CanvasService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasService")
            .field("app", &self.app)
            .field("canvas", &self.canvas)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
