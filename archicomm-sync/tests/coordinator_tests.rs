use archicomm_guard::{BreakerConfig, GuardConfig};
use archicomm_model::{Component, ComponentPatch, ComponentType, Connection, ConnectionType, DiagramSnapshot};
use archicomm_store::NormalizedState;
use archicomm_sync::{
    AppContainer, CanvasContainer, Container, Fingerprint, Side, SyncConfig, SyncCoordinator,
    SyncOutcome, SyncPhase, TimerQueue, WriteOptions, WriteSource,
};
use archicomm_types::{ManualClock, Timestamp};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Harness {
    clock: ManualClock,
    timers: Rc<TimerQueue>,
    app: Rc<AppContainer>,
    canvas: Rc<CanvasContainer>,
    coordinator: Rc<SyncCoordinator>,
}

fn harness_with(config: SyncConfig, initial: DiagramSnapshot) -> Harness {
    init_tracing();
    let clock = ManualClock::new(Timestamp::from_millis(1_000_000));
    let timers = Rc::new(TimerQueue::new(Rc::new(clock.clone())));
    let app = Container::new("app", initial, Rc::clone(&timers), config.debounce_ms, config.history_limit);
    let canvas = Container::new(
        "canvas",
        NormalizedState::new(config.store.clone()),
        Rc::clone(&timers),
        config.debounce_ms,
        config.history_limit,
    );
    let coordinator = SyncCoordinator::new(Rc::clone(&app), Rc::clone(&canvas), Rc::clone(&timers), &config);
    Harness {
        clock,
        timers,
        app,
        canvas,
        coordinator,
    }
}

fn harness() -> Harness {
    harness_with(SyncConfig::default(), DiagramSnapshot::new())
}

fn labeled(label: &str) -> DiagramSnapshot {
    DiagramSnapshot {
        components: vec![Component::new("c", ComponentType::Service, label)],
        ..DiagramSnapshot::default()
    }
}

fn add_to_canvas(h: &Harness, id: &str) {
    h.canvas.mutate(WriteOptions::user(), |state| {
        state.add_component(Component::new(id, ComponentType::Server, id))
    });
}

// ── Propagation ──────────────────────────────────────────────────

#[test]
fn app_edit_reaches_canvas() {
    let h = harness();
    h.app.write(labeled("API"), WriteOptions::user());

    assert_eq!(h.canvas.snapshot(), labeled("API"));
    assert_eq!(h.coordinator.propagation_count(), 1);

    let expected = Fingerprint::of_snapshot(&labeled("API"));
    assert_eq!(
        h.coordinator.cached_fingerprints(),
        (Some(expected.clone()), Some(expected))
    );
}

#[test]
fn canvas_edit_reaches_app() {
    let h = harness();
    add_to_canvas(&h, "db");

    assert_eq!(h.app.committed().components.len(), 1);
    assert_eq!(h.app.snapshot(), h.canvas.snapshot());
    assert_eq!(h.coordinator.propagation_count(), 1);
}

#[test]
fn startup_loads_canvas_from_app() {
    let h = harness_with(SyncConfig::default(), labeled("Existing"));
    assert_eq!(h.canvas.snapshot(), labeled("Existing"));
    assert_eq!(h.coordinator.propagation_count(), 1);
}

#[test]
fn sync_writes_are_silent_and_not_undoable() {
    let h = harness();
    h.app.write(labeled("API"), WriteOptions::user());
    assert_eq!(h.canvas.history_len(), 0);
    assert!(!h.canvas.undo());
}

#[test]
fn canvas_normalization_is_mirrored_back_to_app() {
    let h = harness();
    let with_dangling = DiagramSnapshot {
        components: vec![Component::new("c1", ComponentType::Server, "c1")],
        connections: vec![Connection::new("e1", "c1", "gone", ConnectionType::Sync)],
        ..DiagramSnapshot::default()
    };
    h.app.write(with_dangling, WriteOptions::user());

    assert!(h.canvas.snapshot().connections.is_empty());
    assert_eq!(h.app.snapshot(), h.canvas.snapshot());
    assert_eq!(h.coordinator.propagation_count(), 1);
    assert_eq!(h.coordinator.phase(), SyncPhase::Idle);

    let settled = Fingerprint::of_snapshot(&h.canvas.snapshot());
    assert_eq!(
        h.coordinator.cached_fingerprints(),
        (Some(settled.clone()), Some(settled))
    );

    // The write-back replaced the raw version; undo cannot bring it back.
    assert_eq!(h.app.history_len(), 0);
    assert!(!h.app.undo());
}

#[test]
fn repeated_ids_from_app_settle_on_both_sides() {
    let h = harness();
    let repeated = DiagramSnapshot {
        components: vec![
            Component::new("c", ComponentType::Service, "first"),
            Component::new("c", ComponentType::Service, "second"),
        ],
        ..DiagramSnapshot::default()
    };
    h.app.write(repeated, WriteOptions::user());

    assert_eq!(h.app.snapshot(), labeled("second"));
    assert_eq!(h.canvas.snapshot(), labeled("second"));

    // A later edit compares against the settled content, not the raw write.
    h.clock.advance(100);
    h.app.write(labeled("third"), WriteOptions::user());
    assert_eq!(h.canvas.snapshot(), labeled("third"));
    assert_eq!(h.coordinator.propagation_count(), 2);
}

// ── Loop freedom ─────────────────────────────────────────────────

#[test]
fn echo_never_writes_back() {
    let h = harness();
    h.app.write(labeled("API"), WriteOptions::user());

    assert_eq!(h.app.write_count(), 1);
    assert_eq!(h.canvas.write_count(), 1);
    assert_eq!(h.coordinator.phase(), SyncPhase::Idle);
}

#[test]
fn same_edit_on_both_sides_propagates_once() {
    let h = harness();
    h.app.write(labeled("API"), WriteOptions::user());
    h.canvas.write_snapshot(&labeled("API"), WriteOptions::user());

    assert_eq!(h.coordinator.propagation_count(), 1);
    assert_eq!(
        h.coordinator.on_change(Side::Canvas, WriteSource::User),
        SyncOutcome::AlreadyConsistent
    );
}

#[test]
fn phase_names_exactly_one_direction() {
    let h = harness();
    let seen: Rc<RefCell<Vec<(&'static str, WriteSource, SyncPhase)>>> = Rc::new(RefCell::new(Vec::new()));

    let weak = Rc::downgrade(&h.coordinator);
    let sink = Rc::clone(&seen);
    let _app = h.app.subscribe(move |event| {
        let phase = weak.upgrade().map_or(SyncPhase::Idle, |c| c.phase());
        sink.borrow_mut().push((event.container, event.source, phase));
    });
    let weak = Rc::downgrade(&h.coordinator);
    let sink = Rc::clone(&seen);
    let _canvas = h.canvas.subscribe(move |event| {
        let phase = weak.upgrade().map_or(SyncPhase::Idle, |c| c.phase());
        sink.borrow_mut().push((event.container, event.source, phase));
    });

    h.app.write(labeled("API"), WriteOptions::user());
    add_to_canvas(&h, "db");

    assert_eq!(
        *seen.borrow(),
        vec![
            ("canvas", WriteSource::Sync, SyncPhase::SyncingFromApp),
            ("app", WriteSource::User, SyncPhase::Idle),
            ("app", WriteSource::Sync, SyncPhase::SyncingFromCanvas),
            ("canvas", WriteSource::User, SyncPhase::Idle),
        ]
    );
}

#[test]
fn reentrant_write_is_reevaluated_once() {
    let h = harness();
    let fired = Rc::new(Cell::new(false));
    let app = Rc::clone(&h.app);
    let flag = Rc::clone(&fired);
    let _misbehaving = h.canvas.subscribe(move |event| {
        if event.source == WriteSource::Sync && !flag.replace(true) {
            app.write(labeled("Rewritten"), WriteOptions::user());
        }
    });

    h.app.write(labeled("API"), WriteOptions::user());

    assert!(fired.get());
    assert_eq!(h.coordinator.propagation_count(), 2);
    assert_eq!(h.app.snapshot(), labeled("Rewritten"));
    assert_eq!(h.canvas.snapshot(), labeled("Rewritten"));
    assert_eq!(h.coordinator.phase(), SyncPhase::Idle);
}

// ── Stability guard ──────────────────────────────────────────────

#[test]
fn oscillation_freezes_and_flushes_buffers() {
    let h = harness();
    for (i, label) in ["A", "B", "A"].into_iter().enumerate() {
        if i > 0 {
            h.clock.advance(5);
        }
        h.app.write(labeled(label), WriteOptions::user());
    }
    assert_eq!(h.coordinator.propagation_count(), 3);

    h.canvas.mutate(WriteOptions::deferred(), |state| {
        state.update_entity("c", ComponentPatch::moved_to(50.0, 50.0))
    });
    assert!(h.canvas.has_pending());

    h.clock.advance(5);
    h.app.write(labeled("B"), WriteOptions::user());

    assert_eq!(h.coordinator.propagation_count(), 3);
    assert!(h.coordinator.is_paused());
    assert!(!h.canvas.has_pending());
    let moved = h.canvas.committed().component("c").cloned().unwrap();
    assert_eq!((moved.label.as_str(), moved.position.x), ("A", 50.0));
    assert_eq!(h.coordinator.dirty_side(), Some(Side::Canvas));
    assert_eq!(h.app.snapshot(), labeled("B"));

    let status = h.coordinator.status();
    assert!(status.open);
    assert!(status.reason.unwrap().contains("oscillating"));

    let status = h.coordinator.resume();
    assert!(!status.open);
    assert_eq!(h.coordinator.propagation_count(), 4);
    assert_eq!(h.app.snapshot(), h.canvas.snapshot());
    assert_eq!(h.app.committed().components[0].position.x, 50.0);
}

#[test]
fn edits_while_frozen_only_mark_dirty() {
    let h = harness();
    h.coordinator.trip_breaker("storage backlog");
    add_to_canvas(&h, "db");

    assert!(h.app.committed().is_empty());
    assert_eq!(h.coordinator.dirty_side(), Some(Side::Canvas));
    assert_eq!(
        h.coordinator.on_change(Side::Canvas, WriteSource::User),
        SyncOutcome::Deferred
    );
    assert_eq!(h.coordinator.status().reason.as_deref(), Some("storage backlog"));
}

#[test]
fn breaker_closes_after_cooldown_and_propagates() {
    let config = SyncConfig {
        guard: GuardConfig {
            breaker: BreakerConfig {
                window_ms: 1_000,
                max_updates: 3,
                cooldown_ms: 500,
            },
            ..GuardConfig::default()
        },
        ..SyncConfig::default()
    };
    let h = harness_with(config, DiagramSnapshot::new());

    for label in ["L0", "L1", "L2", "L3"] {
        h.app.write(labeled(label), WriteOptions::user());
        h.clock.advance(10);
    }
    assert_eq!(h.coordinator.propagation_count(), 3);
    assert_eq!(h.canvas.snapshot(), labeled("L2"));
    assert!(h.coordinator.status().reason.unwrap().contains("updates within"));

    // The breaker ignores resume until its cooldown is over.
    assert!(h.coordinator.resume().open);

    h.clock.advance(500);
    h.timers.run_due();
    assert!(!h.coordinator.is_paused());
    assert_eq!(h.coordinator.propagation_count(), 4);
    assert_eq!(h.canvas.snapshot(), labeled("L3"));
}

#[test]
fn tripped_breaker_recovers_on_timer() {
    let h = harness();
    h.coordinator.trip_breaker("storage backlog");
    add_to_canvas(&h, "db");
    assert!(h.app.committed().is_empty());

    h.clock.advance(GuardConfig::default().breaker.cooldown_ms);
    h.timers.run_due();
    assert_eq!(h.app.snapshot(), h.canvas.snapshot());
    assert_eq!(h.coordinator.dirty_side(), None);
}

// ── Teardown ─────────────────────────────────────────────────────

#[test]
fn destroy_detaches_from_both_containers() {
    let h = harness();
    h.coordinator.destroy();

    assert!(!h.coordinator.is_active());
    assert_eq!(h.app.listener_count(), 0);
    assert_eq!(h.canvas.listener_count(), 0);

    h.app.write(labeled("API"), WriteOptions::user());
    assert!(h.canvas.committed().components().is_empty());
    assert_eq!(
        h.coordinator.on_change(Side::App, WriteSource::User),
        SyncOutcome::Inactive
    );
}

// ── Convergence ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn sides_converge_after_every_edit(edits in prop::collection::vec(any::<bool>(), 1..20)) {
        let h = harness();
        for (n, from_app) in edits.iter().enumerate() {
            h.clock.advance(100);
            let id = format!("c{n}");
            if *from_app {
                let mut doc = h.app.committed();
                doc.components.push(Component::new(id.as_str(), ComponentType::Service, id.as_str()));
                h.app.write(doc, WriteOptions::user());
            } else {
                add_to_canvas(&h, &id);
            }
            prop_assert_eq!(h.app.snapshot(), h.canvas.snapshot());
            prop_assert_eq!(h.coordinator.propagation_count(), n as u64 + 1);
            prop_assert_eq!(h.coordinator.phase(), SyncPhase::Idle);
        }
    }
}
