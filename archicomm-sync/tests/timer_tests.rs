use archicomm_sync::TimerQueue;
use archicomm_types::{ManualClock, Timestamp};
use std::cell::RefCell;
use std::rc::Rc;

fn queue() -> (Rc<TimerQueue>, ManualClock) {
    let clock = ManualClock::new(Timestamp::from_millis(10_000));
    (Rc::new(TimerQueue::new(Rc::new(clock.clone()))), clock)
}

fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let make = move |name: &'static str| {
        let sink = Rc::clone(&sink);
        Box::new(move || sink.borrow_mut().push(name)) as Box<dyn FnOnce()>
    };
    (log, make)
}

// ── Scheduling ───────────────────────────────────────────────────

#[test]
fn tasks_run_only_when_due() {
    let (timers, clock) = queue();
    let (log, task) = recorder();
    timers.schedule(100, task("late"));
    timers.schedule(10, task("early"));

    assert_eq!(timers.run_due(), 0);
    assert_eq!(timers.next_deadline(), Some(Timestamp::from_millis(10_010)));

    clock.advance(10);
    assert_eq!(timers.run_due(), 1);
    clock.advance(90);
    assert_eq!(timers.run_due(), 1);
    assert_eq!(*log.borrow(), vec!["early", "late"]);
    assert!(timers.is_empty());
}

#[test]
fn same_deadline_runs_in_schedule_order() {
    let (timers, clock) = queue();
    let (log, task) = recorder();
    timers.schedule(5, task("a"));
    timers.schedule(5, task("b"));
    timers.schedule(5, task("c"));
    clock.advance(5);
    assert_eq!(timers.run_due(), 3);
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn cancel_prevents_run() {
    let (timers, clock) = queue();
    let (log, task) = recorder();
    let keep = timers.schedule(1, task("keep"));
    let drop = timers.schedule(1, task("drop"));

    assert!(timers.cancel(drop));
    assert!(!timers.cancel(drop));
    assert!(timers.is_scheduled(keep));
    assert!(!timers.is_scheduled(drop));

    clock.advance(1);
    timers.run_due();
    assert_eq!(*log.borrow(), vec!["keep"]);
    assert!(!timers.cancel(keep));
}

// ── After render ─────────────────────────────────────────────────

#[test]
fn after_render_task_waits_for_next_pass() {
    let (timers, _clock) = queue();
    let (log, task) = recorder();
    let inner = Rc::clone(&timers);
    let follow_up = task("follow-up");
    timers.schedule_after_render(move || {
        inner.schedule_after_render(follow_up);
    });
    timers.schedule_after_render(task("first"));

    assert_eq!(timers.run_due(), 2);
    assert_eq!(*log.borrow(), vec!["first"]);
    assert_eq!(timers.len(), 1);

    assert_eq!(timers.run_due(), 1);
    assert_eq!(*log.borrow(), vec!["first", "follow-up"]);
}

#[test]
fn clear_drops_everything() {
    let (timers, clock) = queue();
    let (log, task) = recorder();
    timers.schedule(0, task("a"));
    timers.schedule(50, task("b"));
    timers.clear();
    clock.advance(100);
    assert_eq!(timers.run_due(), 0);
    assert!(log.borrow().is_empty());
}
