//! End-to-end replays of the task lifecycle scenarios this crate's Task
//! state machine was modeled on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use task_core::callback::Callback;
use task_core::error::{Status, StatusCode};
use task_core::task::{Phase, Task};

fn counting_callback(counter: &Arc<AtomicUsize>) -> Callback {
	let counter = Arc::clone(counter);

	Callback::new(move || {
		counter.fetch_add(1, Ordering::SeqCst);
		Status::ok()
	})
}

/// Scenario 1: a task that starts, runs, and finishes `Ok` fires
/// `on_finished` exactly once and never fires `on_cancelled`.
#[test]
fn scenario_normal_completion() {
	let task = Arc::new(Task::new());
	let cancelled = Arc::new(AtomicUsize::new(0));
	let finished = Arc::new(AtomicUsize::new(0));

	task.on_cancelled(counting_callback(&cancelled));
	task.on_finished(counting_callback(&finished));

	assert_eq!(task.phase(), Phase::Ready);
	assert!(task.start());
	assert_eq!(task.phase(), Phase::Running);

	task.finish_ok();

	assert_eq!(task.phase(), Phase::Done);
	assert!(task.status().is_ok());
	assert_eq!(cancelled.load(Ordering::SeqCst), 0);
	assert_eq!(finished.load(Ordering::SeqCst), 1);
}

/// Scenario 2: cancelling a task before it starts skips `Running` entirely
/// and resolves straight to `Done` with `CANCELLED`.
#[test]
fn scenario_pre_start_cancel() {
	let task = Arc::new(Task::new());
	let cancelled = Arc::new(AtomicUsize::new(0));
	let finished = Arc::new(AtomicUsize::new(0));

	task.on_cancelled(counting_callback(&cancelled));
	task.on_finished(counting_callback(&finished));

	task.cancel();
	assert_eq!(task.phase(), Phase::Unstarted);

	let started = task.start();

	assert!(!started);
	assert_eq!(task.phase(), Phase::Done);
	assert_eq!(task.status().code(), StatusCode::Cancelled);
	assert_eq!(cancelled.load(Ordering::SeqCst), 1);
	assert_eq!(finished.load(Ordering::SeqCst), 1);
}

/// Scenario 3: cancelling a running task moves it to `Cancelling`,
/// firing `on_cancelled` immediately; the caller still has to drive it to
/// `Done` explicitly.
#[test]
fn scenario_in_flight_cancel() {
	let task = Arc::new(Task::new());
	let cancelled = Arc::new(AtomicUsize::new(0));
	let finished = Arc::new(AtomicUsize::new(0));

	task.on_cancelled(counting_callback(&cancelled));
	task.on_finished(counting_callback(&finished));

	assert!(task.start());
	task.cancel();

	assert_eq!(task.phase(), Phase::Cancelling);
	assert_eq!(cancelled.load(Ordering::SeqCst), 1);
	assert_eq!(finished.load(Ordering::SeqCst), 0);

	task.finish_cancel();

	assert_eq!(task.phase(), Phase::Done);
	assert_eq!(task.status().code(), StatusCode::Cancelled);
	assert_eq!(finished.load(Ordering::SeqCst), 1);
}

/// Scenario 4: expiring before start resolves to `DEADLINE_EXCEEDED`
/// instead of `CANCELLED`.
#[test]
fn scenario_pre_start_expire() {
	let task = Arc::new(Task::new());

	task.expire();
	assert_eq!(task.phase(), Phase::Unstarted);

	assert!(!task.start());
	assert_eq!(task.phase(), Phase::Done);
	assert_eq!(task.status().code(), StatusCode::DeadlineExceeded);
}

/// Scenario 5: an expire followed by a cancel keeps the expire latch in
/// effect — the eventual terminal code is still `DEADLINE_EXCEEDED`.
#[test]
fn scenario_expire_then_cancel() {
	let task = Arc::new(Task::new());

	assert!(task.start());
	task.expire();
	assert_eq!(task.phase(), Phase::Expiring);

	task.cancel();
	assert_eq!(task.phase(), Phase::Cancelling);

	task.finish_cancel();
	assert_eq!(task.status().code(), StatusCode::DeadlineExceeded);
}

/// Scenario 6: cancelling a parent propagates to every live subtask in
/// registration order; a subtask that already finished is left alone.
#[test]
fn scenario_subtask_cancel_propagation() {
	let parent = Arc::new(Task::new());
	assert!(parent.start());

	let already_done = Arc::new(Task::new());
	let still_running = Arc::new(Task::new());

	parent.add_subtask(&already_done);
	parent.add_subtask(&still_running);

	assert!(already_done.start());
	assert!(still_running.start());

	already_done.finish_ok();
	parent.cancel();

	assert_eq!(parent.phase(), Phase::Cancelling);
	assert_eq!(already_done.phase(), Phase::Done);
	assert_eq!(already_done.status().code(), StatusCode::Ok);
	assert_eq!(still_running.phase(), Phase::Cancelling);

	still_running.finish_cancel();
	parent.finish_cancel();

	assert_eq!(parent.status().code(), StatusCode::Cancelled);
	assert_eq!(still_running.status().code(), StatusCode::Cancelled);
}

/// A task can be replayed after `reset()`: callbacks and subtasks from the
/// previous cycle do not leak into the next one.
#[test]
fn reset_starts_a_clean_cycle() {
	let task = Arc::new(Task::new());
	let finished = Arc::new(AtomicUsize::new(0));

	task.on_finished(counting_callback(&finished));
	assert!(task.start());
	task.finish_ok();
	assert_eq!(finished.load(Ordering::SeqCst), 1);

	task.reset();
	assert_eq!(task.phase(), Phase::Ready);

	assert!(task.start());
	task.finish_ok();

	// The on_finished callback registered before reset() does not survive
	// it; only the Done->Ready transition does.
	assert_eq!(finished.load(Ordering::SeqCst), 1);
}
