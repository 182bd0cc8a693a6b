//! Cancellable/expirable operation handle with parent/child linkage,
//! callback fan-out, and a strict state machine.
//!
//! The exact transitions and callback-firing counts below are taken
//! directly from the worked examples this spec was distilled from (see
//! `DESIGN.md`); `tests/task_state_machine.rs` replays them verbatim.

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, Weak};

use crate::callback::Callback;
use crate::error::{Status, StatusCode};

/// A [`Task`]'s position in its state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	Ready,
	Unstarted,
	Running,
	Expiring,
	Cancelling,
	Done
}

struct State {
	phase: Phase,
	status: Status,
	subtasks: Vec<Weak<Task>>,
	on_cancelled: Vec<Callback>,
	on_finished: Vec<Callback>,
	cancel_latch: bool,
	expire_latch: bool,
	/// Set once `on_cancelled` has actually fired this cycle, so a late
	/// registration after `Done` can tell "fired, run inline" apart from
	/// "never became true, drop silently".
	cancelled_fired: bool
}

impl State {
	const fn new() -> Self {
		Self {
			phase: Phase::Ready,
			status: Status::ok(),
			subtasks: Vec::new(),
			on_cancelled: Vec::new(),
			on_finished: Vec::new(),
			cancel_latch: false,
			expire_latch: false,
			cancelled_fired: false
		}
	}
}

/// A cancellable, expirable, externally-driven asynchronous operation
/// handle.
///
/// `Task` has no internal scheduler: external machinery (I/O completion,
/// timers, worker threads) drives it toward completion by calling
/// [`Task::finish_ok`] or [`Task::finish`]. It is meant to be held behind an
/// `Arc` so children can hold non-owning [`Weak`] back-references to their
/// parent's subtask list without the parent outliving (or owning) them.
pub struct Task {
	state: Mutex<State>
}

impl Default for Task {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for Task {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
		#[allow(clippy::unwrap_used)]
		let state = self.state.lock().unwrap();

		fmt.debug_struct("Task").field("phase", &state.phase).finish()
	}
}

impl Task {
	#[must_use]
	pub fn new() -> Self {
		Self { state: Mutex::new(State::new()) }
	}

	#[must_use]
	pub fn phase(&self) -> Phase {
		#[allow(clippy::unwrap_used)]
		let state = self.state.lock().unwrap();

		state.phase
	}

	#[must_use]
	pub fn is_finished(&self) -> bool {
		matches!(self.phase(), Phase::Done)
	}

	/// The terminal status. Meaningful only once [`Task::is_finished`]
	/// returns true; reads as [`Status::ok`] before that.
	#[must_use]
	pub fn status(&self) -> Status {
		#[allow(clippy::unwrap_used)]
		let state = self.state.lock().unwrap();

		state.status.clone()
	}

	/// Starts the task. Returns `true` when the task transitioned
	/// `Ready -> Running`, `false` when a prior `cancel()`/`expire()`
	/// short-circuited it straight to `Done`.
	///
	/// # Panics
	///
	/// Panics (via an internal `CHECK`) if called on anything other than
	/// `Ready` or `Unstarted`.
	pub fn start(self: &Arc<Self>) -> bool {
		#[allow(clippy::unwrap_used)]
		let mut state = self.state.lock().unwrap();

		match state.phase {
			Phase::Ready => {
				state.phase = Phase::Running;
				true
			}
			Phase::Unstarted => {
				let code = if state.expire_latch {
					StatusCode::DeadlineExceeded
				} else {
					StatusCode::Cancelled
				};

				state.status = Status::from_code(code);
				state.phase = Phase::Done;

				let cancelled = Self::fire_cancelled(&mut state);
				let finished = Self::drain(&mut state.on_finished);
				drop(state);

				for callback in cancelled {
					callback.run();
				}

				for callback in finished {
					callback.run();
				}

				false
			}
			other => panic!("Task::start: invalid transition from {other:?}")
		}
	}

	/// Requests cancellation. Idempotent past the first call on a given
	/// cancel latch.
	pub fn cancel(self: &Arc<Self>) {
		#[allow(clippy::unwrap_used)]
		let mut state = self.state.lock().unwrap();

		match state.phase {
			Phase::Ready => {
				state.cancel_latch = true;
				state.phase = Phase::Unstarted;
			}
			Phase::Running | Phase::Expiring => {
				state.cancel_latch = true;
				state.phase = Phase::Cancelling;

				let cancelled = Self::fire_cancelled(&mut state);
				let subtasks = state.subtasks.clone();
				drop(state);

				for callback in cancelled {
					callback.run();
				}

				propagate_cancel(&subtasks);
			}
			Phase::Cancelling | Phase::Unstarted | Phase::Done => {
				// Idempotent: cancel latch already set (or the task is
				// already terminal), nothing further to do.
			}
		}
	}

	/// Requests deadline expiry. Idempotent past the first call on a given
	/// expire latch; always upgrades a subsequent cancelled termination to
	/// `DEADLINE_EXCEEDED`.
	pub fn expire(self: &Arc<Self>) {
		#[allow(clippy::unwrap_used)]
		let mut state = self.state.lock().unwrap();

		match state.phase {
			Phase::Ready => {
				state.expire_latch = true;
				state.phase = Phase::Unstarted;
			}
			Phase::Running => {
				state.expire_latch = true;
				state.phase = Phase::Expiring;

				let cancelled = Self::fire_cancelled(&mut state);
				let subtasks = state.subtasks.clone();
				drop(state);

				for callback in cancelled {
					callback.run();
				}

				// A parent that is expiring still propagates via
				// cancel(), not expire(): the deadline is the parent's
				// own terminal reason, not something each subtask needs
				// to track separately on its own expire latch.
				propagate_cancel(&subtasks);
			}
			Phase::Cancelling => {
				state.expire_latch = true;
			}
			Phase::Expiring | Phase::Unstarted | Phase::Done => {
				// Idempotent.
			}
		}
	}

	/// Completes the task successfully (`finish(Status::ok())`), unless a
	/// pending cancel/expire latch overrides it per the precedence rule in
	/// [`Task::finish`].
	pub fn finish_ok(self: &Arc<Self>) {
		self.finish(Status::ok());
	}

	/// Force-completes a task in `Cancelling`/`Expiring` (or any
	/// non-terminal phase) with the cancelled/expired code implied by its
	/// latches.
	///
	/// # Panics
	///
	/// Panics if called on a `Done` task.
	pub fn finish_cancel(self: &Arc<Self>) {
		#[allow(clippy::unwrap_used)]
		let mut state = self.state.lock().unwrap();

		assert!(
			!matches!(state.phase, Phase::Done),
			"Task::finish_cancel: invalid transition from Done"
		);

		let code = if state.expire_latch {
			StatusCode::DeadlineExceeded
		} else {
			StatusCode::Cancelled
		};

		state.status = Status::from_code(code);
		self.complete(state);
	}

	/// Completes the task with `status` from `Running`.
	///
	/// Cancellation-versus-failure precedence: if a cancel or expire
	/// latch is set, the latch's code wins over `status` (even when
	/// `status` is `Ok`), because a user-requested cancellation is the
	/// more informative terminal cause.
	///
	/// # Panics
	///
	/// Panics if called on anything other than `Running`, `Cancelling`, or
	/// `Expiring`.
	pub fn finish(self: &Arc<Self>, status: Status) {
		#[allow(clippy::unwrap_used)]
		let mut state = self.state.lock().unwrap();

		assert!(
			matches!(state.phase, Phase::Running | Phase::Cancelling | Phase::Expiring),
			"Task::finish: invalid transition from {:?}",
			state.phase
		);

		state.status = if state.cancel_latch || state.expire_latch {
			let code = if state.expire_latch {
				StatusCode::DeadlineExceeded
			} else {
				StatusCode::Cancelled
			};

			Status::from_code(code)
		} else {
			status
		};

		self.complete(state);
	}

	fn complete(self: &Arc<Self>, mut state: std::sync::MutexGuard<'_, State>) {
		state.phase = Phase::Done;

		let cancelled = if !state.cancelled_fired && state.status.code() != StatusCode::Ok {
			Self::fire_cancelled(&mut state)
		} else {
			Vec::new()
		};

		let finished = Self::drain(&mut state.on_finished);
		drop(state);

		for callback in cancelled {
			callback.run();
		}

		for callback in finished {
			callback.run();
		}
	}

	/// Legal only from `Done` or `Ready`: clears status, phase (back to
	/// `Ready`), and every callback/subtask registry.
	///
	/// # Panics
	///
	/// Panics if called from `Unstarted`, `Running`, `Cancelling`, or
	/// `Expiring`.
	pub fn reset(self: &Arc<Self>) {
		#[allow(clippy::unwrap_used)]
		let mut state = self.state.lock().unwrap();

		assert!(
			matches!(state.phase, Phase::Done | Phase::Ready),
			"Task::reset: invalid transition from {:?}",
			state.phase
		);

		*state = State::new();
	}

	/// Registers `callback` to run when the task first becomes cancelled
	/// or expired (i.e. first enters `Cancelling`/`Expiring`, or reaches
	/// `Done` with a cancelled/expired code without passing through
	/// either intermediate phase).
	///
	/// If that condition is already permanent, runs `callback` immediately
	/// on the calling thread. If the task has already terminated `Ok`, the
	/// cancelled predicate can never become true and the callback is
	/// silently dropped.
	pub fn on_cancelled(self: &Arc<Self>, callback: Callback) {
		#[allow(clippy::unwrap_used)]
		let mut state = self.state.lock().unwrap();

		if state.cancelled_fired {
			drop(state);
			callback.run();
			return;
		}

		if matches!(state.phase, Phase::Done) {
			let ok = state.status.code() == StatusCode::Ok;
			drop(state);

			if ok {
				// Terminated OK without ever becoming cancelled: the
				// predicate never became true, so this registration
				// never fires.
				drop(callback);
			} else {
				callback.run();
			}

			return;
		}

		state.on_cancelled.push(callback);
	}

	/// Registers `callback` to run when the task reaches `Done`,
	/// regardless of final code. If the task is already `Done`, runs
	/// `callback` immediately on the calling thread.
	pub fn on_finished(self: &Arc<Self>, callback: Callback) {
		#[allow(clippy::unwrap_used)]
		let mut state = self.state.lock().unwrap();

		if matches!(state.phase, Phase::Done) {
			drop(state);
			callback.run();
			return;
		}

		state.on_finished.push(callback);
	}

	/// Registers `child` as a subtask: when this task enters `Cancelling`
	/// or `Expiring`, `child.cancel()` is invoked on it, in registration
	/// order. Propagation is always via `cancel()`, even when this task
	/// itself is expiring — the deadline is this task's own terminal
	/// reason, not one a subtask needs to track on its own expire latch.
	///
	/// Legal only in `Ready` or `Running`. The parent holds only a `Weak`
	/// reference: it does not own `child` and does not wait for it to
	/// finish.
	///
	/// # Panics
	///
	/// Panics if called outside `Ready`/`Running`.
	pub fn add_subtask(self: &Arc<Self>, child: &Arc<Self>) {
		#[allow(clippy::unwrap_used)]
		let mut state = self.state.lock().unwrap();

		assert!(
			matches!(state.phase, Phase::Ready | Phase::Running),
			"Task::add_subtask: invalid in phase {:?}",
			state.phase
		);

		state.subtasks.push(Arc::downgrade(child));
	}

	fn fire_cancelled(state: &mut State) -> Vec<Callback> {
		state.cancelled_fired = true;
		Self::drain(&mut state.on_cancelled)
	}

	fn drain(list: &mut Vec<Callback>) -> Vec<Callback> {
		std::mem::take(list)
	}
}

fn propagate_cancel(subtasks: &[Weak<Task>]) {
	for subtask in subtasks {
		if let Some(subtask) = subtask.upgrade() {
			subtask.cancel();
		}
	}
}
