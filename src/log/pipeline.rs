//! The process-wide queue, consumer thread, and sink/sampling registry
//! backing [`super::want`]/[`super::submit`].
//!
//! Two mutexes, acquired queue-then-registry and never the reverse: `queue`
//! (the pending-entry deque plus the thread's run state) and `registry`
//! (the sink list and per-call-site sampling counters). A record's
//! admission check and its eventual dispatch both take the registry lock
//! only after the queue lock has already been released (or, in
//! single-threaded mode, while still holding it — see [`Pipeline::submit`]).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use lazy_static::lazy_static;

use super::sink::StderrSink;
use super::{Level, LogEntry, Sink};

/// An opaque handle to a registered [`Sink`], returned by
/// [`super::log_target_add`] and consumed by [`super::log_target_remove`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ThreadState {
	NotStarted,
	Started,
	SingleThreaded
}

struct QueueState {
	entries: VecDeque<LogEntry>,
	thread_state: ThreadState
}

struct RegisteredSink {
	id: SinkId,
	sink: Box<dyn Sink>
}

struct Registry {
	sinks: Vec<RegisteredSink>,
	sampling: HashMap<(&'static str, u32), u32>,
	next_id: u64
}

pub(super) struct Pipeline {
	queue: Mutex<QueueState>,
	queue_put_cv: Condvar,
	queue_drained_cv: Condvar,
	registry: Mutex<Registry>,
	stderr: Arc<StderrSink>
}

lazy_static! {
	static ref PIPELINE: Pipeline = Pipeline::new();
}

impl Pipeline {
	fn new() -> Self {
		let stderr = Arc::new(StderrSink::new(Level::Info));
		let stderr_sink = RegisteredSink { id: SinkId(0), sink: Box::new(Arc::clone(&stderr)) };

		Self {
			queue: Mutex::new(QueueState {
				entries: VecDeque::new(),
				thread_state: ThreadState::NotStarted
			}),
			queue_put_cv: Condvar::new(),
			queue_drained_cv: Condvar::new(),
			registry: Mutex::new(Registry {
				sinks: vec![stderr_sink],
				sampling: HashMap::new(),
				next_id: 1
			}),
			stderr
		}
	}

	pub(super) fn global() -> &'static Self {
		&PIPELINE
	}

	/// Spawns the consumer thread on first call. No-op once the pipeline
	/// has already started (or been switched to single-threaded mode).
	fn ensure_started(&'static self) {
		#[cfg(feature = "logger")]
		super::bridge::ensure_installed();

		#[allow(clippy::unwrap_used)]
		let mut queue = self.queue.lock().unwrap();

		if queue.thread_state == ThreadState::NotStarted {
			queue.thread_state = ThreadState::Started;
			thread::spawn(move || self.consume());
		}
	}

	fn consume(&self) {
		#[allow(clippy::unwrap_used)]
		let mut queue = self.queue.lock().unwrap();

		loop {
			if queue.entries.is_empty() {
				self.queue_drained_cv.notify_all();
				#[allow(clippy::unwrap_used)]
				while queue.entries.is_empty() {
					queue = self.queue_put_cv.wait(queue).unwrap();
				}
			}

			#[allow(clippy::expect_used)]
			let entry = queue.entries.pop_front().expect("queue just checked non-empty");

			// Held across dispatch, same as the consumer this is modeled
			// on: a sink mutation can never interleave mid-record.
			self.dispatch(&entry);
		}
	}

	fn dispatch(&self, entry: &LogEntry) {
		#[allow(clippy::unwrap_used)]
		let registry = self.registry.lock().unwrap();

		for registered in &registry.sinks {
			if registered.sink.want(entry.file(), entry.line(), entry.level()) {
				registered.sink.log(entry);
			}
		}
	}

	pub(super) fn want(&'static self, file: &'static str, line: u32, every_n: u32, level: Level) -> bool {
		self.ensure_started();

		if level.bypasses_sampling() {
			return true;
		}

		#[allow(clippy::unwrap_used)]
		let mut registry = self.registry.lock().unwrap();

		if every_n > 1 {
			let count = registry.sampling.entry((file, line)).or_insert(0);
			let admit_by_sampling = *count == 0;

			*count = (*count + 1) % every_n;

			if !admit_by_sampling {
				return false;
			}
		}

		registry
			.sinks
			.iter()
			.any(|registered| registered.sink.want(file, line, level))
	}

	pub(super) fn submit(&'static self, entry: LogEntry) {
		self.ensure_started();

		#[allow(clippy::unwrap_used)]
		let mut queue = self.queue.lock().unwrap();

		if queue.thread_state == ThreadState::SingleThreaded {
			self.dispatch(&entry);
			return;
		}

		queue.entries.push_back(entry);
		self.queue_put_cv.notify_one();
	}

	pub(super) fn flush(&'static self) {
		#[allow(clippy::unwrap_used)]
		let mut queue = self.queue.lock().unwrap();

		#[allow(clippy::unwrap_used)]
		while !queue.entries.is_empty() {
			queue = self.queue_drained_cv.wait(queue).unwrap();
		}
	}

	/// # Panics
	///
	/// Panics if the consumer thread has already been started.
	pub(super) fn go_single_threaded(&'static self) {
		#[allow(clippy::unwrap_used)]
		let mut queue = self.queue.lock().unwrap();

		assert!(
			queue.thread_state != ThreadState::Started,
			"logging thread is already running"
		);

		queue.thread_state = ThreadState::SingleThreaded;
	}

	pub(super) fn set_stderr_level(&'static self, level: Level) {
		self.stderr.set_level(level);
	}

	pub(super) fn add_target(&'static self, sink: Box<dyn Sink>) -> SinkId {
		#[allow(clippy::unwrap_used)]
		let mut registry = self.registry.lock().unwrap();

		let id = SinkId(registry.next_id);
		registry.next_id += 1;
		registry.sinks.push(RegisteredSink { id, sink });

		id
	}

	/// Drains the queue before removing, so the consumer thread never
	/// observes the sink set mutate mid-dispatch.
	pub(super) fn remove_target(&'static self, id: SinkId) {
		self.flush();

		#[allow(clippy::unwrap_used)]
		let mut registry = self.registry.lock().unwrap();

		registry.sinks.retain(|registered| registered.id != id);
	}
}

static NEXT_TID: AtomicU64 = AtomicU64::new(1);

thread_local! {
	static TID: u64 = NEXT_TID.fetch_add(1, Ordering::Relaxed);
}

/// A small, process-unique, monotonically assigned thread identifier.
///
/// Substitutes for the raw OS thread id the format this pipeline was
/// modeled on renders, without pulling in a libc dependency for one
/// `gettid()` call.
pub(super) fn current_tid() -> u64 {
	TID.with(|tid| *tid)
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::AtomicUsize;

	use super::*;

	struct CountingSink {
		count: Arc<AtomicUsize>
	}

	impl Sink for CountingSink {
		fn want(&self, _file: &str, _line: u32, _level: Level) -> bool {
			true
		}

		fn log(&self, _entry: &LogEntry) {
			self.count.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[test]
	fn current_tid_is_stable_per_thread() {
		let first = current_tid();
		let second = current_tid();

		assert_eq!(first, second);
	}

	#[test]
	fn current_tid_differs_across_threads() {
		let main_tid = current_tid();
		let other_tid = thread::spawn(current_tid).join().unwrap();

		assert_ne!(main_tid, other_tid);
	}

	#[test]
	fn sink_round_trips_through_the_global_pipeline() {
		let count = Arc::new(AtomicUsize::new(0));
		let sink = Box::new(CountingSink { count: Arc::clone(&count) });

		let id = super::super::log_target_add(sink);

		super::super::submit(LogEntry::new("p.rs", 1, Level::Info, "hi".to_owned()));
		super::super::log_flush();

		assert!(count.load(Ordering::SeqCst) >= 1);

		super::super::log_target_remove(id);
	}
}
