//! Log targets: destinations a [`crate::log::LogEntry`] can be dispatched
//! to.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::{Level, LogEntry};

/// A log destination.
///
/// Implementations must be cheap to call from the single consumer thread
/// and must not themselves log (the pipeline holds its registry lock across
/// every sink's `want`/`log` call for a given entry).
pub trait Sink: Send + Sync {
	/// Whether this sink would admit a record at `level` from `file:line`.
	/// Consulted both by [`super::want`] (before a [`LogEntry`] exists) and
	/// by the consumer thread (to decide whether to call `log`).
	fn want(&self, file: &str, line: u32, level: Level) -> bool;

	/// Writes `entry`. Only called when a prior `want` call for the same
	/// site and level returned `true`.
	fn log(&self, entry: &LogEntry);
}

/// The pipeline's built-in sink: writes rendered lines to stderr, admitting
/// everything at or above a configurable floor (`Level::Info` by default).
pub struct StderrSink {
	level: AtomicU8
}

impl StderrSink {
	#[must_use]
	pub fn new(level: Level) -> Self {
		Self { level: AtomicU8::new(level as u8) }
	}

	pub(super) fn set_level(&self, level: Level) {
		self.level.store(level as u8, Ordering::Relaxed);
	}

	fn level(&self) -> u8 {
		self.level.load(Ordering::Relaxed)
	}
}

impl Sink for StderrSink {
	fn want(&self, _file: &str, _line: u32, level: Level) -> bool {
		(level as u8) >= self.level()
	}

	fn log(&self, entry: &LogEntry) {
		let rendered = entry.render();
		let mut stderr = io::stderr().lock();
		let _ = stderr.write_all(rendered.as_bytes());
		let _ = stderr.flush();
	}
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
	fn want(&self, file: &str, line: u32, level: Level) -> bool {
		(**self).want(file, line, level)
	}

	fn log(&self, entry: &LogEntry) {
		(**self).log(entry);
	}
}
