//! Background, single-consumer logging pipeline.
//!
//! Call sites never touch the consumer thread directly: the `log!` macro
//! (and its per-level `error!`/`warn!`/`info!`/`debug!`/`dfatal!`/`fatal!`
//! shorthands) construct a [`LogEntry`] only after [`want`] says some sink
//! would actually admit it, then hand it to the process-wide pipeline via
//! [`submit`]. `check!`/`check_ok!` are the only intentional
//! process-termination path this crate exposes.

mod pipeline;
pub mod sink;

#[cfg(feature = "logger")]
mod bridge;

mod macros;

use std::fmt::{self, Display, Formatter};

use crate::clock::{ClockSource, SystemClock, WallTime};

pub use self::pipeline::SinkId;
pub use self::sink::Sink;

/// Severity of a [`LogEntry`], ordered from least to most severe.
///
/// `Dfatal` ("debug fatal") terminates the process only when
/// `debug_assertions` is enabled; in release builds it behaves like `Error`.
/// `Fatal` always terminates the process after the record is flushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
	Debug = 0,
	Info,
	Warn,
	Error,
	Dfatal,
	Fatal
}

impl Level {
	/// The single-character prefix this level renders as in a log line.
	///
	/// `Dfatal` renders as `F` under `debug_assertions` (it is about to
	/// abort) and as `E` otherwise (it was downgraded to a non-fatal
	/// error).
	#[must_use]
	pub const fn render_char(self) -> char {
		match self {
			Self::Fatal => 'F',
			Self::Dfatal => {
				if cfg!(debug_assertions) {
					'F'
				} else {
					'E'
				}
			}
			Self::Error => 'E',
			Self::Warn => 'W',
			Self::Info => 'I',
			Self::Debug => 'D'
		}
	}

	/// Whether an entry at this level must terminate the process once it
	/// has been submitted and flushed.
	#[must_use]
	pub const fn is_fatal(self) -> bool {
		matches!(self, Self::Fatal) || (matches!(self, Self::Dfatal) && cfg!(debug_assertions))
	}

	/// Whether this level bypasses every-N sampling (always admitted).
	#[must_use]
	pub const fn bypasses_sampling(self) -> bool {
		(self as u8) >= (Self::Dfatal as u8)
	}
}

impl Display for Level {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
		fmt.write_str(match self {
			Self::Debug => "DEBUG",
			Self::Info => "INFO",
			Self::Warn => "WARN",
			Self::Error => "ERROR",
			Self::Dfatal => "DFATAL",
			Self::Fatal => "FATAL"
		})
	}
}

/// A single record flowing through the pipeline, already timestamped and
/// tagged with the producing thread by the time it reaches a [`Sink`].
#[derive(Clone, Debug)]
pub struct LogEntry {
	file: &'static str,
	line: u32,
	level: Level,
	tid: u64,
	wall: WallTime,
	message: String
}

impl LogEntry {
	#[must_use]
	pub fn new(file: &'static str, line: u32, level: Level, message: String) -> Self {
		Self {
			file,
			line,
			level,
			tid: pipeline::current_tid(),
			wall: SystemClock.now_wall(),
			message
		}
	}

	#[must_use]
	pub const fn file(&self) -> &'static str {
		self.file
	}

	#[must_use]
	pub const fn line(&self) -> u32 {
		self.line
	}

	#[must_use]
	pub const fn level(&self) -> Level {
		self.level
	}

	#[must_use]
	pub fn message(&self) -> &str {
		&self.message
	}

	/// Renders this entry in the pipeline's byte-stable line format:
	/// `<L><MM><DD> <HH>:<MM>:<SS>.<uuuuuu>  <tid> <file>:<line>] <message>\n`.
	#[must_use]
	pub fn render(&self) -> String {
		let calendar = self.wall.to_calendar();

		format!(
			"{}{:02}{:02} {:02}:{:02}:{:02}.{:06}  {} {}:{}] {}\n",
			self.level.render_char(),
			calendar.month,
			calendar.day,
			calendar.hour,
			calendar.minute,
			calendar.second,
			calendar.micros,
			self.tid,
			self.file,
			self.line,
			self.message
		)
	}
}

/// Consults the pipeline's sampling counter and every registered sink's
/// [`Sink::want`] without constructing a [`LogEntry`]. Records at
/// [`Level::Dfatal`] or above always return `true`.
///
/// Call sites (the [`log!`] family) are expected to call this before doing
/// any formatting work, so a filtered-out call allocates nothing.
#[must_use]
pub fn want(file: &'static str, line: u32, every_n: u32, level: Level) -> bool {
	pipeline::Pipeline::global().want(file, line, every_n, level)
}

/// Hands `entry` to the pipeline: queued for the background consumer
/// thread, or processed inline if [`log_single_threaded`] was called
/// before the thread started.
///
/// If `entry`'s level [`Level::is_fatal`], blocks until the record has been
/// flushed to every sink and then aborts the process.
pub fn submit(entry: LogEntry) {
	let fatal = entry.level.is_fatal();

	pipeline::Pipeline::global().submit(entry);

	if fatal {
		log_flush();
		std::process::abort();
	}
}

/// Blocks until the queue has been fully drained by the consumer thread (or
/// returns immediately in single-threaded mode, where the queue is never
/// left non-empty between calls).
pub fn log_flush() {
	pipeline::Pipeline::global().flush();
}

/// Switches the pipeline to process every submitted entry synchronously on
/// the calling thread instead of spawning a background consumer.
///
/// # Panics
///
/// Panics if the background consumer thread has already been started.
pub fn log_single_threaded() {
	pipeline::Pipeline::global().go_single_threaded();
}

/// Sets the minimum level the built-in stderr sink admits.
pub fn log_stderr_set_level(level: Level) {
	pipeline::Pipeline::global().set_stderr_level(level);
}

/// Registers an additional sink, returning a handle usable with
/// [`log_target_remove`].
pub fn log_target_add(sink: Box<dyn Sink>) -> SinkId {
	pipeline::Pipeline::global().add_target(sink)
}

/// Removes a previously-registered sink. Blocks until the queue is drained
/// first, so the consumer thread never observes the sink set mutate
/// mid-dispatch.
pub fn log_target_remove(id: SinkId) {
	pipeline::Pipeline::global().remove_target(id);
}
