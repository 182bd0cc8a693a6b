//! Bridges the `log` crate's global facade into this pipeline, so
//! downstream code that only knows `log::info!`/`log::error!` still ends
//! up funneled through the same background consumer and byte format.

use lazy_static::lazy_static;
use log::{Level as FacadeLevel, LevelFilter, Log, Metadata, Record, set_boxed_logger, set_max_level};

use super::{Level, LogEntry};

fn translate(level: FacadeLevel) -> Level {
	match level {
		FacadeLevel::Error => Level::Error,
		FacadeLevel::Warn => Level::Warn,
		FacadeLevel::Info => Level::Info,
		FacadeLevel::Debug | FacadeLevel::Trace => Level::Debug
	}
}

struct FacadeLogger;

impl Log for FacadeLogger {
	fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
		true
	}

	fn log(&self, record: &Record<'_>) {
		let level = translate(record.level());
		let file = record.file_static().unwrap_or("<unknown>");
		let line = record.line().unwrap_or(0);

		if super::want(file, line, 1, level) {
			super::submit(LogEntry::new(file, line, level, record.args().to_string()));
		}
	}

	fn flush(&self) {
		super::log_flush();
	}
}

fn install() {
	// A second install attempt (another crate in the same process also
	// linking this one) is expected and harmless; the `log` crate keeps
	// whichever logger won the race.
	let _ = set_boxed_logger(Box::new(FacadeLogger));
	set_max_level(LevelFilter::Trace);
}

lazy_static! {
	static ref INSTALLED: () = install();
}

/// Installs the facade bridge on first call; a no-op on every call after
/// that. Safe to call from every [`super::pipeline::Pipeline`] entry point
/// since `lazy_static` only runs the initializer once.
pub(super) fn ensure_installed() {
	lazy_static::initialize(&INSTALLED);
}

#[cfg(feature = "panic-log")]
pub(super) mod panic_hook {
	use std::panic::{PanicInfo, set_hook};

	use super::super::Level;

	fn payload_message(info: &PanicInfo<'_>) -> &str {
		if let Some(message) = info.payload().downcast_ref::<&str>() {
			message
		} else if let Some(message) = info.payload().downcast_ref::<String>() {
			message.as_str()
		} else {
			"Box<dyn Any>"
		}
	}

	fn hook(info: &PanicInfo<'_>) {
		let location = info.location();

		crate::log!(Level::Error, "panic at {:?}: {}", location, payload_message(info));

		super::super::log_flush();
	}

	#[ctor::ctor]
	fn init() {
		super::ensure_installed();
		set_hook(Box::new(hook));
	}
}
