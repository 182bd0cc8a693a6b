//! Call-site macros for the logging pipeline, plus the `CHECK`-style fatal
//! assertions built on top of it.
//!
//! `log!` checks [`crate::log::want`] before formatting anything, so a
//! filtered-out call allocates nothing — only once admission is confirmed
//! does it build the message string and hand a [`crate::log::LogEntry`] to
//! [`crate::log::submit`].

/// Logs at `level`, optionally with an `every_n:` admission sampler
/// (admits the first call at a given `file:line` and every `n`th call
/// after that; omitted, every call is admitted).
#[macro_export]
macro_rules! log {
	($level:expr, every_n: $n:expr, $($arg:tt)+) => {{
		if $crate::log::want(file!(), line!(), $n, $level) {
			$crate::log::submit($crate::log::LogEntry::new(
				file!(),
				line!(),
				$level,
				::std::format!($($arg)+)
			));
		}
	}};

	($level:expr, $($arg:tt)+) => {
		$crate::log!($level, every_n: 1, $($arg)+)
	};
}

#[macro_export]
macro_rules! debug {
	($($arg:tt)+) => {
		$crate::log!($crate::log::Level::Debug, $($arg)+)
	};
}

#[macro_export]
macro_rules! info {
	($($arg:tt)+) => {
		$crate::log!($crate::log::Level::Info, $($arg)+)
	};
}

#[macro_export]
macro_rules! warn {
	($($arg:tt)+) => {
		$crate::log!($crate::log::Level::Warn, $($arg)+)
	};
}

#[macro_export]
macro_rules! error {
	($($arg:tt)+) => {
		$crate::log!($crate::log::Level::Error, $($arg)+)
	};
}

/// Logs at `Dfatal`: terminates the process after flushing, but only under
/// `debug_assertions` (release builds log this as a plain error).
#[macro_export]
macro_rules! dfatal {
	($($arg:tt)+) => {
		$crate::log!($crate::log::Level::Dfatal, $($arg)+)
	};
}

/// Logs at `Fatal`: always terminates the process after flushing.
#[macro_export]
macro_rules! fatal {
	($($arg:tt)+) => {
		$crate::log!($crate::log::Level::Fatal, $($arg)+)
	};
}

/// Asserts `cond`, logging `"CHECK FAILED: <cond>"` at `Dfatal` and, in
/// debug builds, aborting the process once the record has been flushed.
#[cfg(feature = "check")]
#[macro_export]
macro_rules! check {
	($cond:expr) => {
		if !($cond) {
			$crate::dfatal!("CHECK FAILED: {}", stringify!($cond));
		}
	};
}

/// Like [`check!`], but for a [`crate::error::Status`]-valued expression:
/// fails unless the status [`crate::error::Status::is_ok`], rendering the
/// failing status alongside the expression that produced it.
#[cfg(feature = "check")]
#[macro_export]
macro_rules! check_ok {
	($status:expr) => {{
		let status = $status;

		if !status.is_ok() {
			$crate::dfatal!("CHECK FAILED: {}: {}", stringify!($status), status.as_string());
		}
	}};
}
