//! Structured outcome type shared by every asynchronous operation in the
//! wider library this crate's [`crate::task`] substrate belongs to.
//!
//! [`Status`] is deliberately not named `Result`: aliasing it that way would
//! shadow [`std::result::Result`] the moment it's used generically, the same
//! problem gRPC-flavored status types run into in other Rust codebases.

use std::error;
use std::fmt::{self, Display, Formatter};

/// Closed, stable enumeration of outcome codes.
///
/// Ordinals are part of the external contract: this type is a superset of
/// the canonical status taxonomies (gRPC, `absl::Status`) because every
/// async operation in the wider library returns a [`Status`] built from one
/// of these, so the set must never be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
	Ok = 0,
	Unknown,
	Internal,
	Cancelled,
	FailedPrecondition,
	NotFound,
	AlreadyExists,
	WrongType,
	PermissionDenied,
	Unauthenticated,
	InvalidArgument,
	OutOfRange,
	NotImplemented,
	Unavailable,
	Aborted,
	ResourceExhausted,
	DeadlineExceeded,
	DataLoss,
	EndOfFile
}

impl StatusCode {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Ok => "OK",
			Self::Unknown => "UNKNOWN",
			Self::Internal => "INTERNAL",
			Self::Cancelled => "CANCELLED",
			Self::FailedPrecondition => "FAILED_PRECONDITION",
			Self::NotFound => "NOT_FOUND",
			Self::AlreadyExists => "ALREADY_EXISTS",
			Self::WrongType => "WRONG_TYPE",
			Self::PermissionDenied => "PERMISSION_DENIED",
			Self::Unauthenticated => "UNAUTHENTICATED",
			Self::InvalidArgument => "INVALID_ARGUMENT",
			Self::OutOfRange => "OUT_OF_RANGE",
			Self::NotImplemented => "NOT_IMPLEMENTED",
			Self::Unavailable => "UNAVAILABLE",
			Self::Aborted => "ABORTED",
			Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
			Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
			Self::DataLoss => "DATA_LOSS",
			Self::EndOfFile => "END_OF_FILE"
		}
	}
}

impl Display for StatusCode {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
		fmt.write_str(self.as_str())
	}
}

#[derive(Clone, Debug)]
struct Inner {
	code: StatusCode,
	message: Option<String>,
	errno: Option<i32>
}

/// A structured outcome: a [`StatusCode`] plus an optional human message and
/// an optional system errno.
///
/// Truthiness (see [`Status::is_ok`] and the `From<&Status> for bool` impl)
/// is `code == StatusCode::Ok`; equality is by code only, never by message
/// text, matching the distilled spec's data model.
#[derive(Clone, Debug)]
pub struct Status(Inner);

impl Status {
	/// The `OK` status: no message, no errno.
	#[must_use]
	pub const fn ok() -> Self {
		Self(Inner { code: StatusCode::Ok, message: None, errno: None })
	}

	/// A status carrying a code and a human message.
	#[must_use]
	pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
		let message = message.into();

		debug_assert!(
			code == StatusCode::Ok || !message.is_empty(),
			"non-OK Status must carry a message, an errno, or both"
		);

		Self(Inner { code, message: Some(message), errno: None })
	}

	/// A status carrying a code and a raw system errno, with optional
	/// human context prepended to the rendered message.
	#[must_use]
	pub fn from_errno(code: StatusCode, errno: i32, context: impl Into<String>) -> Self {
		let context = context.into();
		let message = if context.is_empty() { None } else { Some(context) };

		Self(Inner { code, message, errno: Some(errno) })
	}

	/// A status carrying only a code, no message or errno.
	#[must_use]
	pub const fn from_code(code: StatusCode) -> Self {
		Self(Inner { code, message: None, errno: None })
	}

	#[must_use]
	pub const fn code(&self) -> StatusCode {
		self.0.code
	}

	#[must_use]
	pub fn message(&self) -> Option<&str> {
		self.0.message.as_deref()
	}

	#[must_use]
	pub const fn errno(&self) -> Option<i32> {
		self.0.errno
	}

	#[must_use]
	pub const fn is_ok(&self) -> bool {
		matches!(self.0.code, StatusCode::Ok)
	}

	#[must_use]
	pub fn as_string(&self) -> String {
		self.to_string()
	}
}

impl Default for Status {
	fn default() -> Self {
		Self::ok()
	}
}

impl PartialEq for Status {
	fn eq(&self, other: &Self) -> bool {
		self.0.code == other.0.code
	}
}

impl Eq for Status {}

impl From<StatusCode> for Status {
	fn from(code: StatusCode) -> Self {
		Self::from_code(code)
	}
}

impl From<&Status> for bool {
	fn from(status: &Status) -> Self {
		status.is_ok()
	}
}

impl From<Status> for bool {
	fn from(status: Status) -> Self {
		status.is_ok()
	}
}

impl Display for Status {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
		write!(fmt, "{}: ", self.0.code)?;

		match (&self.0.message, self.0.errno) {
			(Some(message), Some(errno)) => write!(fmt, "{message} (errno {errno})"),
			(Some(message), None) => write!(fmt, "{message}"),
			(None, Some(errno)) => write!(fmt, "errno {errno}"),
			(None, None) => Ok(())
		}
	}
}

impl error::Error for Status {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ok_has_no_errno_and_is_truthy() {
		let status = Status::ok();

		assert_eq!(status.code(), StatusCode::Ok);
		assert_eq!(status.errno(), None);
		assert!(status.is_ok());
		assert!(bool::from(&status));
	}

	#[test]
	fn non_ok_is_falsy() {
		let status = Status::new(StatusCode::NotFound, "no such entity");

		assert!(!status.is_ok());
		assert!(!bool::from(&status));
	}

	#[test]
	fn equality_ignores_message() {
		let a = Status::new(StatusCode::Internal, "first");
		let b = Status::new(StatusCode::Internal, "second");

		assert_eq!(a, b);
	}

	#[test]
	fn rendering_matches_code_colon_message() {
		let status = Status::new(StatusCode::InvalidArgument, "bad size");

		assert_eq!(status.as_string(), "INVALID_ARGUMENT: bad size");
	}

	#[test]
	fn rendering_with_errno_only() {
		let status = Status::from_errno(StatusCode::Internal, 5, "");

		assert_eq!(status.as_string(), "INTERNAL: errno 5");
	}

	#[test]
	fn rendering_with_context_and_errno() {
		let status = Status::from_errno(StatusCode::Internal, 5, "read failed");

		assert_eq!(status.as_string(), "INTERNAL: read failed (errno 5)");
	}

	#[test]
	fn from_code_has_no_message() {
		let status = Status::from(StatusCode::Unavailable);

		assert_eq!(status.code(), StatusCode::Unavailable);
		assert_eq!(status.message(), None);
	}
}
