//! A one-shot deferred computation producing a [`Status`], schedulable by
//! the [`crate::task`] core.

use crate::error::Status;

/// An owned, one-shot closure returning a [`Status`].
///
/// `Callback` is move-only (it wraps a `Box<dyn FnOnce>`) and value-like:
/// construct it from any invocable, hand it to a [`crate::task::Task`], and
/// it runs at most once. Running an already-run callback is a programming
/// error.
pub struct Callback {
	func: Box<dyn FnOnce() -> Status + Send>,
	ran: bool
}

impl Callback {
	pub fn new<F>(func: F) -> Self
	where
		F: FnOnce() -> Status + Send + 'static
	{
		Self { func: Box::new(func), ran: false }
	}

	/// Runs the callback, consuming it.
	///
	/// # Panics
	///
	/// Panics if this callback has already been run. This can only happen
	/// if a caller stores a `Callback` behind something like
	/// `Option::take` and calls `run` on the taken value twice; ordinary
	/// ownership already prevents running an owned `Callback` more than
	/// once.
	pub fn run(mut self) -> Status {
		assert!(!self.ran, "Callback::run called twice");
		self.ran = true;

		(self.func)()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::StatusCode;

	#[test]
	fn run_invokes_closure_once() {
		let callback = Callback::new(|| Status::ok());

		assert!(callback.run().is_ok());
	}

	#[test]
	fn run_observes_captured_state() {
		let callback = Callback::new(|| Status::new(StatusCode::Internal, "boom"));

		assert_eq!(callback.run().code(), StatusCode::Internal);
	}

	#[test]
	#[should_panic(expected = "Callback::run called twice")]
	fn running_twice_panics() {
		// Ownership already makes a second `run()` call on the same value
		// impossible at the type level; this directly exercises the guard
		// that backstops a caller who re-enters a stored callback some
		// other way (e.g. through an `Option::take` slot called twice).
		let mut callback = Callback::new(|| Status::ok());
		callback.ran = true;
		callback.run();
	}
}
