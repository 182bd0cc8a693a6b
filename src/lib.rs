//! Task/callback substrate and structured result model for async systems
//! code: an explicit, cancellable task handle with parent/child propagation,
//! a closed-enumeration status type, and the background logging pipeline
//! that the task layer's invariants terminate the process through.

#[cfg(feature = "callback")]
pub mod callback;
#[cfg(feature = "clock")]
pub mod clock;
#[cfg(feature = "error")]
pub mod error;
#[cfg(feature = "log")]
pub mod log;
#[cfg(feature = "options")]
pub mod options;
#[cfg(feature = "task")]
pub mod task;

extern crate self as task_core;

#[cfg(feature = "panic-log")]
pub extern crate ctor;
#[cfg(feature = "log")]
pub extern crate lazy_static;
