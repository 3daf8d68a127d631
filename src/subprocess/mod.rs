//! Subprocess execution layer.
//!
//! [`ProcessRunner`] is the seam between the duplicity facade and the
//! operating system: [`TokioProcessRunner`] spawns real processes, drains
//! their output concurrently and enforces timeouts, while
//! [`MockProcessRunner`] answers from canned expectations in tests.

pub mod error;
pub mod events;
pub mod mock;
pub mod runner;


pub use error::ProcessError;
pub use events::{CommandEvent, EventSink};
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};
