//! Execution Module
//!
//! Drives logical executions of statements and records how they went.

pub mod cancel;
pub mod engine;
pub mod info;
pub(crate) mod record;

pub use cancel::CancelHandle;
pub use engine::{RequestEngine, RequestEngineBuilder};
pub use info::{Attempt, AttemptOutcome, ExecutionInfo, UNKNOWN_SIZE};
