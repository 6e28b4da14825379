//! Error types for signal graph construction.
//!
//! Only building a graph can fail. Reading signals and running cycles
//! resolve every edge case to a defined value instead.

use thiserror::Error;
use tk_core::TkError;

/// Result type for signal graph operations.
pub type SignalResult<T> = Result<T, SignalError>;

/// Errors that can occur while building a signal graph or scheduler.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    /// Invalid argument provided to a constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Scheduler could not be set up.
    #[error("Scheduler error: {what}")]
    Scheduler { what: String },

    /// Numeric validation failed.
    #[error(transparent)]
    Core(#[from] TkError),
}
