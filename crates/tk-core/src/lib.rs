//! tk-core: stable foundation for tickflow.
//!
//! Contains:
//! - numeric (Real + tolerances + the float helpers signals are built on)
//! - ids (compact arena keys for scheduler slots)
//! - clock (time sources that drive a scheduler's `t`)
//! - error (shared error types)

pub mod clock;
pub mod error;
pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{TkError, TkResult};
pub use ids::*;
pub use numeric::*;
