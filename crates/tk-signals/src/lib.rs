//! Periodic signal graph and cycle scheduler for tickflow.
//!
//! This crate provides the signal algebra a control loop is written in:
//! composable numeric and boolean signals that are re-read on demand, plus
//! stateful nodes whose memory a [`Scheduler`] updates exactly once per
//! control cycle.
//!
//! # Architecture
//!
//! - Signals ([`Num`], [`Bool`]) are pure "value right now" reads; the
//!   combinators in [`num`], [`boolean`] and [`mux`] hold no state
//! - Stateful nodes implement [`Advance`] and live in a [`Node`]; they start
//!   detached and are registered with at most one scheduler
//! - A scheduler advances its elapsed-time signal first, then every
//!   registered node in registration order
//!
//! # Example
//!
//! ```
//! use tk_signals::{Scheduler, accumulator};
//!
//! let sched = Scheduler::manual();
//! let total = accumulator(2.0, &sched);
//! for _ in 0..5 {
//!     sched.run();
//! }
//! assert_eq!(total.num().get(), 10.0);
//! total.reset();
//! assert_eq!(total.num().get(), 0.0);
//! ```

pub mod accumulate;
pub mod boolean;
pub mod debounce;
pub mod error;
pub mod gate;
pub mod history;
pub mod latch;
pub mod mux;
pub mod node;
pub mod num;
pub mod scheduler;
pub mod signal;
pub mod var;

pub use accumulate::{
    Accumulator, accumulator, derivative, integral, moving_average, recent_window_sum,
};
pub use debounce::{Debounce, debounce, debounce_step, debounce_time, pulse_trigger};
pub use error::{SignalError, SignalResult};
pub use gate::{Gated, gated, gated_action};
pub use history::{Delay, Delta, Sample, delay, delay_bool, delta, delta_bool};
pub use latch::{Feedback, feedback};
pub use mux::{Select, if_then_else, select, select_bool};
pub use node::{Advance, Node, NodeHandle};
pub use scheduler::{Scheduler, SchedulerMode, WeakScheduler};
pub use signal::{Bool, BoolSignal, Num, NumSignal};
pub use var::{PriorityVar, VarOp, priority_var};
