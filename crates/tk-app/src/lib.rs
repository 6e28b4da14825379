//! Application wiring layer for tickflow.
//!
//! This crate sits on top of the signal library and provides what a host
//! program needs to put a control loop in service: a YAML loop
//! configuration, the operating phase, a periodic driver, the process-wide
//! default scheduler, and a demo wiring used by the CLI.

pub mod config;
pub mod demo;
pub mod error;
pub mod host;
pub mod phase;
pub mod session;

pub use config::{DemoConfig, LoopConfig, PhaseStep, load_yaml, save_yaml};
pub use demo::{CycleRecord, DemoLoop};
pub use error::{AppError, AppResult};
pub use host::{Host, default_scheduler};
pub use phase::{Phase, PhaseCell};
pub use session::{RunSummary, Session};
