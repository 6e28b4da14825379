//! Host lifecycle driver and the process-wide default scheduler.

use std::sync::OnceLock;

use tk_signals::Scheduler;
use tracing::debug;

use crate::phase::{Phase, PhaseCell};

static DEFAULT_SCHEDULER: OnceLock<Scheduler> = OnceLock::new();

/// The process-wide manual scheduler, created on first use.
///
/// Only wiring code should reach for this; library code takes a `&Scheduler`.
pub fn default_scheduler() -> Scheduler {
    DEFAULT_SCHEDULER
        .get_or_init(|| {
            debug!("creating default scheduler");
            Scheduler::manual()
        })
        .clone()
}

/// Drives one scheduler from the host's periodic callbacks and publishes the
/// operating phase to gated nodes.
#[derive(Debug, Clone)]
pub struct Host {
    scheduler: Scheduler,
    phase: PhaseCell,
}

impl Host {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            phase: PhaseCell::new(),
        }
    }

    /// A host driving [`default_scheduler`].
    pub fn with_default_scheduler() -> Self {
        Self::new(default_scheduler())
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn phase(&self) -> &PhaseCell {
        &self.phase
    }

    /// Called by the host when its operating phase changes.
    pub fn enter(&self, phase: Phase) {
        self.phase.set(phase);
    }

    /// One periodic callback: runs a single cycle whatever the phase.
    ///
    /// Returns whether a cycle ran; a timed scheduler cycles on its own and
    /// reports `false` here.
    pub fn periodic(&self) -> bool {
        self.scheduler.run()
    }
}
