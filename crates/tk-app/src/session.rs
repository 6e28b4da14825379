//! Scripted loop runs: drive the demo wiring through a phase timeline.

use std::thread;
use std::time::{Duration, Instant};

use tk_core::ManualClock;
use tk_signals::{Scheduler, SchedulerMode};
use tracing::info;

use crate::config::LoopConfig;
use crate::demo::{CycleRecord, DemoLoop};
use crate::error::{AppError, AppResult};
use crate::host::Host;

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub records: Vec<CycleRecord>,
    pub elapsed_wall_s: f64,
}

impl RunSummary {
    pub fn last(&self) -> Option<&CycleRecord> {
        self.records.last()
    }
}

/// A configured host plus the wiring it drives.
///
/// In manual mode the scheduler runs on a simulated clock stepped by
/// `period_s` per periodic call, so runs are reproducible. A timed scheduler
/// runs on the wall clock and is only observed once per period.
pub struct Session {
    config: LoopConfig,
    host: Host,
    pacing: Pacing,
    demo: DemoLoop,
}

enum Pacing {
    /// Step this clock by `period_s`, then run a cycle.
    Simulated(ManualClock),
    /// Wait one scheduler period between observations.
    WallClock(Duration),
}

impl Session {
    pub fn new(config: LoopConfig) -> AppResult<Self> {
        config.validate()?;
        let (scheduler, pacing) = match config.scheduler {
            SchedulerMode::Manual => {
                let clock = ManualClock::new();
                let scheduler = Scheduler::with_clock(SchedulerMode::Manual, clock.clone())?;
                (scheduler, Pacing::Simulated(clock))
            }
            mode @ SchedulerMode::Timed { period_s } => {
                let period = Duration::try_from_secs_f64(period_s).map_err(|e| {
                    AppError::InvalidConfig {
                        field: "scheduler.period_s".to_string(),
                        value: period_s.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                (Scheduler::new(mode)?, Pacing::WallClock(period))
            }
        };
        let host = Host::new(scheduler);
        let demo = DemoLoop::build(&host, &config.demo)?;
        Ok(Self {
            config,
            host,
            pacing,
            demo,
        })
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn demo(&self) -> &DemoLoop {
        &self.demo
    }

    /// Drive `config.cycles` periodic calls, reporting each record as it is taken.
    pub fn run(&self, mut on_cycle: impl FnMut(&CycleRecord)) -> RunSummary {
        let started = Instant::now();
        info!(
            cycles = self.config.cycles,
            mode = ?self.config.scheduler,
            "starting run"
        );

        let mut records = Vec::new();
        for call in 0..self.config.cycles {
            self.host.enter(self.config.phase_at(call));
            match &self.pacing {
                Pacing::Simulated(clock) => {
                    clock.advance(self.config.period_s);
                    self.host.periodic();
                }
                Pacing::WallClock(period) => thread::sleep(*period),
            }
            let record = self.demo.sample();
            on_cycle(&record);
            records.push(record);
        }

        self.host.scheduler().stop();
        let elapsed_wall_s = started.elapsed().as_secs_f64();
        info!(
            cycles = self.host.scheduler().cycles(),
            elapsed_wall_s, "run finished"
        );
        RunSummary {
            records,
            elapsed_wall_s,
        }
    }
}
