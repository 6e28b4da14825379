//! Demo wiring: a simulated position loop built from the signal library.
//!
//! Autonomous holds a fixed setpoint, teleop follows a synthetic operator
//! stick, and the plant only moves while the host reports an enabled phase.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tk_signals::boolean::{and, greater_than, less_than};
use tk_signals::num::{abs_pow, deadband, limit};
use tk_signals::{
    Accumulator, Bool, Debounce, Feedback, Gated, Node, Num, PriorityVar, debounce_step, derivative,
    feedback, gated, if_then_else, integral, moving_average, priority_var, pulse_trigger,
};
use tracing::debug;

use crate::config::DemoConfig;
use crate::error::AppResult;
use crate::host::Host;
use crate::phase::Phase;

/// One row of the per-cycle trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle: u64,
    pub t_s: f64,
    pub phase: Phase,
    pub setpoint: f64,
    pub position: f64,
    pub speed: f64,
    pub smoothed_speed: f64,
    pub measured_rate: f64,
    pub at_target: bool,
    pub settled_cycles: f64,
    pub engaged: bool,
}

pub struct DemoLoop {
    host: Host,
    setpoint: Num,
    position: Node<Feedback>,
    speed: Num,
    travel: Node<Accumulator>,
    drive: Node<Gated>,
    smoothed: Num,
    rate: Num,
    at_target: Node<Debounce>,
    settled: Node<PriorityVar>,
    engaged: Bool,
}

impl DemoLoop {
    /// Wire the loop onto `host`'s scheduler.
    pub fn build(host: &Host, cfg: &DemoConfig) -> AppResult<Self> {
        let sched = host.scheduler();
        let enabled = host.phase().enabled();
        let autonomous = host.phase().is(Phase::Autonomous);

        let t = sched.t();
        let hz = cfg.stick_hz;
        let stick = Num::from_fn(move || (TAU * hz * t.get()).sin());
        let stick = deadband(0.0, cfg.stick_deadband, abs_pow(stick, 2.0));
        let setpoint = if_then_else(autonomous, cfg.auto_setpoint, stick);

        // The plant integrates the commanded speed; position feeds back one cycle late.
        let position = feedback(0.0, sched);
        let error = setpoint.clone() - position.num();
        let speed = limit(-cfg.max_speed, cfg.max_speed, error.clone() * cfg.gain);
        let travel = integral(speed.clone(), sched);
        let drive = gated(enabled.clone(), &travel, sched);
        position.bind(&travel);

        let within = and(
            less_than(error.clone(), cfg.tolerance),
            greater_than(error, -cfg.tolerance),
        );
        let at_target = debounce_step(cfg.debounce_cycles, within, sched);
        let smoothed = moving_average(cfg.average_window, speed.clone(), sched)?;
        let rate = derivative(position.num(), sched);

        let engaged = pulse_trigger(false, enabled, sched);
        let settled = priority_var(sched);
        settled.add_set(engaged.clone(), 0.0);
        settled.add_plus(&at_target, 1.0);

        debug!(nodes = sched.len(), "demo loop wired");
        Ok(Self {
            host: host.clone(),
            setpoint,
            position,
            speed,
            travel,
            drive,
            smoothed,
            rate,
            at_target,
            settled,
            engaged,
        })
    }

    /// Snapshot every output after the most recent cycle.
    pub fn sample(&self) -> CycleRecord {
        let sched = self.host.scheduler();
        CycleRecord {
            cycle: sched.cycles(),
            t_s: sched.t().get(),
            phase: self.host.phase().get(),
            setpoint: self.setpoint.get(),
            position: self.position.num().get(),
            speed: self.speed.get(),
            smoothed_speed: self.smoothed.get(),
            measured_rate: self.rate.get(),
            at_target: self.at_target.boolean().get(),
            settled_cycles: self.settled.num().get(),
            engaged: self.engaged.get(),
        }
    }

    /// Zero the plant's travel. Position follows on the next cycle.
    pub fn reset(&self) {
        self.drive.reset();
    }

    pub fn travel(&self) -> Num {
        self.travel.num()
    }
}
