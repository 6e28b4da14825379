//! Running sums and the time-domain operators built on them.
//!
//! Only [`Accumulator`] is a node of its own; the derivative, integral,
//! window-sum and moving-average operators are compositions of
//! accumulators, delays, deltas and the scheduler's time signals.

use std::sync::Mutex;

use crate::error::SignalResult;
use crate::history::{delay, delta};
use crate::node::{Advance, Node, lock};
use crate::num::{difference, product, quotient};
use crate::scheduler::Scheduler;
use crate::signal::{Num, NumSignal};

/// Running sum of every per-cycle input sample since creation or the last reset.
pub struct Accumulator {
    input: Num,
    sum: Mutex<f64>,
}

impl Accumulator {
    pub fn new(input: impl Into<Num>) -> Self {
        Self {
            input: input.into(),
            sum: Mutex::new(0.0),
        }
    }
}

impl Advance for Accumulator {
    fn advance(&self) {
        let sample = self.input.get();
        *lock(&self.sum) += sample;
    }

    /// Zero the sum. Registration is untouched.
    fn reset(&self) {
        *lock(&self.sum) = 0.0;
    }
}

impl NumSignal for Accumulator {
    fn get(&self) -> f64 {
        *lock(&self.sum)
    }
}

/// Running sum of `x`, registered with `scheduler`.
pub fn accumulator(x: impl Into<Num>, scheduler: &Scheduler) -> Node<Accumulator> {
    Node::attached(Accumulator::new(x), scheduler)
}

/// Per-cycle rate of change: `delta(x) / dt`.
///
/// Reads `1.0` before the first cycle, when both terms are zero.
pub fn derivative(x: impl Into<Num>, scheduler: &Scheduler) -> Num {
    quotient(delta(x, scheduler), scheduler.dt())
}

/// Time integral of `x` by the rectangle rule: `accumulator(x * dt)`.
pub fn integral(x: impl Into<Num>, scheduler: &Scheduler) -> Node<Accumulator> {
    accumulator(product(x, scheduler.dt()), scheduler)
}

/// Sum over a trailing window, kept as `accumulator(x - delay(len, x))`.
///
/// The window is updated incrementally rather than re-summed, so very long
/// runs may accumulate floating-point drift. The delay advances before the
/// accumulator within a cycle, so after each cycle the sum covers the
/// `len - 1` most recent samples.
pub fn recent_window_sum(
    len: usize,
    x: impl Into<Num>,
    scheduler: &Scheduler,
) -> SignalResult<Node<Accumulator>> {
    let x = x.into();
    let delayed = delay(len, x.clone(), scheduler)?;
    Ok(accumulator(difference(x, delayed), scheduler))
}

/// Time-weighted average of `x` over the trailing `len` cycles:
/// `recent_window_sum(len, x * dt) / (t - delay(len, t))`.
///
/// Weighting by `dt` keeps unevenly spaced cycles from skewing the mean.
pub fn moving_average(len: usize, x: impl Into<Num>, scheduler: &Scheduler) -> SignalResult<Num> {
    let weighted = recent_window_sum(len, product(x, scheduler.dt()), scheduler)?;
    let t = scheduler.t();
    let window = difference(t.clone(), delay(len, t, scheduler)?);
    Ok(quotient(weighted, window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerMode;
    use tk_core::{ManualClock, Tolerances, nearly_equal};

    fn close(a: f64, b: f64) -> bool {
        nearly_equal(a, b, Tolerances::default())
    }

    fn on_manual_clock() -> (ManualClock, Scheduler) {
        let clock = ManualClock::new();
        let sched = Scheduler::with_clock(SchedulerMode::Manual, clock.clone()).unwrap();
        (clock, sched)
    }

    #[test]
    fn accumulator_sums_and_resets() {
        let sched = Scheduler::manual();
        let acc = accumulator(2.0, &sched);
        for _ in 0..5 {
            sched.run();
        }
        assert_eq!(acc.num().get(), 10.0);
        acc.reset();
        assert_eq!(acc.num().get(), 0.0);
        assert!(sched.contains(acc.handle()));
        sched.run();
        assert_eq!(acc.num().get(), 2.0);
    }

    #[test]
    fn integral_of_constant_is_linear_in_time() {
        let (clock, sched) = on_manual_clock();
        let area = integral(3.0, &sched);
        for k in 1..=10 {
            clock.set(0.02 * k as f64);
            sched.run();
        }
        assert!(close(area.num().get(), 0.6));
    }

    #[test]
    fn derivative_of_ramp_is_its_slope() {
        let (clock, sched) = on_manual_clock();
        let t = sched.t();
        let slope = derivative(t * 4.0, &sched);
        for k in 1..=4 {
            clock.set(0.05 * k as f64);
            sched.run();
            assert!(close(slope.get(), 4.0));
        }
    }

    #[test]
    fn window_sum_tracks_recent_samples() {
        let sched = Scheduler::manual();
        let cycle = {
            let sched = sched.downgrade();
            Num::from_fn(move || sched.upgrade().map_or(0.0, |s| s.cycles() as f64 + 1.0))
        };
        // Sample on cycle k is k.
        let window = recent_window_sum(3, cycle, &sched).unwrap();
        let mut seen = Vec::new();
        for _ in 0..5 {
            sched.run();
            seen.push(window.num().get());
        }
        assert_eq!(seen, vec![1.0, 3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn window_sum_rejects_empty_window() {
        let sched = Scheduler::manual();
        assert!(recent_window_sum(0, 1.0, &sched).is_err());
        assert!(sched.is_empty());
    }

    #[test]
    fn moving_average_of_constant_is_constant() {
        let (clock, sched) = on_manual_clock();
        let avg = moving_average(4, 5.0, &sched).unwrap();
        // Uneven spacing must not skew the mean.
        for dt in [0.02, 0.05, 0.01, 0.03, 0.02, 0.04] {
            clock.advance(dt);
            sched.run();
            assert!(close(avg.get(), 5.0));
        }
    }
}
