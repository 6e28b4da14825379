//! Debounce filters and edge pulses.

use std::sync::Mutex;

use crate::boolean::{and, xor};
use crate::error::SignalResult;
use crate::history::delta_bool;
use crate::node::{Advance, Node, lock};
use crate::scheduler::Scheduler;
use crate::signal::{Bool, BoolSignal, Num};

/// How much disagreement a debounce filter tolerates before it flips.
enum Threshold {
    /// Flip once the input has disagreed for more than this many cycles.
    Steps(u32),
    /// Flip once the summed increments over disagreeing cycles exceed `length`.
    Continuous { length: f64, increment: Num },
}

/// Boolean filter that only changes state once a new input state persists.
///
/// The output starts false. Every cycle the input disagrees with the output,
/// a counter grows (by one, or by the increment signal in continuous form);
/// when it exceeds the threshold the output flips and the counter clears.
/// Any cycle where the input agrees with the output clears the counter.
pub struct Debounce {
    input: Bool,
    threshold: Threshold,
    state: Mutex<DebounceState>,
}

#[derive(Default)]
struct DebounceState {
    output: bool,
    steps: u32,
    elapsed: f64,
}

impl Debounce {
    /// Step form: flips on the `(length + 1)`-th consecutive disagreeing cycle.
    pub fn steps(length: u32, input: impl Into<Bool>) -> Self {
        Self {
            input: input.into(),
            threshold: Threshold::Steps(length),
            state: Mutex::default(),
        }
    }

    /// Continuous form: each disagreeing cycle adds `increment` to the
    /// counter, and the output flips once the total exceeds `length`.
    ///
    /// `length` must be finite.
    pub fn continuous(
        length: f64,
        increment: impl Into<Num>,
        input: impl Into<Bool>,
    ) -> SignalResult<Self> {
        tk_core::ensure_finite(length, "debounce length")?;
        Ok(Self {
            input: input.into(),
            threshold: Threshold::Continuous {
                length,
                increment: increment.into(),
            },
            state: Mutex::default(),
        })
    }

    fn output(&self) -> bool {
        lock(&self.state).output
    }
}

impl Advance for Debounce {
    fn advance(&self) {
        let input = self.input.get();
        if input == self.output() {
            let mut state = lock(&self.state);
            state.steps = 0;
            state.elapsed = 0.0;
            return;
        }

        match &self.threshold {
            Threshold::Steps(length) => {
                let mut state = lock(&self.state);
                state.steps = state.steps.saturating_add(1);
                if state.steps > *length {
                    state.output = !state.output;
                    state.steps = 0;
                }
            }
            Threshold::Continuous { length, increment } => {
                // The increment is only sampled on disagreeing cycles.
                let step = increment.get();
                let mut state = lock(&self.state);
                state.elapsed += step;
                if state.elapsed > *length {
                    state.output = !state.output;
                    state.elapsed = 0.0;
                }
            }
        }
    }
}

impl BoolSignal for Debounce {
    fn get(&self) -> bool {
        self.output()
    }
}

/// Step debounce of `p`, registered with `scheduler`.
pub fn debounce_step(length: u32, p: impl Into<Bool>, scheduler: &Scheduler) -> Node<Debounce> {
    Node::attached(Debounce::steps(length, p), scheduler)
}

/// Continuous debounce of `p` driven by `increment`, registered with `scheduler`.
pub fn debounce(
    length: f64,
    increment: impl Into<Num>,
    p: impl Into<Bool>,
    scheduler: &Scheduler,
) -> SignalResult<Node<Debounce>> {
    Ok(Node::attached(
        Debounce::continuous(length, increment, p)?,
        scheduler,
    ))
}

/// Wall-clock debounce: `p` must hold a new state for more than `length_s`
/// seconds of scheduler time before the output follows.
pub fn debounce_time(
    length_s: f64,
    p: impl Into<Bool>,
    scheduler: &Scheduler,
) -> SignalResult<Node<Debounce>> {
    debounce(length_s, scheduler.dt(), p, scheduler)
}

/// True for the single cycle on which `p` leaves `default_state`.
///
/// Built as `delta(p) AND (p XOR default_state)`, so returning to the
/// default state produces no pulse.
pub fn pulse_trigger(default_state: bool, p: impl Into<Bool>, scheduler: &Scheduler) -> Bool {
    let p = p.into();
    and(delta_bool(p.clone(), scheduler), xor(p, default_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerMode;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tk_core::ManualClock;

    fn switch() -> (Arc<AtomicBool>, Bool) {
        let flag = Arc::new(AtomicBool::new(false));
        let reader = flag.clone();
        (flag, Bool::from_fn(move || reader.load(Ordering::Relaxed)))
    }

    #[test]
    fn step_debounce_flips_after_length_plus_one_cycles() {
        let sched = Scheduler::manual();
        let (flag, p) = switch();
        let filtered = debounce_step(2, p, &sched);

        flag.store(true, Ordering::Relaxed);
        sched.run();
        sched.run();
        assert!(!filtered.boolean().get());
        sched.run();
        assert!(filtered.boolean().get());
    }

    #[test]
    fn agreeing_cycle_clears_the_counter() {
        let sched = Scheduler::manual();
        let (flag, p) = switch();
        let filtered = debounce_step(1, p, &sched);

        flag.store(true, Ordering::Relaxed);
        sched.run();
        flag.store(false, Ordering::Relaxed);
        sched.run();
        flag.store(true, Ordering::Relaxed);
        sched.run();
        assert!(!filtered.boolean().get());
        sched.run();
        assert!(filtered.boolean().get());
    }

    #[test]
    fn zero_length_step_debounce_follows_next_cycle() {
        let sched = Scheduler::manual();
        let filtered = debounce_step(0, true, &sched);
        sched.run();
        assert!(filtered.boolean().get());
    }

    #[test]
    fn time_debounce_waits_for_elapsed_time() {
        let clock = ManualClock::new();
        let sched = Scheduler::with_clock(SchedulerMode::Manual, clock.clone()).unwrap();
        let filtered = debounce_time(0.05, true, &sched).unwrap();

        for _ in 0..2 {
            clock.advance(0.02);
            sched.run();
            assert!(!filtered.boolean().get());
        }
        clock.advance(0.02);
        sched.run();
        assert!(filtered.boolean().get());
    }

    #[test]
    fn non_finite_length_is_rejected() {
        let sched = Scheduler::manual();
        assert!(debounce(f64::NAN, 1.0, true, &sched).is_err());
        assert!(sched.is_empty());
    }

    #[test]
    fn pulse_fires_once_when_leaving_default() {
        let sched = Scheduler::manual();
        let (flag, p) = switch();
        let pulse = pulse_trigger(false, p, &sched);

        let mut seen = Vec::new();
        for level in [false, true, true, false, true] {
            flag.store(level, Ordering::Relaxed);
            sched.run();
            seen.push(pulse.get());
        }
        assert_eq!(seen, vec![false, true, false, false, true]);
    }
}
