//! Integration tests for cycle ordering and scheduler lifecycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tk_core::ManualClock;
use tk_signals::{
    Advance, Node, Num, NumSignal, Scheduler, SchedulerMode, WeakScheduler, accumulator,
    feedback, num,
};

/// Reads a signal during its own advance and keeps the last value.
struct Sampler {
    input: Num,
    last: Mutex<f64>,
}

impl Sampler {
    fn new(input: Num) -> Self {
        Self {
            input,
            last: Mutex::new(f64::NAN),
        }
    }
}

impl Advance for Sampler {
    fn advance(&self) {
        let value = self.input.get();
        *self.last.lock().unwrap() = value;
    }
}

impl NumSignal for Sampler {
    fn get(&self) -> f64 {
        *self.last.lock().unwrap()
    }
}

#[test]
fn end_to_end_accumulate_and_reset() {
    let sched = Scheduler::manual();
    let total = accumulator(2.0, &sched);
    for _ in 0..5 {
        sched.run();
    }
    assert_eq!(total.num().get(), 10.0);
    total.reset();
    assert_eq!(total.num().get(), 0.0);
}

#[test]
fn nodes_see_this_cycles_dt() {
    let clock = ManualClock::new();
    let sched = Scheduler::with_clock(SchedulerMode::Manual, clock.clone()).unwrap();
    let sampler = Node::attached(Sampler::new(sched.dt()), &sched);

    for (now, expected) in [(0.02, 0.02), (0.07, 0.05), (0.08, 0.01)] {
        clock.set(now);
        sched.run();
        assert!((sampler.num().get() - expected).abs() < 1e-12);
    }
}

#[test]
fn nodes_advance_in_registration_order() {
    let sched = Scheduler::manual();
    let order = Arc::new(Mutex::new(Vec::new()));

    struct Tagged {
        tag: usize,
        order: Arc<Mutex<Vec<usize>>>,
    }

    impl Advance for Tagged {
        fn advance(&self) {
            self.order.lock().unwrap().push(self.tag);
        }
    }

    let _nodes: Vec<_> = (0..4)
        .map(|tag| {
            Node::attached(
                Tagged {
                    tag,
                    order: order.clone(),
                },
                &sched,
            )
        })
        .collect();
    sched.run();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn panicking_node_does_not_halt_the_cycle() {
    struct Faulty;

    impl Advance for Faulty {
        fn advance(&self) {
            panic!("sensor fault");
        }
    }

    let sched = Scheduler::manual();
    let _faulty = Node::attached(Faulty, &sched);
    let total = accumulator(1.0, &sched);
    sched.run();
    sched.run();
    assert_eq!(total.num().get(), 2.0);
    assert_eq!(sched.cycles(), 2);
}

#[test]
fn reentrant_run_is_skipped() {
    struct Rerun {
        sched: WeakScheduler,
        nested: AtomicUsize,
    }

    impl Advance for Rerun {
        fn advance(&self) {
            if self.sched.upgrade().is_some_and(|sched| sched.run()) {
                self.nested.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    let sched = Scheduler::manual();
    let rerun = Node::attached(
        Rerun {
            sched: sched.downgrade(),
            nested: AtomicUsize::new(0),
        },
        &sched,
    );
    sched.run();
    assert_eq!(rerun.nested.load(Ordering::Relaxed), 0);
    assert_eq!(sched.cycles(), 1);
}

#[test]
fn reset_all_clears_every_accumulator() {
    let sched = Scheduler::manual();
    let a = accumulator(1.0, &sched);
    let b = accumulator(num::constant(-3.0), &sched);
    sched.run();
    sched.reset_all();
    assert_eq!(a.num().get(), 0.0);
    assert_eq!(b.num().get(), 0.0);
}

#[test]
fn feedback_loop_integrates_through_one_cycle_lag() {
    let sched = Scheduler::manual();
    let x = feedback(1.0, &sched);
    // x[k] = x[k-1] * 0.5
    x.bind(x.num() * 0.5);
    for _ in 0..3 {
        sched.run();
    }
    assert_eq!(x.num().get(), 0.125);
}

#[test]
fn timed_scheduler_cycles_on_its_own_and_ignores_run() {
    let sched = Scheduler::timed(Duration::from_millis(2)).unwrap();
    let total = accumulator(1.0, &sched);
    assert!(!sched.run());

    let mut waited = 0;
    while total.num().get() < 3.0 && waited < 500 {
        thread::sleep(Duration::from_millis(2));
        waited += 1;
    }
    assert!(total.num().get() >= 3.0);
    assert!(sched.is_running());

    sched.stop();
    assert!(!sched.is_running());
    let frozen = sched.cycles();
    thread::sleep(Duration::from_millis(10));
    assert_eq!(sched.cycles(), frozen);
}

#[test]
fn timed_scheduler_stops_when_its_last_handle_drops() {
    /// Counts cycles and looks up its own scheduler without owning it.
    struct Ticker {
        sched: WeakScheduler,
        ticks: Arc<AtomicUsize>,
    }

    impl Advance for Ticker {
        fn advance(&self) {
            if self.sched.upgrade().is_some() {
                self.ticks.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    let ticks = Arc::new(AtomicUsize::new(0));
    let sched = Scheduler::timed(Duration::from_millis(2)).unwrap();
    let weak = sched.downgrade();
    let _ticker = Node::attached(
        Ticker {
            sched: sched.downgrade(),
            ticks: ticks.clone(),
        },
        &sched,
    );
    let mut waited = 0;
    while ticks.load(Ordering::Relaxed) < 2 && waited < 500 {
        thread::sleep(Duration::from_millis(2));
        waited += 1;
    }
    assert!(ticks.load(Ordering::Relaxed) >= 2);

    drop(sched);
    thread::sleep(Duration::from_millis(20));
    assert!(weak.upgrade().is_none());
    let frozen = ticks.load(Ordering::Relaxed);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(ticks.load(Ordering::Relaxed), frozen);
}
