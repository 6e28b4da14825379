//! Sample history nodes: fixed-length delay lines and change detectors.
//!
//! Both families are generic over the sampled value type through [`Sample`],
//! so numeric and boolean variants share one implementation.

use std::sync::Mutex;

use crate::error::{SignalError, SignalResult};
use crate::node::{Advance, Node, lock};
use crate::scheduler::Scheduler;
use crate::signal::{Bool, BoolSignal, Num, NumSignal};

/// A value type history nodes can record.
///
/// `Default` is the zero value unwritten history reads as (`0.0`, `false`).
pub trait Sample: Copy + Default + Send + Sync + 'static {
    /// The signal handle this type is sampled from.
    type Source: Clone + Send + Sync + 'static;

    fn sample(source: &Self::Source) -> Self;

    /// Change between two consecutive samples; `previous` is `None` before
    /// the second sample.
    fn change(previous: Option<Self>, current: Self) -> Self;
}

impl Sample for f64 {
    type Source = Num;

    fn sample(source: &Num) -> f64 {
        source.get()
    }

    /// `current - previous`, with a missing previous sample counted as `0.0`.
    fn change(previous: Option<f64>, current: f64) -> f64 {
        current - previous.unwrap_or_default()
    }
}

impl Sample for bool {
    type Source = Bool;

    fn sample(source: &Bool) -> bool {
        source.get()
    }

    /// Whether the two samples differ; never true before two real samples.
    fn change(previous: Option<bool>, current: bool) -> bool {
        previous.is_some_and(|previous| previous != current)
    }
}

/// Ring buffer delay line of fixed length `n`.
///
/// Each advance writes the input into the slot at the write index and then
/// moves the index with `i = (i + 1) % n`; a read returns the slot under the
/// index, i.e. the oldest retained sample. A node advanced during cycle `k`
/// before this delay sees the sample from cycle `k - n`; after cycle `k`
/// completes, reads see the sample from cycle `k - n + 1`. Unwritten slots
/// read as the zero value.
pub struct Delay<T: Sample> {
    input: T::Source,
    ring: Mutex<Ring<T>>,
}

struct Ring<T> {
    slots: Vec<T>,
    index: usize,
}

impl<T: Sample> Delay<T> {
    /// Delay `input` by `len` cycles. `len` must be at least 1.
    pub fn new(len: usize, input: T::Source) -> SignalResult<Self> {
        if len == 0 {
            return Err(SignalError::InvalidArg {
                what: "delay length must be at least 1",
            });
        }
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(len)
            .map_err(|_| SignalError::InvalidArg {
                what: "delay length exceeds available memory",
            })?;
        slots.resize(len, T::default());
        Ok(Self {
            input,
            ring: Mutex::new(Ring { slots, index: 0 }),
        })
    }

    pub fn len(&self) -> usize {
        lock(&self.ring).slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn oldest(&self) -> T {
        let ring = lock(&self.ring);
        ring.slots[ring.index]
    }
}

impl<T: Sample> Advance for Delay<T> {
    fn advance(&self) {
        let value = T::sample(&self.input);
        let mut ring = lock(&self.ring);
        let index = ring.index;
        ring.slots[index] = value;
        ring.index = (index + 1) % ring.slots.len();
    }
}

impl NumSignal for Delay<f64> {
    fn get(&self) -> f64 {
        self.oldest()
    }
}

impl BoolSignal for Delay<bool> {
    fn get(&self) -> bool {
        self.oldest()
    }
}

/// Previous-versus-current change detector.
///
/// The numeric form reads `current - previous`; the boolean form reads
/// `current != previous`. Both start from the zero value, so a numeric delta
/// on the first cycle is the first sample itself, while a boolean delta stays
/// false until two real samples differ.
pub struct Delta<T: Sample> {
    input: T::Source,
    state: Mutex<DeltaState<T>>,
}

struct DeltaState<T> {
    previous: Option<T>,
    current: T,
    sampled: bool,
}

impl<T: Sample> Delta<T> {
    pub fn new(input: T::Source) -> Self {
        Self {
            input,
            state: Mutex::new(DeltaState {
                previous: None,
                current: T::default(),
                sampled: false,
            }),
        }
    }

    fn change(&self) -> T {
        let state = lock(&self.state);
        T::change(state.previous, state.current)
    }
}

impl<T: Sample> Advance for Delta<T> {
    fn advance(&self) {
        let value = T::sample(&self.input);
        let mut state = lock(&self.state);
        state.previous = state.sampled.then_some(state.current);
        state.current = value;
        state.sampled = true;
    }
}

impl NumSignal for Delta<f64> {
    fn get(&self) -> f64 {
        self.change()
    }
}

impl BoolSignal for Delta<bool> {
    fn get(&self) -> bool {
        self.change()
    }
}

/// `x` as sampled `len` cycles ago, registered with `scheduler`.
pub fn delay(len: usize, x: impl Into<Num>, scheduler: &Scheduler) -> SignalResult<Node<Delay<f64>>> {
    Ok(Node::attached(Delay::new(len, x.into())?, scheduler))
}

/// `p` as sampled `len` cycles ago, registered with `scheduler`.
pub fn delay_bool(
    len: usize,
    p: impl Into<Bool>,
    scheduler: &Scheduler,
) -> SignalResult<Node<Delay<bool>>> {
    Ok(Node::attached(Delay::new(len, p.into())?, scheduler))
}

/// Per-cycle change of `x`, registered with `scheduler`.
pub fn delta(x: impl Into<Num>, scheduler: &Scheduler) -> Node<Delta<f64>> {
    Node::attached(Delta::new(x.into()), scheduler)
}

/// True on cycles where `p` differs from its previous sample, registered with `scheduler`.
pub fn delta_bool(p: impl Into<Bool>, scheduler: &Scheduler) -> Node<Delta<bool>> {
    Node::attached(Delta::new(p.into()), scheduler)
}
