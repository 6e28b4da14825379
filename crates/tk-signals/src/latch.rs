//! Late-bound feedback node.
//!
//! A [`Feedback`] lets a graph reference a signal before the expression that
//! produces it exists. It reads an initial constant until bound, then reads
//! whatever its source produced on the most recent cycle. The one-cycle lag
//! is what makes a loop through it well defined.

use std::sync::{Mutex, OnceLock};

use tracing::debug;

use crate::node::{Advance, Node, lock};
use crate::scheduler::Scheduler;
use crate::signal::{Num, NumSignal};

pub struct Feedback {
    source: OnceLock<Num>,
    value: Mutex<f64>,
}

impl Feedback {
    /// An unbound node reading `initial`.
    pub fn new(initial: f64) -> Self {
        Self {
            source: OnceLock::new(),
            value: Mutex::new(initial),
        }
    }

    /// Bind the source to sample from now on.
    ///
    /// Only the first bind takes effect; returns whether this one did.
    pub fn bind(&self, source: impl Into<Num>) -> bool {
        let bound = self.source.set(source.into()).is_ok();
        if !bound {
            debug!("feedback node already bound; ignoring rebind");
        }
        bound
    }

    pub fn is_bound(&self) -> bool {
        self.source.get().is_some()
    }
}

impl Advance for Feedback {
    fn advance(&self) {
        if let Some(source) = self.source.get() {
            let sample = source.get();
            *lock(&self.value) = sample;
        }
    }
}

impl NumSignal for Feedback {
    fn get(&self) -> f64 {
        *lock(&self.value)
    }
}

/// An unbound feedback node reading `initial`, registered with `scheduler`.
pub fn feedback(initial: f64, scheduler: &Scheduler) -> Node<Feedback> {
    Node::attached(Feedback::new(initial), scheduler)
}
