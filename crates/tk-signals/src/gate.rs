//! Nodes that only advance while a condition holds.
//!
//! A [`Gated`] node samples its gate every cycle and skips the wrapped work
//! entirely on cycles where the gate is false. The gate itself (e.g. "robot
//! enabled", "autonomous phase") is supplied from outside.

use std::sync::Mutex;

use tracing::trace;

use crate::node::{Advance, Node, NodeHandle, lock};
use crate::scheduler::Scheduler;
use crate::signal::{Bool, BoolSignal};

enum Work {
    /// Another stateful node, advanced through the gate instead of its own scheduler.
    Node(NodeHandle),
    /// A periodic action, e.g. writing an actuator.
    Action(Mutex<Box<dyn FnMut() + Send>>),
}

pub struct Gated {
    gate: Bool,
    work: Work,
}

impl Gated {
    /// Gate a stateful node. The node is detached from any scheduler so it
    /// only advances through this gate.
    pub fn node(gate: impl Into<Bool>, node: &NodeHandle) -> Self {
        node.detach();
        Self {
            gate: gate.into(),
            work: Work::Node(node.clone()),
        }
    }

    /// Gate a periodic action.
    pub fn action<F>(gate: impl Into<Bool>, action: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self {
            gate: gate.into(),
            work: Work::Action(Mutex::new(Box::new(action))),
        }
    }

    /// Whether the wrapped work runs this cycle.
    pub fn is_open(&self) -> bool {
        self.gate.get()
    }
}

impl Advance for Gated {
    fn advance(&self) {
        if !self.gate.get() {
            trace!("gate closed; skipping work");
            return;
        }
        match &self.work {
            Work::Node(node) => node.advance(),
            Work::Action(action) => {
                let mut action = lock(action);
                (*action)();
            }
        }
    }

    fn reset(&self) {
        if let Work::Node(node) = &self.work {
            node.reset();
        }
    }
}

impl BoolSignal for Gated {
    fn get(&self) -> bool {
        self.is_open()
    }
}

/// Advance `node` only on cycles where `gate` is true, registered with `scheduler`.
pub fn gated<T>(gate: impl Into<Bool>, node: &Node<T>, scheduler: &Scheduler) -> Node<Gated> {
    Node::attached(Gated::node(gate, node.handle()), scheduler)
}

/// Run `action` once per cycle where `gate` is true, registered with `scheduler`.
pub fn gated_action<F>(gate: impl Into<Bool>, action: F, scheduler: &Scheduler) -> Node<Gated>
where
    F: FnMut() + Send + 'static,
{
    Node::attached(Gated::action(gate, action), scheduler)
}
