//! Priority-resolved settable variable.

use std::fmt;
use std::sync::Mutex;

use crate::node::{Advance, Node, lock};
use crate::scheduler::Scheduler;
use crate::signal::{Bool, Num, NumSignal};

/// What a triggered rule does to the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarOp {
    Set,
    Add,
    Multiply,
}

impl VarOp {
    fn apply(self, value: f64, operand: f64) -> f64 {
        match self {
            Self::Set => operand,
            Self::Add => value + operand,
            Self::Multiply => value * operand,
        }
    }
}

struct Rule {
    trigger: Bool,
    op: VarOp,
    operand: Num,
}

/// A stored number changed by triggered rules.
///
/// Each cycle the rules are scanned in the order they were added and only
/// the first one whose trigger is true is applied. With no true trigger the
/// value holds. The value starts at `0.0`.
pub struct PriorityVar {
    rules: Mutex<Vec<Rule>>,
    value: Mutex<f64>,
}

impl PriorityVar {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            value: Mutex::new(0.0),
        }
    }

    /// Append a rule at the lowest priority so far.
    pub fn add_rule(&self, trigger: impl Into<Bool>, op: VarOp, operand: impl Into<Num>) {
        lock(&self.rules).push(Rule {
            trigger: trigger.into(),
            op,
            operand: operand.into(),
        });
    }

    /// While `trigger` is true, replace the value with `x`.
    pub fn add_set(&self, trigger: impl Into<Bool>, x: impl Into<Num>) {
        self.add_rule(trigger, VarOp::Set, x);
    }

    /// While `trigger` is true, add `x` to the value every cycle.
    pub fn add_plus(&self, trigger: impl Into<Bool>, x: impl Into<Num>) {
        self.add_rule(trigger, VarOp::Add, x);
    }

    /// While `trigger` is true, multiply the value by `x` every cycle.
    pub fn add_mult(&self, trigger: impl Into<Bool>, x: impl Into<Num>) {
        self.add_rule(trigger, VarOp::Multiply, x);
    }

    pub fn rules(&self) -> usize {
        lock(&self.rules).len()
    }
}

impl Default for PriorityVar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PriorityVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityVar")
            .field("rules", &self.rules())
            .field("value", &self.get())
            .finish()
    }
}

impl Advance for PriorityVar {
    fn advance(&self) {
        // Resolve the winning rule and sample its operand before touching the value.
        let winner = {
            let rules = lock(&self.rules);
            rules
                .iter()
                .find(|rule| rule.trigger.get())
                .map(|rule| (rule.op, rule.operand.clone()))
        };
        if let Some((op, operand)) = winner {
            let operand = operand.get();
            let mut value = lock(&self.value);
            *value = op.apply(*value, operand);
        }
    }
}

impl NumSignal for PriorityVar {
    fn get(&self) -> f64 {
        *lock(&self.value)
    }
}

/// A rule-free variable reading `0.0`, registered with `scheduler`.
pub fn priority_var(scheduler: &Scheduler) -> Node<PriorityVar> {
    Node::attached(PriorityVar::new(), scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn switch(initial: bool) -> (Arc<AtomicBool>, Bool) {
        let flag = Arc::new(AtomicBool::new(initial));
        let reader = flag.clone();
        (flag, Bool::from_fn(move || reader.load(Ordering::Relaxed)))
    }

    #[test]
    fn earliest_true_rule_wins() {
        let sched = Scheduler::manual();
        let var = priority_var(&sched);
        let (reset, reset_p) = switch(false);
        var.add_set(reset_p, 100.0);
        var.add_plus(true, 1.0);
        var.add_mult(true, 10.0);

        sched.run();
        sched.run();
        assert_eq!(var.num().get(), 2.0);

        reset.store(true, Ordering::Relaxed);
        sched.run();
        assert_eq!(var.num().get(), 100.0);
    }

    #[test]
    fn value_holds_without_a_true_trigger() {
        let sched = Scheduler::manual();
        let var = priority_var(&sched);
        let (go, go_p) = switch(true);
        var.add_plus(go_p, 0.5);
        sched.run();
        go.store(false, Ordering::Relaxed);
        sched.run();
        sched.run();
        assert_eq!(var.num().get(), 0.5);
    }

    #[test]
    fn multiply_scales_current_value() {
        let sched = Scheduler::manual();
        let var = priority_var(&sched);
        let (seed, seed_p) = switch(true);
        var.add_set(seed_p, 3.0);
        var.add_mult(true, -2.0);
        sched.run();
        seed.store(false, Ordering::Relaxed);
        sched.run();
        sched.run();
        assert_eq!(var.num().get(), 12.0);
        assert_eq!(var.rules(), 2);
    }

    #[test]
    fn operand_may_read_the_variable_itself() {
        let sched = Scheduler::manual();
        let var = priority_var(&sched);
        var.add_set(true, var.num() + 2.0);
        sched.run();
        sched.run();
        assert_eq!(var.num().get(), 4.0);
    }
}
