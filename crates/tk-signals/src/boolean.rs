//! Stateless boolean combinators and numeric comparisons.

use crate::signal::{Bool, BoolSignal, Num};

/// A signal that always reads `value`.
pub fn constant(value: bool) -> Bool {
    Bool::constant(value)
}

pub fn not(p: impl Into<Bool>) -> Bool {
    Bool::new(Negate(p.into()))
}

pub fn or(p: impl Into<Bool>, q: impl Into<Bool>) -> Bool {
    or_all([p.into(), q.into()])
}

pub fn or3(p: impl Into<Bool>, q: impl Into<Bool>, r: impl Into<Bool>) -> Bool {
    or_all([p.into(), q.into(), r.into()])
}

/// True when any input is true; an empty list reads `false`.
pub fn or_all(ps: impl IntoIterator<Item = Bool>) -> Bool {
    Bool::new(AnyOf(ps.into_iter().collect()))
}

pub fn and(p: impl Into<Bool>, q: impl Into<Bool>) -> Bool {
    and_all([p.into(), q.into()])
}

pub fn and3(p: impl Into<Bool>, q: impl Into<Bool>, r: impl Into<Bool>) -> Bool {
    and_all([p.into(), q.into(), r.into()])
}

/// True when every input is true; an empty list reads `true`.
pub fn and_all(ps: impl IntoIterator<Item = Bool>) -> Bool {
    Bool::new(AllOf(ps.into_iter().collect()))
}

pub fn xor(p: impl Into<Bool>, q: impl Into<Bool>) -> Bool {
    Bool::new(Xor(p.into(), q.into()))
}

/// `x <= y`. Ties count as "less".
pub fn less_than(x: impl Into<Num>, y: impl Into<Num>) -> Bool {
    Bool::new(Compare {
        x: x.into(),
        y: y.into(),
        op: |x, y| x <= y,
    })
}

/// `x >= y`. Ties count as "greater".
pub fn greater_than(x: impl Into<Num>, y: impl Into<Num>) -> Bool {
    Bool::new(Compare {
        x: x.into(),
        y: y.into(),
        op: |x, y| x >= y,
    })
}

struct Negate(Bool);

impl BoolSignal for Negate {
    fn get(&self) -> bool {
        !self.0.get()
    }
}

struct AnyOf(Vec<Bool>);

impl BoolSignal for AnyOf {
    fn get(&self) -> bool {
        self.0.iter().any(Bool::get)
    }
}

struct AllOf(Vec<Bool>);

impl BoolSignal for AllOf {
    fn get(&self) -> bool {
        self.0.iter().all(Bool::get)
    }
}

struct Xor(Bool, Bool);

impl BoolSignal for Xor {
    fn get(&self) -> bool {
        self.0.get() != self.1.get()
    }
}

struct Compare {
    x: Num,
    y: Num,
    op: fn(f64, f64) -> bool,
}

impl BoolSignal for Compare {
    fn get(&self) -> bool {
        (self.op)(self.x.get(), self.y.get())
    }
}
