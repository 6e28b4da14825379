//! Signal read interfaces and their shared handles.
//!
//! A signal is "the value right now": every read recomputes from the inputs
//! (or reports what a stateful node stored during its last advance). Nothing
//! is cached between reads.

use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Not, Sub};
use std::sync::Arc;

use crate::boolean;
use crate::num;

/// Produces the current numeric value on demand.
pub trait NumSignal: Send + Sync {
    fn get(&self) -> f64;
}

/// Produces the current boolean value on demand.
pub trait BoolSignal: Send + Sync {
    fn get(&self) -> bool;
}

/// Shared handle on a numeric signal.
///
/// Cloning is cheap and clones read the same underlying signal.
#[derive(Clone)]
pub struct Num(Arc<dyn NumSignal>);

impl Num {
    /// Wrap any numeric signal.
    pub fn new<S: NumSignal + 'static>(signal: S) -> Self {
        Self(Arc::new(signal))
    }

    /// Wrap an already shared signal.
    pub fn from_arc(signal: Arc<dyn NumSignal>) -> Self {
        Self(signal)
    }

    /// A signal that always reads `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(Constant(value))
    }

    /// Adapt a closure, e.g. a sensor read, into a signal.
    pub fn from_fn<F>(read: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Self::new(FnSignal(read))
    }

    /// Current value.
    pub fn get(&self) -> f64 {
        self.0.get()
    }
}

impl NumSignal for Num {
    fn get(&self) -> f64 {
        self.0.get()
    }
}

impl fmt::Debug for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Num")
    }
}

impl From<f64> for Num {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl From<Arc<dyn NumSignal>> for Num {
    fn from(signal: Arc<dyn NumSignal>) -> Self {
        Self(signal)
    }
}

/// Shared handle on a boolean signal.
#[derive(Clone)]
pub struct Bool(Arc<dyn BoolSignal>);

impl Bool {
    /// Wrap any boolean signal.
    pub fn new<S: BoolSignal + 'static>(signal: S) -> Self {
        Self(Arc::new(signal))
    }

    /// Wrap an already shared signal.
    pub fn from_arc(signal: Arc<dyn BoolSignal>) -> Self {
        Self(signal)
    }

    /// A signal that always reads `value`.
    pub fn constant(value: bool) -> Self {
        Self::new(Constant(value))
    }

    /// Adapt a closure, e.g. a button read, into a signal.
    pub fn from_fn<F>(read: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::new(FnSignal(read))
    }

    /// Current value.
    pub fn get(&self) -> bool {
        self.0.get()
    }
}

impl BoolSignal for Bool {
    fn get(&self) -> bool {
        self.0.get()
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Bool")
    }
}

impl From<bool> for Bool {
    fn from(value: bool) -> Self {
        Self::constant(value)
    }
}

impl From<Arc<dyn BoolSignal>> for Bool {
    fn from(signal: Arc<dyn BoolSignal>) -> Self {
        Self(signal)
    }
}

struct Constant<T>(T);

impl NumSignal for Constant<f64> {
    fn get(&self) -> f64 {
        self.0
    }
}

impl BoolSignal for Constant<bool> {
    fn get(&self) -> bool {
        self.0
    }
}

struct FnSignal<F>(F);

impl<F> NumSignal for FnSignal<F>
where
    F: Fn() -> f64 + Send + Sync,
{
    fn get(&self) -> f64 {
        (self.0)()
    }
}

impl<F> BoolSignal for FnSignal<F>
where
    F: Fn() -> bool + Send + Sync,
{
    fn get(&self) -> bool {
        (self.0)()
    }
}

impl<R: Into<Num>> Add<R> for Num {
    type Output = Num;

    fn add(self, rhs: R) -> Num {
        num::sum(self, rhs)
    }
}

impl<R: Into<Num>> Sub<R> for Num {
    type Output = Num;

    fn sub(self, rhs: R) -> Num {
        num::difference(self, rhs)
    }
}

impl<R: Into<Num>> Mul<R> for Num {
    type Output = Num;

    fn mul(self, rhs: R) -> Num {
        num::product(self, rhs)
    }
}

impl<R: Into<Num>> Div<R> for Num {
    type Output = Num;

    fn div(self, rhs: R) -> Num {
        num::quotient(self, rhs)
    }
}

impl Not for Bool {
    type Output = Bool;

    fn not(self) -> Bool {
        boolean::not(self)
    }
}

impl<R: Into<Bool>> BitAnd<R> for Bool {
    type Output = Bool;

    fn bitand(self, rhs: R) -> Bool {
        boolean::and(self, rhs)
    }
}

impl<R: Into<Bool>> BitOr<R> for Bool {
    type Output = Bool;

    fn bitor(self, rhs: R) -> Bool {
        boolean::or(self, rhs)
    }
}

impl<R: Into<Bool>> BitXor<R> for Bool {
    type Output = Bool;

    fn bitxor(self, rhs: R) -> Bool {
        boolean::xor(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn constants_read_back() {
        assert_eq!(Num::constant(2.5).get(), 2.5);
        assert!(Bool::constant(true).get());
        assert_eq!(Num::from(4.0).get(), 4.0);
        assert!(!Bool::from(false).get());
    }

    #[test]
    fn closure_signals_are_requeried_on_every_read() {
        let raw = Arc::new(AtomicU64::new(1.0f64.to_bits()));
        let sensor = {
            let raw = raw.clone();
            Num::from_fn(move || f64::from_bits(raw.load(Ordering::Relaxed)))
        };
        assert_eq!(sensor.get(), 1.0);
        raw.store(7.0f64.to_bits(), Ordering::Relaxed);
        assert_eq!(sensor.get(), 7.0);
    }

    #[test]
    fn operators_build_combinators() {
        let x = Num::constant(6.0);
        let y = Num::constant(3.0);
        assert_eq!((x.clone() + y.clone()).get(), 9.0);
        assert_eq!((x.clone() - y.clone()).get(), 3.0);
        assert_eq!((x.clone() * 0.5).get(), 3.0);
        assert_eq!((x / y).get(), 2.0);

        let p = Bool::constant(true);
        let q = Bool::constant(false);
        assert!(!(!p.clone()).get());
        assert!((p.clone() | q.clone()).get());
        assert!(!(p.clone() & q.clone()).get());
        assert!((p ^ q).get());
    }
}
