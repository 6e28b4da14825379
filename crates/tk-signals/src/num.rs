//! Stateless numeric combinators.
//!
//! Every combinator here is a pure function of its inputs' current values,
//! recomputed on each read. None of them registers with a scheduler.

use tk_core::numeric;

use crate::signal::{Bool, Num, NumSignal};

/// A signal that always reads `value`.
pub fn constant(value: f64) -> Num {
    Num::constant(value)
}

/// `x + y`
pub fn sum(x: impl Into<Num>, y: impl Into<Num>) -> Num {
    sum_all([x.into(), y.into()])
}

/// `x + y + z`
pub fn sum3(x: impl Into<Num>, y: impl Into<Num>, z: impl Into<Num>) -> Num {
    sum_all([x.into(), y.into(), z.into()])
}

/// Sum of any number of signals; an empty list reads `0.0`.
pub fn sum_all(xs: impl IntoIterator<Item = Num>) -> Num {
    Num::new(Sum(xs.into_iter().collect()))
}

/// `x * y`
pub fn product(x: impl Into<Num>, y: impl Into<Num>) -> Num {
    product_all([x.into(), y.into()])
}

/// `x * y * z`
pub fn product3(x: impl Into<Num>, y: impl Into<Num>, z: impl Into<Num>) -> Num {
    product_all([x.into(), y.into(), z.into()])
}

/// Product of any number of signals; an empty list reads `1.0`.
pub fn product_all(xs: impl IntoIterator<Item = Num>) -> Num {
    Num::new(Product(xs.into_iter().collect()))
}

/// `x - y`
pub fn difference(x: impl Into<Num>, y: impl Into<Num>) -> Num {
    Num::new(Binary::new(x, y, |x, y| x - y))
}

/// `x / y`, except that a zero `y` over a numerator within `1e-4` of zero
/// reads `1.0`.
///
/// Any other zero denominator gives the IEEE result (`±inf` or NaN).
pub fn quotient(x: impl Into<Num>, y: impl Into<Num>) -> Num {
    Num::new(Binary::new(x, y, numeric::quotient))
}

/// `1.0` while `p` is true, `0.0` otherwise.
pub fn bool_to_num(p: impl Into<Bool>) -> Num {
    Num::new(BoolToNum(p.into()))
}

/// Clamp `x` into `[min, max]`.
pub fn limit(min: impl Into<Num>, max: impl Into<Num>, x: impl Into<Num>) -> Num {
    Num::new(Ternary::new(min, max, x, numeric::limit))
}

/// `center` while `|x - center| < range`, else `x`.
pub fn deadband(center: impl Into<Num>, range: impl Into<Num>, x: impl Into<Num>) -> Num {
    Num::new(Ternary::new(center, range, x, numeric::deadband))
}

/// Remainder of `x / base` whose sign follows `base`.
pub fn modulo(x: impl Into<Num>, base: impl Into<Num>) -> Num {
    Num::new(Binary::new(x, base, numeric::modulo))
}

/// `sign(x) * |x|^|pow|`, e.g. for squaring a joystick axis without losing direction.
pub fn abs_pow(x: impl Into<Num>, pow: impl Into<Num>) -> Num {
    Num::new(Binary::new(x, pow, numeric::abs_pow))
}

struct Sum(Vec<Num>);

impl NumSignal for Sum {
    fn get(&self) -> f64 {
        self.0.iter().map(Num::get).sum()
    }
}

struct Product(Vec<Num>);

impl NumSignal for Product {
    fn get(&self) -> f64 {
        self.0.iter().map(Num::get).product()
    }
}

struct Binary {
    x: Num,
    y: Num,
    op: fn(f64, f64) -> f64,
}

impl Binary {
    fn new(x: impl Into<Num>, y: impl Into<Num>, op: fn(f64, f64) -> f64) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            op,
        }
    }
}

impl NumSignal for Binary {
    fn get(&self) -> f64 {
        (self.op)(self.x.get(), self.y.get())
    }
}

struct Ternary {
    a: Num,
    b: Num,
    x: Num,
    op: fn(f64, f64, f64) -> f64,
}

impl Ternary {
    fn new(
        a: impl Into<Num>,
        b: impl Into<Num>,
        x: impl Into<Num>,
        op: fn(f64, f64, f64) -> f64,
    ) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            x: x.into(),
            op,
        }
    }
}

impl NumSignal for Ternary {
    fn get(&self) -> f64 {
        (self.op)(self.a.get(), self.b.get(), self.x.get())
    }
}

struct BoolToNum(Bool);

impl NumSignal for BoolToNum {
    fn get(&self) -> f64 {
        if self.0.get() { 1.0 } else { 0.0 }
    }
}
