use crate::TkError;

/// Floating point type used throughout system
pub type Real = f64;

/// Numerators smaller than this over an exact zero denominator read as `1.0`.
///
/// A `0/0` is routine on the first cycle (e.g. a delta over an elapsed time
/// that has not moved yet), so the quotient resolves it instead of yielding NaN.
pub const QUOTIENT_ZERO_EPS: Real = 1e-4;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, TkError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TkError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, TkError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(TkError::NonPositive { what, value: v })
    }
}

/// Division with the startup `0/0` fallback.
///
/// Any other zero denominator follows IEEE semantics (`±inf` or NaN).
pub fn quotient(x: Real, y: Real) -> Real {
    if y == 0.0 && x.abs() < QUOTIENT_ZERO_EPS {
        return 1.0;
    }
    x / y
}

/// Clamp `x` into `[min, max]`.
///
/// Written as `max(min(x, max), min)` so a reversed range resolves to `min`
/// instead of panicking like `f64::clamp`.
pub fn limit(min: Real, max: Real, x: Real) -> Real {
    x.min(max).max(min)
}

/// Snap `x` to `center` when it lies strictly inside `center ± range`.
pub fn deadband(center: Real, range: Real, x: Real) -> Real {
    if (x - center).abs() < range { center } else { x }
}

/// Round half up: `floor(x + 0.5)`.
///
/// Differs from `f64::round` on negative ties (`-2.5` rounds to `-2.0`).
pub fn round_half_up(x: Real) -> Real {
    (x + 0.5).floor()
}

/// Round `x` to an index into a list of `len` items, clamped into range.
///
/// `len` must be non-zero. NaN selects index 0.
pub fn clamped_index(x: Real, len: usize) -> usize {
    debug_assert!(len > 0);
    if x.is_nan() {
        return 0;
    }
    let last = len.saturating_sub(1) as Real;
    limit(0.0, last, round_half_up(x)) as usize
}

/// Floating point remainder whose sign follows `base`.
pub fn modulo(x: Real, base: Real) -> Real {
    let sign = if base < 0.0 { -1.0 } else { 1.0 };
    sign * (x.abs() % base.abs())
}

/// Sign-preserving power: `sign(x) * |x|^|pow|`.
pub fn abs_pow(x: Real, pow: Real) -> Real {
    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    sign * x.abs().powf(pow.abs())
}
