//! Index-selecting multiplexers.
//!
//! The selector is rounded half up (`floor(x + 0.5)`) and clamped into the
//! option range on every read, so fractional or out-of-range selectors fall
//! back to the nearest valid option. A NaN selector picks the first option.

use tk_core::clamped_index;

use crate::error::{SignalError, SignalResult};
use crate::num::bool_to_num;
use crate::signal::{Bool, BoolSignal, Num, NumSignal};

/// Picks one of a fixed list of options by a numeric selector.
///
/// Purely computed per read; never registered with a scheduler.
pub struct Select<S> {
    index: Num,
    options: Vec<S>,
}

impl<S> Select<S> {
    /// Selector over `options`, which must not be empty.
    pub fn new(index: impl Into<Num>, options: Vec<S>) -> SignalResult<Self> {
        if options.is_empty() {
            return Err(SignalError::InvalidArg {
                what: "multiplexer needs at least one option",
            });
        }
        Ok(Self {
            index: index.into(),
            options,
        })
    }

    fn selected(&self) -> &S {
        &self.options[clamped_index(self.index.get(), self.options.len())]
    }
}

impl NumSignal for Select<Num> {
    fn get(&self) -> f64 {
        self.selected().get()
    }
}

impl BoolSignal for Select<Bool> {
    fn get(&self) -> bool {
        self.selected().get()
    }
}

/// Numeric multiplexer over `options`.
pub fn select(index: impl Into<Num>, options: impl IntoIterator<Item = Num>) -> SignalResult<Num> {
    Ok(Num::new(Select::new(index, options.into_iter().collect())?))
}

/// Boolean multiplexer over `options`.
pub fn select_bool(
    index: impl Into<Num>,
    options: impl IntoIterator<Item = Bool>,
) -> SignalResult<Bool> {
    Ok(Bool::new(Select::new(index, options.into_iter().collect())?))
}

/// `then` while `cond` is true, `otherwise` while it is false.
pub fn if_then_else(cond: impl Into<Bool>, then: impl Into<Num>, otherwise: impl Into<Num>) -> Num {
    Num::new(Select {
        index: bool_to_num(cond),
        options: vec![otherwise.into(), then.into()],
    })
}
