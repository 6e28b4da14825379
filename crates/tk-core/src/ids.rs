use core::fmt;
use core::num::NonZeroU32;

/// Compact, stable identifier for schedulers and their registered nodes.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// The Id of index 0.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Create an Id from a 0-based index by storing index+1.
    ///
    /// Returns `None` when `index` is `u32::MAX` (index+1 would overflow).
    pub fn from_index(index: u32) -> Option<Self> {
        index.checked_add(1).and_then(NonZeroU32::new).map(Self)
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Registration key of a stateful node; increases with registration order.
pub type NodeKey = Id;
/// Process-unique scheduler identity, used in logs and registration checks.
pub type SchedulerId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip_index() {
        for i in [0_u32, 1, 2, 42, 10_000] {
            let id = Id::from_index(i).unwrap();
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn id_rejects_overflowing_index() {
        assert!(Id::from_index(u32::MAX).is_none());
        assert_eq!(Id::from_index(0), Some(Id::FIRST));
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }
}
