//! Operating phase reported by the host.
//!
//! The signal core never decides the phase; the host sets it on a
//! [`PhaseCell`], and gated nodes read it through the `Bool` gates the cell
//! hands out.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tk_signals::Bool;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Disabled,
    Autonomous,
    Teleop,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Disabled, Phase::Autonomous, Phase::Teleop];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Disabled => "disabled",
            Phase::Autonomous => "autonomous",
            Phase::Teleop => "teleop",
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Phase::Disabled
    }

    fn to_bits(self) -> u8 {
        match self {
            Phase::Disabled => 0,
            Phase::Autonomous => 1,
            Phase::Teleop => 2,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => Phase::Autonomous,
            2 => Phase::Teleop,
            _ => Phase::Disabled,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Shared, lock-free cell holding the current phase. Starts disabled.
#[derive(Debug, Clone, Default)]
pub struct PhaseCell(Arc<AtomicU8>);

impl PhaseCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Phase {
        Phase::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Switch phase; returns the phase that was active before.
    pub fn set(&self, phase: Phase) -> Phase {
        let previous = Phase::from_bits(self.0.swap(phase.to_bits(), Ordering::AcqRel));
        if previous != phase {
            info!(from = %previous, to = %phase, "phase changed");
        }
        previous
    }

    /// Gate that is true while the phase is `phase`.
    pub fn is(&self, phase: Phase) -> Bool {
        let cell = self.clone();
        Bool::from_fn(move || cell.get() == phase)
    }

    /// Gate that is true in every phase except [`Phase::Disabled`].
    pub fn enabled(&self) -> Bool {
        let cell = self.clone();
        Bool::from_fn(move || cell.get().is_enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_follow_the_cell() {
        let cell = PhaseCell::new();
        let auto = cell.is(Phase::Autonomous);
        let enabled = cell.enabled();
        assert_eq!(cell.get(), Phase::Disabled);
        assert!(!auto.get());
        assert!(!enabled.get());

        assert_eq!(cell.set(Phase::Autonomous), Phase::Disabled);
        assert!(auto.get());
        assert!(enabled.get());

        cell.set(Phase::Teleop);
        assert!(!auto.get());
        assert!(enabled.get());
    }

    #[test]
    fn phase_round_trips_through_bits() {
        for phase in Phase::ALL {
            assert_eq!(Phase::from_bits(phase.to_bits()), phase);
        }
        assert_eq!(Phase::from_bits(200), Phase::Disabled);
    }

    #[test]
    fn phase_names_are_snake_case() {
        let phase: Phase = serde_yaml::from_str("teleop").unwrap();
        assert_eq!(phase, Phase::Teleop);
        assert_eq!(Phase::Autonomous.to_string(), "autonomous");
    }
}
