//! The clock pulse: one discrete simulated-time advance.
//!
//! A [`ClockPulse`] is created once per tick by the master clock and handed
//! read-only to every settlement. Its fields are private so that nothing
//! downstream can alter the timeline it describes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Millisols in one sol (one Martian day).
pub const MILLISOLS_PER_SOL: f64 = 1_000.0;

/// An immutable description of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClockPulse {
    /// Monotonically increasing pulse id (first pulse is 1).
    id: u64,
    /// Simulated time covered by this pulse, in millisols. Always > 0.
    elapsed_millisols: f64,
    /// Absolute simulated time at the end of this pulse, in millisols.
    total_millisols: f64,
    /// Sol number at the end of this pulse.
    sol: u64,
    /// Whether this pulse crossed a sol boundary.
    is_new_sol: bool,
}

impl ClockPulse {
    /// Build a pulse. Only the master clock (and tests) should call this.
    pub const fn new(
        id: u64,
        elapsed_millisols: f64,
        total_millisols: f64,
        sol: u64,
        is_new_sol: bool,
    ) -> Self {
        Self {
            id,
            elapsed_millisols,
            total_millisols,
            sol,
            is_new_sol,
        }
    }

    /// Pulse id.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Simulated millisols covered by this pulse.
    pub const fn elapsed(&self) -> f64 {
        self.elapsed_millisols
    }

    /// Absolute simulated time in millisols at the end of the pulse.
    pub const fn now(&self) -> f64 {
        self.total_millisols
    }

    /// Sol number at the end of the pulse.
    pub const fn sol(&self) -> u64 {
        self.sol
    }

    /// Whether a new sol started during this pulse.
    pub const fn is_new_sol(&self) -> bool {
        self.is_new_sol
    }

    /// Millisol of the current sol (`0.0..1000.0`).
    pub fn millisol_of_sol(&self) -> f64 {
        self.total_millisols.rem_euclid(MILLISOLS_PER_SOL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisol_of_sol_wraps() {
        let pulse = ClockPulse::new(3, 5.0, 2_250.5, 2, false);
        assert!((pulse.millisol_of_sol() - 250.5).abs() < 1e-9);
        assert_eq!(pulse.sol(), 2);
        assert_eq!(pulse.id(), 3);
    }
}
