//! Master clock and simulated Mars time for the Habitat scheduler.
//!
//! The clock is the single ticking authority for the whole colony. Each
//! real-time step is converted into simulated millisols and, unless the
//! step is empty, turned into exactly one [`ClockPulse`] that the
//! dispatcher fans out to every settlement.
//!
//! # Design Principles
//!
//! - Pulse ids use checked arithmetic (no silent overflow).
//! - Sol number and millisol of sol are derived from the running total,
//!   never stored independently.
//! - Bad elapsed time is a fatal error; an empty step is not a pulse.

use std::time::Duration;

use habitat_types::{ClockPulse, MILLISOLS_PER_SOL};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClockConfig;

/// Real milliseconds in one millisol (one thousandth of a sol).
pub const MILLIS_PER_MILLISOL: f64 = 88_775.244;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Pulse counter would overflow.
    #[error("pulse counter overflow: cannot advance beyond u64::MAX")]
    PulseOverflow,

    /// Elapsed time was negative or not a finite number.
    #[error("invalid elapsed time: {millisols} millisols")]
    InvalidElapsed {
        /// The rejected elapsed time.
        millisols: f64,
    },

    /// Invalid clock configuration (e.g. a zero time ratio).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// A point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarsTime {
    /// Sol number (0-indexed).
    pub sol: u64,
    /// Millisol of the sol (`0.0..1000.0`).
    pub millisol: f64,
}

impl MarsTime {
    /// Split an absolute millisol count into sol and millisol of sol.
    pub fn from_total(total_millisols: f64) -> Self {
        let total = total_millisols.max(0.0);
        Self {
            sol: sol_of(total),
            millisol: total.rem_euclid(MILLISOLS_PER_SOL),
        }
    }
}

impl std::fmt::Display for MarsTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sol {} {:07.3} msol", self.sol, self.millisol)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sol_of(total_millisols: f64) -> u64 {
    // Saturating float-to-int cast; the total is clamped non-negative by callers.
    (total_millisols / MILLISOLS_PER_SOL).floor() as u64
}

/// The process-wide simulated clock.
///
/// Owned by the simulation and advanced once per real-time step. Pulse ids
/// start at 1; the id of the last emitted pulse is available through
/// [`pulse_id`](Self::pulse_id).
#[derive(Debug, Clone, PartialEq)]
pub struct MasterClock {
    /// Id of the last emitted pulse (0 before the first pulse).
    pulse_id: u64,

    /// Absolute simulated time in millisols.
    total_millisols: f64,

    /// Simulated seconds per real second.
    time_ratio: f64,

    /// Largest elapsed time a single pulse may cover.
    max_pulse_millisols: f64,

    /// Number of empty steps that did not produce a pulse.
    suppressed: u64,
}

impl MasterClock {
    /// Create a clock from configuration, starting at
    /// `config.start_millisols`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if the time ratio or the pulse
    /// ceiling is not a positive finite number, or the start time is
    /// negative.
    pub fn new(config: &ClockConfig) -> Result<Self, ClockError> {
        Self::from_parts(0, config.start_millisols, config)
    }

    /// Create a clock from explicit parameters (useful for testing and
    /// state restoration).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] under the same conditions as
    /// [`new`](Self::new).
    pub fn from_parts(
        pulse_id: u64,
        total_millisols: f64,
        config: &ClockConfig,
    ) -> Result<Self, ClockError> {
        if !(config.time_ratio.is_finite() && config.time_ratio > 0.0) {
            return Err(ClockError::InvalidConfig {
                reason: format!("time_ratio must be positive, got {}", config.time_ratio),
            });
        }
        if !(config.max_pulse_millisols.is_finite() && config.max_pulse_millisols > 0.0) {
            return Err(ClockError::InvalidConfig {
                reason: format!(
                    "max_pulse_millisols must be positive, got {}",
                    config.max_pulse_millisols
                ),
            });
        }
        if !(total_millisols.is_finite() && total_millisols >= 0.0) {
            return Err(ClockError::InvalidConfig {
                reason: format!("start time must be non-negative, got {total_millisols}"),
            });
        }
        Ok(Self {
            pulse_id,
            total_millisols,
            time_ratio: config.time_ratio,
            max_pulse_millisols: config.max_pulse_millisols,
            suppressed: 0,
        })
    }

    /// Advance by a real-time step.
    ///
    /// The step is scaled by the time ratio and converted to millisols,
    /// then handed to [`advance_millisols`](Self::advance_millisols).
    ///
    /// # Errors
    ///
    /// Same as [`advance_millisols`](Self::advance_millisols).
    pub fn advance(&mut self, real_elapsed: Duration) -> Result<Option<ClockPulse>, ClockError> {
        let millis = real_elapsed.as_secs_f64() * 1_000.0;
        self.advance_millisols(millis * self.time_ratio / MILLIS_PER_MILLISOL)
    }

    /// Advance by `elapsed` simulated millisols and return the pulse.
    ///
    /// A zero step is counted and suppressed: it returns `Ok(None)` and
    /// consumes no pulse id. Steps longer than the configured ceiling are
    /// clamped to it.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidElapsed`] if `elapsed` is negative or
    /// not finite, and [`ClockError::PulseOverflow`] if the pulse id would
    /// exceed `u64::MAX`.
    pub fn advance_millisols(&mut self, elapsed: f64) -> Result<Option<ClockPulse>, ClockError> {
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(ClockError::InvalidElapsed { millisols: elapsed });
        }
        if elapsed <= 0.0 {
            self.suppressed = self.suppressed.saturating_add(1);
            debug!(pulse = self.pulse_id, suppressed = self.suppressed, "empty step suppressed");
            return Ok(None);
        }
        let elapsed = if elapsed > self.max_pulse_millisols {
            warn!(
                requested = elapsed,
                ceiling = self.max_pulse_millisols,
                "pulse clamped to ceiling"
            );
            self.max_pulse_millisols
        } else {
            elapsed
        };

        let id = self.pulse_id.checked_add(1).ok_or(ClockError::PulseOverflow)?;
        let sol_before = sol_of(self.total_millisols);
        let total = self.total_millisols + elapsed;
        let sol_after = sol_of(total);

        self.pulse_id = id;
        self.total_millisols = total;
        Ok(Some(ClockPulse::new(
            id,
            elapsed,
            total,
            sol_after,
            sol_after != sol_before,
        )))
    }

    /// Id of the last emitted pulse.
    pub const fn pulse_id(&self) -> u64 {
        self.pulse_id
    }

    /// Absolute simulated time in millisols.
    pub const fn total_millisols(&self) -> f64 {
        self.total_millisols
    }

    /// Current sol and millisol of sol.
    pub fn current_time(&self) -> MarsTime {
        MarsTime::from_total(self.total_millisols)
    }

    /// Number of empty steps suppressed so far.
    pub const fn suppressed_pulses(&self) -> u64 {
        self.suppressed
    }

    /// Simulated seconds per real second.
    pub const fn time_ratio(&self) -> f64 {
        self.time_ratio
    }
}
