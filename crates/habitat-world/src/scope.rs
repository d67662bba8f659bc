//! The per-pulse capability a settlement update runs under.
//!
//! A [`PulseScope`] holds the only mutable borrow of one settlement for the
//! duration of its update, next to read-only views of the pulse and the
//! prior-tick colony snapshot and a write-only outbox for deferred
//! cross-settlement effects. Code running under a scope cannot reach any
//! other settlement's mutable state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use habitat_types::{ClockPulse, SettlementId};

use crate::effect::CrossSettlementEffect;
use crate::settlement::Settlement;
use crate::snapshot::ColonySnapshot;

/// Shared cooperative cancellation flag raised by dispatcher shutdown.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    /// A lowered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the signal has been raised.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything one settlement's update may touch during a pulse.
pub struct PulseScope<'a> {
    /// The settlement being updated.
    pub settlement: &'a mut Settlement,
    pulse: ClockPulse,
    snapshot: &'a ColonySnapshot,
    cancel: &'a ShutdownSignal,
    outbox: &'a mut Vec<CrossSettlementEffect>,
}

impl<'a> PulseScope<'a> {
    /// Open a scope over `settlement` for `pulse`.
    pub const fn new(
        settlement: &'a mut Settlement,
        pulse: ClockPulse,
        snapshot: &'a ColonySnapshot,
        cancel: &'a ShutdownSignal,
        outbox: &'a mut Vec<CrossSettlementEffect>,
    ) -> Self {
        Self {
            settlement,
            pulse,
            snapshot,
            cancel,
            outbox,
        }
    }

    /// The pulse being applied.
    pub const fn pulse(&self) -> ClockPulse {
        self.pulse
    }

    /// Colony state as of the previous barrier.
    pub const fn snapshot(&self) -> &'a ColonySnapshot {
        self.snapshot
    }

    /// Whether shutdown was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_raised()
    }

    /// Whether `id` is the settlement this scope owns.
    pub fn owns(&self, id: SettlementId) -> bool {
        self.settlement.id == id
    }

    /// Queue an effect for after the barrier.
    pub fn defer(&mut self, effect: CrossSettlementEffect) {
        self.outbox.push(effect);
    }

    /// Effects queued so far.
    pub fn deferred(&self) -> &[CrossSettlementEffect] {
        self.outbox
    }
}
