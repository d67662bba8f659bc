//! Error types for the `habitat-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use habitat_types::{MissionId, MissionPhase, Resource, UnitId};

/// Errors that can occur while manipulating settlement-owned state.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A worker was not found in the settlement roster.
    #[error("worker not found: {0}")]
    WorkerNotFound(UnitId),

    /// A vehicle was not found in the settlement motor pool.
    #[error("vehicle not found: {0}")]
    VehicleNotFound(UnitId),

    /// A mission was not found in the settlement.
    #[error("mission not found: {0}")]
    MissionNotFound(MissionId),

    /// A resource amount was negative or not a finite number.
    #[error("invalid amount {amount} of {resource:?}")]
    InvalidAmount {
        /// The resource being moved.
        resource: Resource,
        /// The rejected amount.
        amount: f64,
    },

    /// A mission tried to enter a phase it never declared.
    #[error("mission {mission} did not declare phase {phase:?}")]
    UndeclaredPhase {
        /// The mission.
        mission: MissionId,
        /// The rejected phase.
        phase: MissionPhase,
    },

    /// A mission tried to move backwards or out of a terminal phase.
    #[error("mission {mission}: illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// The mission.
        mission: MissionId,
        /// Current phase.
        from: MissionPhase,
        /// Requested phase.
        to: MissionPhase,
    },
}
