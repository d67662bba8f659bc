//! Error types for the habitat-agents crate.
//!
//! Shortages are not errors: they surface as truncated processes, emergency
//! routes and status reasons. [`AgentError`] covers the failures a
//! settlement update cannot recover from on its own, which the dispatcher
//! isolates to that settlement for the current pulse.

use habitat_types::{MissionId, SettlementId, UnitId};
use habitat_world::WorldError;

/// Errors that can occur while updating one settlement.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A settlement-state operation failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Code running for one settlement touched a mission or unit owned by another.
    #[error("settlement {active} reached into state owned by {owner}")]
    ForeignSettlement {
        /// The settlement whose pulse is running.
        active: SettlementId,
        /// The settlement that owns the referenced state.
        owner: SettlementId,
    },

    /// A mission references a member that is not on the roster.
    #[error("mission {mission} references missing member {member}")]
    MissingMember {
        /// The mission.
        mission: MissionId,
        /// The missing worker.
        member: UnitId,
    },

    /// A phase handler ran for a mission that has no vehicle.
    #[error("mission {0} has no vehicle")]
    NoVehicle(MissionId),
}
