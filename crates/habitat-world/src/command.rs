//! Presentation-layer commands queued for a settlement's next pulse.

use habitat_types::{MissionId, UnitId};
use serde::{Deserialize, Serialize};

/// A mutation requested from outside the simulation.
///
/// Commands are queued on the target settlement and applied by its work
/// unit at the start of the next pulse, never mid-pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Abort a mission and release its crew.
    AbortMission {
        /// The mission to abort.
        mission: MissionId,
    },
    /// Interrupt a worker's current task.
    ClearTask {
        /// The worker whose task is dropped.
        worker: UnitId,
    },
}
