//! Enumeration types shared across the Habitat workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// An amount resource tracked in settlement stores and vehicle cargo.
///
/// Amounts are kilograms. Fuel for ground vehicles is methanol burned with
/// oxygen as the oxidizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Resource {
    /// Breathable oxygen; also the oxidizer for methanol engines.
    Oxygen,
    /// Potable water.
    Water,
    /// Packaged and greenhouse food.
    Food,
    /// Methanol vehicle fuel.
    Methanol,
    /// Atmospheric carbon dioxide feedstock.
    CarbonDioxide,
    /// Hydrogen by-product of electrolysis.
    Hydrogen,
    /// Mined water ice.
    Ice,
    /// Loose surface regolith.
    Regolith,
    /// Rock samples returned from exploration sites.
    RockSamples,
    /// Spare parts for maintenance and trade.
    SpareParts,
}

impl Resource {
    /// Every resource variant, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Oxygen,
        Self::Water,
        Self::Food,
        Self::Methanol,
        Self::CarbonDioxide,
        Self::Hydrogen,
        Self::Ice,
        Self::Regolith,
        Self::RockSamples,
        Self::SpareParts,
    ];

    /// Baseline trade value per kilogram before supply/demand adjustment.
    pub const fn base_value(self) -> f64 {
        match self {
            Self::Oxygen => 3.0,
            Self::Water => 2.0,
            Self::Food => 6.0,
            Self::Methanol => 4.0,
            Self::CarbonDioxide | Self::Regolith => 0.2,
            Self::Hydrogen => 5.0,
            Self::Ice => 1.5,
            Self::RockSamples => 8.0,
            Self::SpareParts => 12.0,
        }
    }

    /// Stock level (kg) at which a settlement values the resource at its base value.
    pub const fn target_stock(self) -> f64 {
        match self {
            Self::Oxygen | Self::Water => 2_000.0,
            Self::Food => 1_000.0,
            Self::Methanol => 1_500.0,
            Self::CarbonDioxide | Self::Regolith | Self::Ice => 5_000.0,
            Self::Hydrogen => 500.0,
            Self::RockSamples => 100.0,
            Self::SpareParts => 300.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

/// The kind of autonomous agent behind a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum WorkerKind {
    /// A human colonist with physiological needs.
    Person,
    /// A robot: no fatigue, hunger or stress, never consumes life support.
    Robot,
}

/// A worker's job assignment, used for job-fit scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum JobKind {
    /// Repairs and maintains buildings and machinery.
    Engineer,
    /// Tends greenhouse crops.
    Botanist,
    /// Drives vehicles on missions.
    Pilot,
    /// Performs research and field science.
    Scientist,
    /// Negotiates trade with other settlements.
    Trader,
    /// Looks after crew health.
    Doctor,
    /// No assigned job.
    Unassigned,
}

// ---------------------------------------------------------------------------
// Missions
// ---------------------------------------------------------------------------

/// The flavor of a vehicle mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MissionKind {
    /// Visit one or more exploration sites and collect rock samples.
    Exploration,
    /// Drive to another settlement and sell surplus goods.
    Trade,
}

impl MissionKind {
    /// The site-work phase this kind of mission performs between travel legs.
    pub const fn site_phase(self) -> MissionPhase {
        match self {
            Self::Exploration => MissionPhase::Exploring,
            Self::Trade => MissionPhase::Trading,
        }
    }

    /// The ordered phase list a mission of this kind declares.
    ///
    /// [`MissionPhase::Aborted`] is reachable from every non-terminal phase
    /// and is therefore not part of the declared sequence.
    pub fn declared_phases(self) -> Vec<MissionPhase> {
        vec![
            MissionPhase::Reviewing,
            MissionPhase::Embarking,
            MissionPhase::Travelling,
            self.site_phase(),
            MissionPhase::Disembarking,
            MissionPhase::Completed,
        ]
    }
}

/// One named state in a mission's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MissionPhase {
    /// Waiting for settlement approval.
    Reviewing,
    /// Loading the vehicle and boarding the crew.
    Embarking,
    /// Driving toward the head travel leg's destination.
    Travelling,
    /// Site work: exploring a site.
    Exploring,
    /// Site work: trading at a foreign settlement.
    Trading,
    /// Unloading and releasing the crew.
    Disembarking,
    /// Terminal: the mission ran to completion.
    Completed,
    /// Terminal: the mission was aborted before completion.
    Aborted,
}

impl MissionPhase {
    /// Whether this phase is absorbing.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Whether this phase is a site-work phase.
    pub const fn is_site_work(self) -> bool {
        matches!(self, Self::Exploring | Self::Trading)
    }

    /// Whether the crew is out on the surface (vehicle has departed).
    pub const fn is_underway(self) -> bool {
        matches!(self, Self::Travelling | Self::Exploring | Self::Trading)
    }
}

/// Overall mission status, orthogonal to the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MissionStatus {
    /// The mission is in progress.
    Active,
    /// The mission completed without an emergency.
    Succeeded,
    /// The mission ended early, aborted, or completed through an emergency.
    Failed,
}

/// Why a mission failed, aborted, or diverted. Inspectable by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StatusReason {
    /// No candidate member qualified when the mission was planned.
    NoMembers,
    /// No vehicle was available.
    NoVehicle,
    /// Settlement review rejected the mission (stock cannot cover the manifest).
    NotApproved,
    /// Remaining resources were insufficient; the mission diverted.
    InsufficientResources,
    /// A crew member needed medical attention; the mission diverted.
    MedicalEmergency,
    /// The mission was aborted by a presentation-layer command.
    AbortedByCommand,
    /// Every member disappeared from the settlement roster.
    MembersLost,
    /// The vehicle ran out of fuel before reaching its destination.
    VehicleStranded,
    /// Site work ended before the time budget because nobody could work.
    SiteWorkCutShort,
}

/// Lifecycle stage of a mission step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StepStage {
    /// Queued, not yet at the head of the queue.
    Pending,
    /// At the head of the queue and executing.
    Active,
    /// Exit condition met; about to be discarded.
    Done,
}

// ---------------------------------------------------------------------------
// Environment and vehicles
// ---------------------------------------------------------------------------

/// Surface light level at a settlement's local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Illumination {
    /// Sun well above the horizon.
    Daylight,
    /// Sun near the horizon: not lit enough for surface work, but not dark.
    Twilight,
    /// Sun below the horizon.
    Dark,
}

/// Where a vehicle is and what it is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum VehicleStatus {
    /// Stored in its home settlement's garage.
    Garaged,
    /// Parked outside a settlement other than its home base.
    Parked,
    /// Out on the surface with a mission.
    Travelling,
    /// Out of fuel on the surface.
    Stranded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_phases_include_site_phase() {
        let phases = MissionKind::Trade.declared_phases();
        assert!(phases.contains(&MissionPhase::Trading));
        assert!(!phases.contains(&MissionPhase::Exploring));
        assert!(!phases.contains(&MissionPhase::Aborted));
        assert_eq!(phases.first(), Some(&MissionPhase::Reviewing));
        assert_eq!(phases.last(), Some(&MissionPhase::Completed));
    }

    #[test]
    fn terminal_phases() {
        assert!(MissionPhase::Completed.is_terminal());
        assert!(MissionPhase::Aborted.is_terminal());
        assert!(!MissionPhase::Disembarking.is_terminal());
        assert!(MissionPhase::Exploring.is_site_work());
        assert!(MissionPhase::Trading.is_underway());
        assert!(!MissionPhase::Embarking.is_underway());
    }

    #[test]
    fn resource_serde_roundtrip() {
        let json = serde_json::to_string(&Resource::Methanol).unwrap_or_default();
        assert_eq!(json, "\"Methanol\"");
    }
}
