//! Shared type definitions for the Habitat colony scheduler.
//!
//! This crate is the single source of truth for the small vocabulary every
//! other crate speaks: identifiers, enumerations, the [`ClockPulse`], and
//! surface coordinates. View types flow to `TypeScript` via `ts-rs` for the
//! presentation layer.
//!
//! # Modules
//!
//! - [`ids`] -- UUID newtypes for settlements and missions, dense [`UnitId`]
//! - [`enums`] -- Resources, worker kinds, mission phases and status reasons
//! - [`pulse`] -- The immutable per-tick [`ClockPulse`]
//! - [`geo`] -- Planar [`Coordinates`]
//! - [`views`] -- Read-only presentation views

pub mod enums;
pub mod geo;
pub mod ids;
pub mod pulse;
pub mod views;

// Re-export all public types at crate root for convenience.
pub use enums::{
    Illumination, JobKind, MissionKind, MissionPhase, MissionStatus, Resource, StatusReason,
    StepStage, VehicleStatus, WorkerKind,
};
pub use geo::Coordinates;
pub use ids::{MissionId, SettlementId, UnitId};
pub use pulse::{ClockPulse, MILLISOLS_PER_SOL};
pub use views::{MissionView, PulseView, WorkerView};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the presentation boundary.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::ids::SettlementId::export_all();
        let _ = crate::ids::MissionId::export_all();
        let _ = crate::ids::UnitId::export_all();
        let _ = crate::pulse::ClockPulse::export_all();
        let _ = crate::views::MissionView::export_all();
        let _ = crate::views::WorkerView::export_all();
        let _ = crate::views::PulseView::export_all();
    }
}
