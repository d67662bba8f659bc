//! Ground vehicles: position, cargo, fuel burn and reservation state.
//!
//! Vehicles are owned by the settlement whose motor pool they are in. While
//! out on a mission they stay in their home settlement's pool; a
//! custody-transfer effect moves them to another settlement's pool after a
//! mission ends abroad.

use habitat_types::{Coordinates, MissionId, Resource, SettlementId, UnitId, VehicleStatus};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::resource::ResourceStore;

/// Default cruising speed, distance units per millisol.
pub const DEFAULT_SPEED: f64 = 10.0;
/// Default fuel economy, distance units per kilogram of fuel.
pub const DEFAULT_FUEL_ECONOMY: f64 = 2.0;
/// Default cargo capacity in kilograms.
pub const DEFAULT_CARGO_CAPACITY: f64 = 5_000.0;
/// Default crew capacity.
pub const DEFAULT_CREW_CAPACITY: u32 = 4;

/// A pressurized ground vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unit id.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// The settlement this vehicle returns to.
    pub home: SettlementId,
    /// Current surface position.
    pub position: Coordinates,
    /// Garaged, parked, travelling or stranded.
    pub status: VehicleStatus,
    /// Cruising speed, distance units per millisol.
    pub speed: f64,
    /// Fuel resource burned by the engine.
    pub fuel: Resource,
    /// Distance units per kilogram of fuel.
    pub fuel_economy: f64,
    /// Maximum number of crew aboard.
    pub crew_capacity: u32,
    /// Cargo hold (fuel, oxidizer, life support, trade goods, samples).
    pub cargo: ResourceStore,
    /// Worker currently driving, if any.
    pub operator: Option<UnitId>,
    /// Mission that has reserved this vehicle, if any.
    pub reserved_for: Option<MissionId>,
    /// Total distance driven.
    pub odometer: f64,
}

/// The result of one drive increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveOutcome {
    /// Distance covered this increment.
    pub distance: f64,
    /// Whether the vehicle reached the target.
    pub arrived: bool,
    /// Whether fuel or oxidizer limited the distance.
    pub fuel_limited: bool,
}

impl Vehicle {
    /// A garaged vehicle with default performance figures.
    pub fn new(
        id: UnitId,
        name: impl Into<String>,
        home: SettlementId,
        position: Coordinates,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            home,
            position,
            status: VehicleStatus::Garaged,
            speed: DEFAULT_SPEED,
            fuel: Resource::Methanol,
            fuel_economy: DEFAULT_FUEL_ECONOMY,
            crew_capacity: DEFAULT_CREW_CAPACITY,
            cargo: ResourceStore::new(DEFAULT_CARGO_CAPACITY),
            operator: None,
            reserved_for: None,
            odometer: 0.0,
        }
    }

    /// Whether a new mission may reserve this vehicle.
    pub fn is_available(&self) -> bool {
        self.reserved_for.is_none() && self.status == VehicleStatus::Garaged
    }

    /// Fuel (kg) needed to drive `distance`.
    pub fn fuel_for(&self, distance: f64) -> f64 {
        if self.fuel_economy > 0.0 {
            distance.max(0.0) / self.fuel_economy
        } else {
            0.0
        }
    }

    /// Millisols needed to drive `distance` at cruising speed.
    pub fn travel_time(&self, distance: f64) -> f64 {
        if self.speed > 0.0 {
            distance.max(0.0) / self.speed
        } else {
            f64::INFINITY
        }
    }

    /// Drive toward `target` for up to `elapsed` millisols.
    ///
    /// Burns fuel and `oxidizer_ratio` kilograms of oxygen per kilogram of
    /// fuel from the cargo hold. When either runs short the vehicle covers
    /// only the distance the available amounts allow and, if it did not
    /// arrive, becomes [`VehicleStatus::Stranded`].
    ///
    /// # Errors
    ///
    /// Propagates [`WorldError::InvalidAmount`] from the cargo store.
    pub fn drive_towards(
        &mut self,
        target: Coordinates,
        elapsed: f64,
        oxidizer_ratio: f64,
    ) -> Result<DriveOutcome, WorldError> {
        let remaining = self.position.distance_to(target);
        let desired = (self.speed * elapsed).clamp(0.0, remaining);
        let fuel_needed = self.fuel_for(desired);
        let oxidizer_needed = fuel_needed * oxidizer_ratio.max(0.0);

        let mut fraction: f64 = 1.0;
        if fuel_needed > 0.0 {
            fraction = fraction.min(self.cargo.get_amount_resource_stored(self.fuel) / fuel_needed);
        }
        if oxidizer_needed > 0.0 {
            fraction = fraction
                .min(self.cargo.get_amount_resource_stored(Resource::Oxygen) / oxidizer_needed);
        }
        let fraction = fraction.clamp(0.0, 1.0);

        self.cargo
            .retrieve_amount_resource(self.fuel, fuel_needed * fraction)?;
        self.cargo
            .retrieve_amount_resource(Resource::Oxygen, oxidizer_needed * fraction)?;

        let distance = desired * fraction;
        let fuel_limited = fraction < 1.0;
        let arrived = !fuel_limited && desired >= remaining;
        self.position = if arrived {
            target
        } else {
            self.position.towards(target, distance)
        };
        self.odometer += distance;
        self.status = if fuel_limited && !arrived {
            VehicleStatus::Stranded
        } else {
            VehicleStatus::Travelling
        };

        Ok(DriveOutcome {
            distance,
            arrived,
            fuel_limited,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fuelled(methanol: f64, oxygen: f64) -> Vehicle {
        let mut vehicle = Vehicle::new(
            UnitId(1),
            "Rover 1",
            SettlementId::new(),
            Coordinates::new(0.0, 0.0),
        );
        vehicle.cargo.store_amount_resource(Resource::Methanol, methanol).unwrap();
        vehicle.cargo.store_amount_resource(Resource::Oxygen, oxygen).unwrap();
        vehicle
    }

    #[test]
    fn drives_speed_times_elapsed() {
        let mut vehicle = fuelled(100.0, 200.0);
        let out = vehicle
            .drive_towards(Coordinates::new(100.0, 0.0), 3.0, 1.5)
            .unwrap();
        assert!((out.distance - 30.0).abs() < 1e-9);
        assert!(!out.arrived);
        assert!((vehicle.position.x - 30.0).abs() < 1e-9);
        assert!((vehicle.cargo.get_amount_resource_stored(Resource::Methanol) - 85.0).abs() < 1e-9);
        assert!((vehicle.cargo.get_amount_resource_stored(Resource::Oxygen) - 177.5).abs() < 1e-9);
    }

    #[test]
    fn arrival_lands_on_target() {
        let mut vehicle = fuelled(100.0, 200.0);
        let target = Coordinates::new(20.0, 0.0);
        let out = vehicle.drive_towards(target, 5.0, 1.5).unwrap();
        assert!(out.arrived);
        assert_eq!(vehicle.position, target);
        assert!((out.distance - 20.0).abs() < 1e-9);
    }

    #[test]
    fn fuel_shortage_strands_at_exact_range() {
        // 5 kg methanol at 2 units/kg covers exactly 10 units.
        let mut vehicle = fuelled(5.0, 200.0);
        let out = vehicle
            .drive_towards(Coordinates::new(100.0, 0.0), 10.0, 1.5)
            .unwrap();
        assert!(out.fuel_limited);
        assert!((out.distance - 10.0).abs() < 1e-9);
        assert_eq!(vehicle.status, VehicleStatus::Stranded);
        assert!(vehicle.cargo.get_amount_resource_stored(Resource::Methanol) < 1e-9);
    }
}
