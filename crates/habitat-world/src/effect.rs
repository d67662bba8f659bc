//! Deferred cross-settlement effects.
//!
//! A settlement's update may only mutate that settlement. Anything that
//! touches another settlement is queued as a [`CrossSettlementEffect`] in
//! the work unit's outbox and applied by the dispatcher after the join
//! barrier, in settlement order.

use std::collections::BTreeMap;

use habitat_types::{Resource, SettlementId, UnitId, VehicleStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::WorldError;
use crate::settlement::Settlement;
use crate::vehicle::Vehicle;
use crate::worker::{Worker, WorkerLocation};

/// A change to another settlement, applied after the barrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrossSettlementEffect {
    /// Goods sold by `from` arrive in `to`'s store, paid from `to`'s credits.
    DeliverGoods {
        /// Selling settlement.
        from: SettlementId,
        /// Buying settlement.
        to: SettlementId,
        /// Kilograms per resource.
        goods: BTreeMap<Resource, f64>,
        /// Price paid by the buyer.
        payment: Decimal,
    },
    /// A vehicle from `from` parked at `to`.
    VisitorArrived {
        /// Home settlement of the vehicle.
        from: SettlementId,
        /// Settlement being visited.
        to: SettlementId,
        /// The visiting vehicle.
        vehicle: UnitId,
        /// Crew aboard.
        crew: u32,
    },
    /// A visiting vehicle left `to`.
    VisitorDeparted {
        /// Home settlement of the vehicle.
        from: SettlementId,
        /// Settlement that was visited.
        to: SettlementId,
        /// The departing vehicle.
        vehicle: UnitId,
    },
    /// A vehicle and its crew join `to` permanently.
    TransferCustody {
        /// Settlement giving up the units.
        from: SettlementId,
        /// Settlement taking them in.
        to: SettlementId,
        /// The vehicle.
        vehicle: Box<Vehicle>,
        /// The crew.
        crew: Vec<Worker>,
    },
}

impl CrossSettlementEffect {
    /// The settlement this effect mutates.
    pub const fn target(&self) -> SettlementId {
        match self {
            Self::DeliverGoods { to, .. }
            | Self::VisitorArrived { to, .. }
            | Self::VisitorDeparted { to, .. }
            | Self::TransferCustody { to, .. } => *to,
        }
    }

    /// Whether the effect carries something its source has already given up.
    ///
    /// Such effects must land even when the pulse that queued them is cut
    /// short, or the goods or units vanish from the colony.
    pub const fn is_handover(&self) -> bool {
        matches!(self, Self::DeliverGoods { .. } | Self::TransferCustody { .. })
    }

    /// Apply the effect to its target settlement.
    ///
    /// # Errors
    ///
    /// Propagates [`WorldError::InvalidAmount`] from the target's store.
    pub fn apply(self, settlement: &mut Settlement) -> Result<(), WorldError> {
        match self {
            Self::DeliverGoods {
                from,
                goods,
                payment,
                ..
            } => {
                let mut delivered = 0.0;
                for (resource, amount) in goods {
                    delivered += settlement.store.store_amount_resource(resource, amount)?;
                }
                settlement.credits -= payment;
                info!(
                    settlement = %settlement.id,
                    seller = %from,
                    kilograms = delivered,
                    %payment,
                    "goods delivered"
                );
            }
            Self::VisitorArrived {
                from,
                vehicle,
                crew,
                ..
            } => {
                settlement.visitors.insert(vehicle, from);
                info!(settlement = %settlement.id, %from, %vehicle, crew, "visitor arrived");
            }
            Self::VisitorDeparted { vehicle, .. } => {
                settlement.visitors.remove(&vehicle);
            }
            Self::TransferCustody {
                from,
                vehicle,
                crew,
                ..
            } => {
                let mut vehicle = *vehicle;
                settlement.visitors.remove(&vehicle.id);
                vehicle.home = settlement.id;
                vehicle.position = settlement.location;
                vehicle.status = VehicleStatus::Garaged;
                vehicle.operator = None;
                vehicle.reserved_for = None;
                vehicle.cargo.transfer_all_into(&mut settlement.store)?;
                let crew_count = crew.len();
                for mut worker in crew {
                    worker.home = settlement.id;
                    worker.location = WorkerLocation::InSettlement;
                    worker.mission = None;
                    worker.task = None;
                    settlement.workers.insert(worker.id, worker);
                }
                info!(
                    settlement = %settlement.id,
                    %from,
                    vehicle = %vehicle.id,
                    crew = crew_count,
                    "custody transferred"
                );
                settlement.vehicles.insert(vehicle.id, vehicle);
            }
        }
        Ok(())
    }
}
