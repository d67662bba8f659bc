//! Travel leg execution.
//!
//! The head travel step owns no motion of its own: the member assigned as
//! operator drives the vehicle through an
//! [`OperateVehicle`](habitat_world::TaskKind::OperateVehicle) task in the
//! task stage. This module hands out that task, notices arrival, and
//! emits the visitor effects when a vehicle parks at or leaves a foreign
//! settlement.

use habitat_types::{Coordinates, UnitId, VehicleStatus};
use habitat_world::{CrossSettlementEffect, Mission, PulseScope, Task, TaskKind, Worker};
use tracing::{debug, info};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::task::default_duration;

/// Run one member's share of the head travel step.
///
/// On arrival within the configured epsilon the vehicle is garaged (home),
/// parked (foreign settlement) or left standing (exploration site), the
/// operator's drive task is cleared and the step is marked done. Otherwise,
/// if nobody is driving, `member` takes the wheel when aboard, free of
/// non-leisure work and not exhausted.
///
/// Returns whether the step progressed: the vehicle arrived or a driver
/// was assigned.
///
/// # Errors
///
/// Returns [`AgentError::NoVehicle`] when the mission has no vehicle and
/// propagates missing units from the settlement.
pub fn execute_travel(
    mission: &mut Mission,
    member: UnitId,
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<bool, AgentError> {
    let mission_id = mission.id;
    let vehicle_id = mission.vehicle.ok_or(AgentError::NoVehicle(mission_id))?;
    let crew = u32::try_from(mission.members.len()).unwrap_or(u32::MAX);
    let home = scope.settlement.id;
    let pulse_id = scope.pulse().id();
    let snapshot = scope.snapshot();
    let epsilon = config.mission.arrival_epsilon;

    let Some(step) = mission.head_step_mut() else {
        return Ok(false);
    };
    if step.is_done() {
        return Ok(true);
    }
    let destination = step.navpoint().clone();

    let mut effect = None;
    let settlement = &mut *scope.settlement;
    let vehicle = settlement.vehicle_mut(vehicle_id)?;

    if vehicle.position.distance_to(destination.location) <= epsilon {
        vehicle.position = destination.location;
        let operator = vehicle.operator.take();
        match destination.settlement {
            Some(id) if id == home => vehicle.status = VehicleStatus::Garaged,
            Some(id) => {
                vehicle.status = VehicleStatus::Parked;
                effect = Some(CrossSettlementEffect::VisitorArrived {
                    from: home,
                    to: id,
                    vehicle: vehicle_id,
                    crew,
                });
            }
            None => {}
        }
        if let Some(worker) = operator.and_then(|id| settlement.workers.get_mut(&id)) {
            if matches!(
                worker.task.as_ref().map(|task| &task.kind),
                Some(TaskKind::OperateVehicle { .. })
            ) {
                worker.task = None;
            }
        }
        step.complete();
        info!(
            settlement = %home,
            pulse = pulse_id,
            mission = %mission_id,
            destination = %destination.description,
            "navpoint reached"
        );
        if let Some(effect) = effect {
            scope.defer(effect);
        }
        return Ok(true);
    }

    if vehicle.status == VehicleStatus::Parked {
        vehicle.status = VehicleStatus::Travelling;
        let position = vehicle.position;
        if let Some((visited, _)) = snapshot
            .nearest_settlement(position)
            .filter(|(id, summary)| {
                *id != home && summary.location.distance_to(position) <= epsilon
            })
        {
            effect = Some(CrossSettlementEffect::VisitorDeparted {
                from: home,
                to: visited,
                vehicle: vehicle_id,
            });
        }
    }
    let operator = vehicle.operator;
    let driving = operator
        .and_then(|id| settlement.workers.get_mut(&id))
        .is_some_and(|driver| steer(driver, vehicle_id, destination.location));
    if operator.is_some() && !driving {
        settlement.vehicle_mut(vehicle_id)?.operator = None;
        debug!(mission = %mission_id, vehicle = %vehicle_id, "stale operator released");
    }

    let mut assigned = false;
    if !driving {
        let worker = settlement.worker_mut(member)?;
        let free = worker
            .task
            .as_ref()
            .is_none_or(|task| task.kind.is_leisure());
        let fit = !worker.is_exhausted(config.mission.fatigue_limit);
        if worker.is_aboard(vehicle_id) && free && fit {
            let kind = TaskKind::OperateVehicle {
                vehicle: vehicle_id,
                destination: destination.location,
            };
            let duration = default_duration(&kind, config);
            worker.task = Some(Task::for_mission(kind, duration, mission_id));
            settlement.vehicle_mut(vehicle_id)?.operator = Some(member);
            debug!(mission = %mission_id, driver = %member, "driver assigned");
            assigned = true;
        }
    }

    if let Some(effect) = effect {
        scope.defer(effect);
    }
    Ok(assigned)
}

/// Whether `driver` is still on a drive task for `vehicle`.
///
/// A live drive task is pointed at `destination`, so a replaced plan (an
/// emergency diversion) redirects the vehicle without a driver change.
fn steer(driver: &mut Worker, vehicle: UnitId, destination: Coordinates) -> bool {
    match driver.task.as_mut().map(|task| &mut task.kind) {
        Some(TaskKind::OperateVehicle {
            vehicle: driven,
            destination: target,
        }) if *driven == vehicle => {
            *target = destination;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::{ClockPulse, JobKind, MissionKind, Resource};
    use habitat_world::{
        ColonySnapshot, MissionStep, NavPoint, Settlement, ShutdownSignal, Vehicle,
        WorkerLocation,
    };

    use super::*;

    fn setup() -> (Settlement, Mission) {
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 3);
        let id = settlement.id;
        let mut vehicle = Vehicle::new(UnitId(10), "Rover", id, settlement.location);
        vehicle.cargo.store_amount_resource(Resource::Methanol, 100.0).unwrap();
        vehicle.cargo.store_amount_resource(Resource::Oxygen, 200.0).unwrap();
        vehicle.status = VehicleStatus::Travelling;
        settlement.add_vehicle(vehicle);
        let mut worker = Worker::person(UnitId(1), "Ada", JobKind::Pilot, id);
        worker.location = WorkerLocation::InVehicle(UnitId(10));
        settlement.add_worker(worker);

        let mut mission = Mission::new(MissionKind::Exploration, "E", id, 0.0);
        mission.vehicle = Some(UnitId(10));
        mission.members.insert(UnitId(1));
        mission
            .steps
            .push_back(MissionStep::travel(NavPoint::site(Coordinates::new(50.0, 0.0), "A")));
        (settlement, mission)
    }

    #[test]
    fn assigns_a_driver_then_detects_arrival() {
        let (mut settlement, mut mission) = setup();
        let config = AgentConfig::default();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1.0, 0, false);
        {
            let mut scope =
                PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
            assert!(execute_travel(&mut mission, UnitId(1), &mut scope, &config).unwrap());
        }
        assert_eq!(settlement.vehicle(UnitId(10)).unwrap().operator, Some(UnitId(1)));
        let worker = settlement.workers.get(&UnitId(1)).unwrap();
        assert!(matches!(
            worker.task.as_ref().map(|task| &task.kind),
            Some(TaskKind::OperateVehicle { .. })
        ));

        settlement.vehicle_mut(UnitId(10)).unwrap().position = Coordinates::new(50.0, 0.0);
        {
            let mut scope =
                PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
            assert!(execute_travel(&mut mission, UnitId(1), &mut scope, &config).unwrap());
        }
        assert!(mission.head_step().unwrap().is_done());
        assert!(settlement.vehicle(UnitId(10)).unwrap().operator.is_none());
        assert!(settlement.workers.get(&UnitId(1)).unwrap().task.is_none());
        assert!(outbox.is_empty());
    }

    #[test]
    fn stale_operator_is_replaced() {
        let (mut settlement, mut mission) = setup();
        // The seat is held by a member whose drive task already ended.
        settlement.vehicle_mut(UnitId(10)).unwrap().operator = Some(UnitId(1));
        let config = AgentConfig::default();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1.0, 0, false);
        {
            let mut scope =
                PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
            assert!(execute_travel(&mut mission, UnitId(1), &mut scope, &config).unwrap());
        }
        assert_eq!(settlement.vehicle(UnitId(10)).unwrap().operator, Some(UnitId(1)));
        assert!(matches!(
            settlement.workers.get(&UnitId(1)).unwrap().task.as_ref().map(|task| &task.kind),
            Some(TaskKind::OperateVehicle { .. })
        ));
    }

    #[test]
    fn live_driver_is_redirected_to_the_new_head_step() {
        let (mut settlement, mut mission) = setup();
        let config = AgentConfig::default();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1.0, 0, false);
        {
            let mut scope =
                PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
            execute_travel(&mut mission, UnitId(1), &mut scope, &config).unwrap();
        }
        let home = NavPoint::site(Coordinates::new(-20.0, 0.0), "Back");
        mission.replace_steps(MissionStep::travel(home));
        {
            let mut scope =
                PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
            assert!(!execute_travel(&mut mission, UnitId(1), &mut scope, &config).unwrap());
        }
        let task = settlement.workers.get(&UnitId(1)).unwrap().task.clone().unwrap();
        assert!(matches!(
            task.kind,
            TaskKind::OperateVehicle { destination, .. }
                if destination == Coordinates::new(-20.0, 0.0)
        ));
    }

    #[test]
    fn exhausted_member_does_not_drive() {
        let (mut settlement, mut mission) = setup();
        settlement.workers.get_mut(&UnitId(1)).unwrap().fatigue = 950.0;
        let config = AgentConfig::default();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1.0, 0, false);
        let mut scope = PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
        assert!(!execute_travel(&mut mission, UnitId(1), &mut scope, &config).unwrap());
        assert!(scope.settlement.vehicle(UnitId(10)).unwrap().operator.is_none());
    }

    #[test]
    fn parking_at_a_foreign_settlement_notifies_it() {
        let (mut settlement, mut mission) = setup();
        let other = Settlement::new("Far", Coordinates::new(50.0, 0.0), 4);
        mission.replace_steps(MissionStep::travel(NavPoint::settlement(
            other.id,
            other.location,
            &other.name,
        )));
        settlement.vehicle_mut(UnitId(10)).unwrap().position = other.location;
        let config = AgentConfig::default();
        let snapshot = ColonySnapshot::capture(0, [&settlement, &other]);
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1.0, 0, false);
        {
            let mut scope =
                PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
            execute_travel(&mut mission, UnitId(1), &mut scope, &config).unwrap();
        }
        assert_eq!(settlement.vehicle(UnitId(10)).unwrap().status, VehicleStatus::Parked);
        assert!(matches!(
            outbox.first(),
            Some(CrossSettlementEffect::VisitorArrived { to, .. }) if *to == other.id
        ));
    }
}
