//! Task execution and preference learning.
//!
//! Each pulse every worker with a task performs it for the pulse's elapsed
//! time. Tasks end when their time runs out, when their effect is complete
//! (a rested sleeper, an arrived vehicle), or when the mission they serve
//! is gone. Completion nudges the worker's learned preference for the task
//! up; interruption nudges it down.

use habitat_types::{MissionId, MissionPhase, StatusReason, UnitId, VehicleStatus};
use habitat_world::worker::CONDITION_MAX;
use habitat_world::{Mission, PulseScope, Settlement, Task, TaskKind, Worker};
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::error::AgentError;

/// How a task ended, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEnd {
    /// Still running.
    Continuing,
    /// Ran to completion.
    Completed,
    /// Stopped before completion.
    Interrupted,
}

/// Default duration in millisols for a newly chosen task.
pub fn default_duration(kind: &TaskKind, config: &AgentConfig) -> f64 {
    let base = config.decision.task_millisols;
    match kind {
        TaskKind::Sleep => base * 5.0,
        TaskKind::Eat => base * 0.4,
        TaskKind::OperateVehicle { .. } => config.mission.drive_shift_millisols,
        TaskKind::Relax
        | TaskKind::Socialize
        | TaskKind::Maintenance
        | TaskKind::TendGreenhouse
        | TaskKind::Research
        | TaskKind::SiteWork { .. } => base,
    }
}

/// Nudge the learned preference for `task` by `delta`, bounded by the configured limit.
pub fn learn(worker: &mut Worker, task: &str, delta: f64, config: &AgentConfig) {
    let limit = config.decision.preference_limit.abs();
    let entry = worker.preferences.entry(task.to_owned()).or_insert(0.0);
    *entry = (*entry + delta).clamp(-limit, limit);
}

/// Drop a worker's current task, counting it as interrupted.
pub fn interrupt_task(worker: &mut Worker, config: &AgentConfig) {
    if let Some(task) = worker.task.take() {
        learn(worker, task.kind.name(), -config.decision.learning_rate, config);
    }
}

/// Drop a worker's task on request, freeing any vehicle it was driving.
pub fn clear_task(settlement: &mut Settlement, worker_id: UnitId, config: &AgentConfig) {
    let Some(worker) = settlement.workers.get_mut(&worker_id) else {
        return;
    };
    let Some(task) = worker.task.take() else {
        return;
    };
    learn(worker, task.kind.name(), -config.decision.learning_rate, config);
    release_vehicle(settlement, worker_id, &task);
}

/// Hand back the vehicle a finished drive task was steering.
///
/// The operator seat is only cleared while `driver` still holds it.
fn release_vehicle(settlement: &mut Settlement, driver: UnitId, task: &Task) {
    let TaskKind::OperateVehicle { vehicle, .. } = &task.kind else {
        return;
    };
    if let Some(driven) = settlement
        .vehicles
        .get_mut(vehicle)
        .filter(|driven| driven.operator == Some(driver))
    {
        driven.operator = None;
    }
}

/// Perform every worker's current task for the pulse.
///
/// # Errors
///
/// Propagates [`habitat_world::WorldError`] from vehicle and store updates.
pub fn perform_tasks(scope: &mut PulseScope<'_>, config: &AgentConfig) -> Result<(), AgentError> {
    let busy: Vec<UnitId> = scope
        .settlement
        .workers
        .values()
        .filter(|worker| worker.task.is_some())
        .map(|worker| worker.id)
        .collect();
    for id in busy {
        perform_task(scope, id, config)?;
    }
    Ok(())
}

/// Perform one worker's task for the pulse and settle its outcome.
///
/// # Errors
///
/// Propagates [`habitat_world::WorldError`] from vehicle and store updates.
pub fn perform_task(
    scope: &mut PulseScope<'_>,
    worker_id: UnitId,
    config: &AgentConfig,
) -> Result<TaskEnd, AgentError> {
    let Some(mut task) = scope
        .settlement
        .workers
        .get_mut(&worker_id)
        .and_then(|worker| worker.task.take())
    else {
        return Ok(TaskEnd::Continuing);
    };

    let elapsed = scope.pulse().elapsed();
    let end = if mission_gone(scope, &task) {
        TaskEnd::Interrupted
    } else {
        let effect_done = apply_effect(scope, worker_id, &task, elapsed, config)?;
        task.remaining_millisols -= elapsed;
        if effect_done || task.remaining_millisols <= 0.0 {
            TaskEnd::Completed
        } else {
            TaskEnd::Continuing
        }
    };

    if end != TaskEnd::Continuing {
        release_vehicle(scope.settlement, worker_id, &task);
    }
    let worker = scope.settlement.worker_mut(worker_id)?;
    match end {
        TaskEnd::Continuing => worker.task = Some(task),
        TaskEnd::Completed => {
            learn(worker, task.kind.name(), config.decision.learning_rate, config);
            debug!(worker = %worker_id, task = task.kind.name(), "task completed");
        }
        TaskEnd::Interrupted => {
            learn(worker, task.kind.name(), -config.decision.learning_rate, config);
            debug!(worker = %worker_id, task = task.kind.name(), "task interrupted");
        }
    }
    Ok(end)
}

/// Whether the task serves a mission that no longer exists or has ended.
fn mission_gone(scope: &PulseScope<'_>, task: &Task) -> bool {
    task.mission.is_some_and(|id| {
        scope
            .settlement
            .missions
            .get(&id)
            .is_none_or(Mission::is_done)
    })
}

/// Apply one pulse of the task's effect. Returns true when the effect is complete.
fn apply_effect(
    scope: &mut PulseScope<'_>,
    worker_id: UnitId,
    task: &Task,
    elapsed: f64,
    config: &AgentConfig,
) -> Result<bool, AgentError> {
    let rates = &config.physiology;
    let pulse_id = scope.pulse().id();
    let settlement = &mut *scope.settlement;
    let worker = settlement.worker_mut(worker_id)?;
    let performance = worker.performance;
    match &task.kind {
        TaskKind::Sleep => {
            worker.fatigue = (worker.fatigue - rates.sleep_recovery * elapsed).max(0.0);
            Ok(worker.fatigue <= 0.0)
        }
        TaskKind::Eat => {
            worker.hunger = (worker.hunger - rates.eat_relief * elapsed).max(0.0);
            Ok(worker.hunger <= 0.0)
        }
        TaskKind::Relax => {
            worker.stress = (worker.stress - rates.relax_relief * elapsed).max(0.0);
            Ok(false)
        }
        TaskKind::Socialize => {
            let bonus = 0.5 + worker.extraversion / CONDITION_MAX;
            worker.stress = (worker.stress - rates.relax_relief * bonus * elapsed).max(0.0);
            Ok(false)
        }
        TaskKind::Maintenance => {
            worker.stress += rates.stress_rate * elapsed;
            settlement.wear =
                (settlement.wear - rates.repair_rate * performance * elapsed).max(0.0);
            Ok(settlement.wear <= 0.0)
        }
        TaskKind::TendGreenhouse => {
            worker.stress += rates.stress_rate * elapsed;
            settlement.crop_need =
                (settlement.crop_need - rates.tending_rate * performance * elapsed).max(0.0);
            Ok(settlement.crop_need <= 0.0)
        }
        TaskKind::Research => {
            worker.stress += rates.stress_rate * elapsed;
            settlement.research_points += rates.research_rate * performance * elapsed;
            Ok(false)
        }
        TaskKind::SiteWork { phase } => {
            worker.stress += rates.stress_rate * elapsed;
            let still_on_site = task
                .mission
                .and_then(|id| settlement.missions.get(&id))
                .is_some_and(|mission| mission.phase() == *phase);
            Ok(!still_on_site)
        }
        TaskKind::OperateVehicle {
            vehicle,
            destination,
        } => {
            worker.stress += rates.stress_rate * elapsed;
            let driven = settlement.vehicle_mut(*vehicle)?;
            let outcome =
                driven.drive_towards(*destination, elapsed, config.mission.oxidizer_ratio)?;
            let stranded = driven.status == VehicleStatus::Stranded;
            let finished = outcome.arrived || outcome.fuel_limited;
            if let Some(mission) = task.mission.and_then(|id| settlement.missions.get_mut(&id)) {
                mission.distance_travelled += outcome.distance;
                if stranded {
                    mission.add_reason(StatusReason::VehicleStranded);
                }
            }
            if stranded && settlement.should_warn("vehicle-stranded", pulse_id) {
                warn!(
                    settlement = %settlement.id,
                    pulse = pulse_id,
                    vehicle = %vehicle,
                    "vehicle ran out of fuel"
                );
            }
            Ok(finished)
        }
    }
}

/// Give `worker` a site-work task for `phase` unless already on one.
pub fn assign_site_work(
    worker: &mut Worker,
    phase: MissionPhase,
    mission: MissionId,
    config: &AgentConfig,
) {
    let already = matches!(
        worker.task.as_ref().map(|task| &task.kind),
        Some(TaskKind::SiteWork { .. })
    );
    if !already {
        let kind = TaskKind::SiteWork { phase };
        let duration = default_duration(&kind, config);
        worker.task = Some(Task::for_mission(kind, duration, mission));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::{ClockPulse, Coordinates, JobKind, Resource, SettlementId};
    use habitat_world::{ColonySnapshot, ShutdownSignal, Vehicle};

    use super::*;

    fn base_with_driver(shift: f64) -> Settlement {
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 3);
        let id = settlement.id;
        let mut rover = Vehicle::new(UnitId(2), "Rover", id, settlement.location);
        rover.cargo.store_amount_resource(Resource::Methanol, 100.0).unwrap();
        rover.cargo.store_amount_resource(Resource::Oxygen, 200.0).unwrap();
        rover.status = VehicleStatus::Travelling;
        rover.operator = Some(UnitId(1));
        settlement.add_vehicle(rover);
        let mut driver = Worker::person(UnitId(1), "Ada", JobKind::Pilot, id);
        let drive = TaskKind::OperateVehicle {
            vehicle: UnitId(2),
            destination: Coordinates::new(1_000.0, 0.0),
        };
        driver.task = Some(Task::new(drive, shift));
        settlement.add_worker(driver);
        settlement
    }

    #[test]
    fn driver_keeps_the_seat_during_a_shift() {
        let mut settlement = base_with_driver(5.0);
        let config = AgentConfig::default();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1.0, 0, false);
        let mut scope = PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);

        assert_eq!(perform_task(&mut scope, UnitId(1), &config).unwrap(), TaskEnd::Continuing);
        assert_eq!(scope.settlement.vehicle(UnitId(2)).unwrap().operator, Some(UnitId(1)));
    }

    #[test]
    fn end_of_shift_frees_the_driver_seat() {
        let mut settlement = base_with_driver(1.0);
        let config = AgentConfig::default();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1.0, 0, false);
        let mut scope = PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);

        assert_eq!(perform_task(&mut scope, UnitId(1), &config).unwrap(), TaskEnd::Completed);
        let rover = scope.settlement.vehicle(UnitId(2)).unwrap();
        assert!(rover.position.x > 0.0);
        assert!(rover.operator.is_none());
        assert!(scope.settlement.workers.get(&UnitId(1)).unwrap().task.is_none());
    }

    #[test]
    fn preferences_are_bounded() {
        let config = AgentConfig::default();
        let mut worker = Worker::person(UnitId(1), "Ada", JobKind::Engineer, SettlementId::new());
        for _ in 0..100 {
            learn(&mut worker, "research", 0.05, &config);
        }
        assert!((worker.preference("research") - 0.5).abs() < 1e-9);
        for _ in 0..100 {
            learn(&mut worker, "research", -0.05, &config);
        }
        assert!((worker.preference("research") + 0.5).abs() < 1e-9);
    }

    #[test]
    fn interrupt_clears_and_penalizes() {
        let config = AgentConfig::default();
        let mut worker = Worker::person(UnitId(1), "Ada", JobKind::Engineer, SettlementId::new());
        worker.task = Some(Task::new(TaskKind::Relax, 10.0));
        interrupt_task(&mut worker, &config);
        assert!(worker.task.is_none());
        assert!(worker.preference("relax") < 0.0);
    }
}
