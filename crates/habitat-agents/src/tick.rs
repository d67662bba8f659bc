//! The per-pulse update of one settlement.
//!
//! [`time_passing`] is the single entry point the dispatcher calls for each
//! settlement. It runs these stages in order:
//!
//! 1. **Commands** -- drain the operator command queue.
//! 2. **Sol** -- count a new sol when the pulse starts one.
//! 3. **Aging** -- infrastructure wear and crop need build up.
//! 4. **Processes** -- run resource processes against the store.
//! 5. **Physiology** -- needs accumulate and life support is drawn.
//! 6. **Missions** -- every active mission runs its current phase.
//! 7. **Tasks** -- every worker performs its current task.
//! 8. **Decisions** -- idle workers choose what to do next.
//! 9. **Reaping** -- finished missions release their crew and vehicle.
//!
//! Cancellation is checked between stages, never inside one, so a
//! cancelled update leaves the settlement consistent.

use habitat_types::StatusReason;
use habitat_world::{Command, PulseScope};
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::decision::run_decisions;
use crate::error::AgentError;
use crate::meta::MetaRegistry;
use crate::mission::{abort_mission, advance_all, reap};
use crate::physiology::update_physiology;
use crate::task::{clear_task, perform_tasks};

/// Signature of one update stage.
type Stage = fn(&mut PulseScope<'_>, &AgentConfig, &MetaRegistry) -> Result<(), AgentError>;

/// Stages in execution order.
const STAGES: [(&str, Stage); 9] = [
    ("commands", commands),
    ("sol", new_sol),
    ("aging", aging),
    ("processes", processes),
    ("physiology", physiology),
    ("missions", missions),
    ("tasks", tasks),
    ("decisions", decisions),
    ("reaping", reaping),
];

/// Apply one pulse to the settlement in `scope`.
///
/// Returns `Ok(true)` when every stage ran and `Ok(false)` when shutdown
/// was requested before the update finished.
///
/// # Errors
///
/// Returns the first [`AgentError`] raised by a stage; later stages do
/// not run.
pub fn time_passing(
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
    registry: &MetaRegistry,
) -> Result<bool, AgentError> {
    for (name, stage) in STAGES {
        if scope.is_cancelled() {
            debug!(settlement = %scope.settlement.id, stage = name, "update cancelled");
            return Ok(false);
        }
        stage(scope, config, registry)?;
    }
    Ok(true)
}

fn commands(
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
    _: &MetaRegistry,
) -> Result<(), AgentError> {
    while let Some(command) = scope.settlement.commands.pop_front() {
        match command {
            Command::AbortMission { mission } => {
                if !abort_mission(scope, mission, StatusReason::AbortedByCommand, config)? {
                    warn!(
                        settlement = %scope.settlement.id,
                        %mission,
                        "abort for unknown mission ignored"
                    );
                }
            }
            Command::ClearTask { worker } => clear_task(scope.settlement, worker, config),
        }
    }
    Ok(())
}

fn new_sol(
    scope: &mut PulseScope<'_>,
    _: &AgentConfig,
    _: &MetaRegistry,
) -> Result<(), AgentError> {
    let pulse = scope.pulse();
    if pulse.is_new_sol() {
        scope.settlement.sols_elapsed = scope.settlement.sols_elapsed.saturating_add(1);
        debug!(settlement = %scope.settlement.id, sol = pulse.sol(), "new sol");
    }
    Ok(())
}

fn aging(
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
    _: &MetaRegistry,
) -> Result<(), AgentError> {
    let elapsed = scope.pulse().elapsed();
    let rates = &config.physiology;
    let settlement = &mut *scope.settlement;
    settlement.wear = (settlement.wear + rates.wear_rate * elapsed).clamp(0.0, 100.0);
    settlement.crop_need =
        (settlement.crop_need + rates.crop_need_rate * elapsed).clamp(0.0, 100.0);
    Ok(())
}

fn processes(
    scope: &mut PulseScope<'_>,
    _: &AgentConfig,
    _: &MetaRegistry,
) -> Result<(), AgentError> {
    let pulse = scope.pulse();
    scope.settlement.run_processes(&pulse)?;
    Ok(())
}

fn physiology(
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
    _: &MetaRegistry,
) -> Result<(), AgentError> {
    update_physiology(scope, config)
}

fn missions(
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
    _: &MetaRegistry,
) -> Result<(), AgentError> {
    advance_all(scope, config)
}

fn tasks(
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
    _: &MetaRegistry,
) -> Result<(), AgentError> {
    perform_tasks(scope, config)
}

fn decisions(
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
    registry: &MetaRegistry,
) -> Result<(), AgentError> {
    run_decisions(scope, registry, config)
}

fn reaping(
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
    _: &MetaRegistry,
) -> Result<(), AgentError> {
    reap(scope, config).map(|_| ())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::{ClockPulse, Coordinates, JobKind, MissionKind, MissionPhase, UnitId};
    use habitat_world::{
        ColonySnapshot, Mission, Settlement, ShutdownSignal, Task, TaskKind, Vehicle, Worker,
    };

    use super::*;

    #[test]
    fn commands_are_drained_in_order() {
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 5);
        let id = settlement.id;
        let mut worker = Worker::person(UnitId(1), "Ada", JobKind::Engineer, id);
        worker.task = Some(Task::new(TaskKind::Research, 100.0));
        settlement.add_worker(worker);
        let mission = Mission::new(MissionKind::Exploration, "E", id, 0.0);
        let mission_id = mission.id;
        settlement.missions.insert(mission_id, mission);
        settlement.commands.push_back(Command::ClearTask { worker: UnitId(1) });
        settlement
            .commands
            .push_back(Command::AbortMission { mission: mission_id });

        let config = AgentConfig::default();
        let registry = MetaRegistry::empty();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1.0, 0, false);
        let mut scope = PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
        commands(&mut scope, &config, &registry).unwrap();

        assert!(scope.settlement.commands.is_empty());
        assert!(scope.settlement.workers.get(&UnitId(1)).unwrap().task.is_none());
        assert_eq!(
            scope.settlement.missions.get(&mission_id).unwrap().phase(),
            MissionPhase::Aborted
        );
    }

    #[test]
    fn clearing_a_drive_task_frees_the_driver_seat() {
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 5);
        let id = settlement.id;
        let mut rover = Vehicle::new(UnitId(2), "Rover", id, settlement.location);
        rover.operator = Some(UnitId(1));
        settlement.add_vehicle(rover);
        let mut driver = Worker::person(UnitId(1), "Ada", JobKind::Pilot, id);
        let drive = TaskKind::OperateVehicle {
            vehicle: UnitId(2),
            destination: Coordinates::new(100.0, 0.0),
        };
        driver.task = Some(Task::new(drive, 50.0));
        settlement.add_worker(driver);
        settlement.commands.push_back(Command::ClearTask { worker: UnitId(1) });

        let config = AgentConfig::default();
        let registry = MetaRegistry::empty();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1.0, 0, false);
        let mut scope = PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
        commands(&mut scope, &config, &registry).unwrap();

        assert!(scope.settlement.workers.get(&UnitId(1)).unwrap().task.is_none());
        assert!(scope.settlement.vehicle(UnitId(2)).unwrap().operator.is_none());
    }

    #[test]
    fn cancelled_update_stops_before_first_stage() {
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 5);
        settlement.commands.push_back(Command::ClearTask { worker: UnitId(9) });
        let config = AgentConfig::default();
        let registry = MetaRegistry::standard();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        cancel.raise();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 1.0, 1_000.0, 1, true);
        let mut scope = PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
        assert!(!time_passing(&mut scope, &config, &registry).unwrap());
        assert_eq!(scope.settlement.commands.len(), 1);
        assert_eq!(scope.settlement.sols_elapsed, 0);
    }

    #[test]
    fn full_update_ages_the_settlement() {
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 5);
        let config = AgentConfig::default();
        let registry = MetaRegistry::standard();
        let snapshot = ColonySnapshot::default();
        let cancel = ShutdownSignal::new();
        let mut outbox = Vec::new();
        let pulse = ClockPulse::new(1, 10.0, 1_000.0, 1, true);
        let mut scope = PulseScope::new(&mut settlement, pulse, &snapshot, &cancel, &mut outbox);
        assert!(time_passing(&mut scope, &config, &registry).unwrap());
        assert_eq!(scope.settlement.sols_elapsed, 1);
        assert!(scope.settlement.wear > 0.0);
        assert!(scope.settlement.crop_need > 0.0);
        assert!(scope.deferred().is_empty());
    }
}
