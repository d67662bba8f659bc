//! Per-pulse need accumulation and life support draw for people.
//!
//! Every person accumulates fatigue and hunger, breathes, drinks and eats
//! from whichever store they are in (the settlement, or the vehicle they
//! are aboard). A shortfall in any life support resource damages health;
//! met needs let health recover slowly. Robots are skipped.

use habitat_types::{Resource, UnitId};
use habitat_world::{PulseScope, ResourceStore, Settlement, TaskKind, Worker, WorkerLocation};
use habitat_world::worker::{CONDITION_MAX, NEED_MAX};
use tracing::warn;

use crate::config::AgentConfig;
use crate::error::AgentError;

/// Fraction of the requested draw below which a shortage counts.
const SHORTAGE_TOLERANCE: f64 = 0.999;

/// Advance needs and draw life support for every person in the settlement.
///
/// # Errors
///
/// Propagates [`habitat_world::WorldError`] from the stores.
pub fn update_physiology(
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    let pulse = scope.pulse();
    let elapsed = pulse.elapsed();
    let Settlement {
        workers,
        store,
        vehicles,
        missions,
        ..
    } = &mut *scope.settlement;

    let mut deprived: Vec<UnitId> = Vec::new();
    for worker in workers.values_mut().filter(|worker| worker.is_person()) {
        let vehicle = match worker.location {
            WorkerLocation::InSettlement => None,
            WorkerLocation::InVehicle(vehicle) => Some(vehicle),
            WorkerLocation::Outside(_) => worker
                .mission
                .and_then(|id| missions.get(&id))
                .and_then(|mission| mission.vehicle),
        };
        let source: &mut ResourceStore = match vehicle.and_then(|id| vehicles.get_mut(&id)) {
            Some(vehicle) => &mut vehicle.cargo,
            None => &mut *store,
        };
        let short = draw_life_support(source, elapsed, config)?;
        accumulate_needs(worker, elapsed, short, config);
        if short {
            deprived.push(worker.id);
        }
    }

    if let Some(first) = deprived.first() {
        if scope.settlement.should_warn("life-support", pulse.id()) {
            warn!(
                settlement = %scope.settlement.id,
                pulse = pulse.id(),
                worker = %first,
                affected = deprived.len(),
                "life support shortage"
            );
        }
    }
    Ok(())
}

/// Draw one person's oxygen, water and food for `elapsed` millisols.
/// Returns whether any of them fell short.
fn draw_life_support(
    source: &mut ResourceStore,
    elapsed: f64,
    config: &AgentConfig,
) -> Result<bool, AgentError> {
    let (oxygen, water, food) = config.life_support.per_person(elapsed);
    let mut short = false;
    for (resource, needed) in [
        (Resource::Oxygen, oxygen),
        (Resource::Water, water),
        (Resource::Food, food),
    ] {
        let taken = source.retrieve_amount_resource(resource, needed)?;
        if taken < needed * SHORTAGE_TOLERANCE {
            short = true;
        }
    }
    Ok(short)
}

/// Apply fatigue, hunger, damage and healing to one person.
pub fn accumulate_needs(worker: &mut Worker, elapsed: f64, deprived: bool, config: &AgentConfig) {
    let rates = &config.physiology;
    let activity = worker.task.as_ref().map(|task| &task.kind);
    if !matches!(activity, Some(TaskKind::Sleep)) {
        worker.fatigue += rates.fatigue_rate * elapsed;
    }
    if !matches!(activity, Some(TaskKind::Eat)) {
        worker.hunger += rates.hunger_rate * elapsed;
    }
    worker.fatigue = worker.fatigue.clamp(0.0, NEED_MAX);
    worker.hunger = worker.hunger.clamp(0.0, NEED_MAX);

    let starving = worker.hunger >= NEED_MAX;
    if deprived || starving {
        worker.health -= rates.deprivation_damage * elapsed;
    } else if worker.hunger < NEED_MAX / 2.0 && worker.fatigue < config.mission.fatigue_limit {
        worker.health += rates.heal_rate * elapsed;
    }
    worker.health = worker.health.clamp(0.0, CONDITION_MAX);
    worker.stress = worker.stress.clamp(0.0, CONDITION_MAX);
    worker.performance = performance(worker);
}

/// Work performance from current condition, in `[0.1, 1]`.
pub fn performance(worker: &Worker) -> f64 {
    let fatigue_penalty = worker.fatigue / (2.0 * NEED_MAX);
    let stress_penalty = worker.stress / (2.0 * CONDITION_MAX);
    let health_factor = worker.health / CONDITION_MAX;
    ((1.0 - fatigue_penalty - stress_penalty) * health_factor).clamp(0.1, 1.0)
}
