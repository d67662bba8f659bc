//! Mission resource requirements and the emergency path.
//!
//! The full manifest for the remaining plan (with safety margin and
//! optional extras) is cached on the mission and reused until it expires
//! or the mission invalidates it. The underway sufficiency check is
//! computed fresh against the vehicle's cargo without the safety margin:
//! a mission only diverts when it can no longer finish its plan at all.

use habitat_types::{Coordinates, MissionPhase, Resource, StatusReason, UnitId};
use habitat_world::{
    Cached, Manifest, Mission, MissionStep, NavPoint, PulseScope, Settlement, StepKind, TaskKind,
    Vehicle, WorkerLocation,
};
use tracing::warn;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::task::interrupt_task;

/// Add one step's requirements to `manifest`, starting from `from`.
///
/// Travel legs need fuel for the distance, oxidizer in proportion to the
/// fuel, and life support for the crew over the estimated travel time.
/// Site work needs life support for the remaining site budget. Required
/// amounts carry the configured safety margin; optional extras are only
/// added when `include_optional` is set. Returns where the step ends.
pub fn travel_required_resources(
    from: Coordinates,
    step: &MissionStep,
    vehicle: &Vehicle,
    crew: u32,
    manifest: &mut Manifest,
    include_optional: bool,
    config: &AgentConfig,
) -> Coordinates {
    step_requirements(
        from,
        step,
        vehicle,
        crew,
        manifest,
        include_optional,
        config.mission.resource_margin,
        config,
    )
}

#[allow(clippy::too_many_arguments)]
fn step_requirements(
    from: Coordinates,
    step: &MissionStep,
    vehicle: &Vehicle,
    crew: u32,
    manifest: &mut Manifest,
    include_optional: bool,
    margin: f64,
    config: &AgentConfig,
) -> Coordinates {
    match &step.kind {
        StepKind::Travel { destination } => {
            let distance = from.distance_to(destination.location);
            let fuel = vehicle.fuel_for(distance) * margin;
            manifest.add_resource(vehicle.fuel, fuel, false);
            manifest.add_resource(Resource::Oxygen, fuel * config.mission.oxidizer_ratio, false);
            let time = vehicle.travel_time(distance);
            add_life_support(manifest, crew, time, margin, include_optional, config);
            destination.location
        }
        StepKind::SiteWork {
            site,
            budget,
            elapsed,
            ..
        } => {
            let time = (budget - elapsed).max(0.0);
            add_life_support(manifest, crew, time, margin, include_optional, config);
            site.location
        }
    }
}

fn add_life_support(
    manifest: &mut Manifest,
    crew: u32,
    millisols: f64,
    margin: f64,
    include_optional: bool,
    config: &AgentConfig,
) {
    if crew == 0 || !millisols.is_finite() {
        return;
    }
    let (oxygen, water, food) = config.life_support.per_person(millisols);
    let people = f64::from(crew);
    for (resource, amount) in [
        (Resource::Oxygen, oxygen),
        (Resource::Water, water),
        (Resource::Food, food),
    ] {
        manifest.add_resource(resource, amount * people * margin, false);
        if include_optional {
            manifest.add_resource(resource, amount * people * config.mission.optional_margin, true);
        }
    }
}

/// Number of members who consume life support.
pub fn crew_size(mission: &Mission, settlement: &Settlement) -> u32 {
    let people = mission
        .members
        .iter()
        .filter_map(|member| settlement.workers.get(member))
        .filter(|worker| worker.is_person())
        .count();
    u32::try_from(people).unwrap_or(u32::MAX)
}

/// Requirements for every step still queued, from the vehicle's position.
pub fn plan_requirements(
    mission: &Mission,
    vehicle: &Vehicle,
    crew: u32,
    include_optional: bool,
    margin: f64,
    config: &AgentConfig,
) -> Manifest {
    let mut manifest = Manifest::new();
    let mut from = vehicle.position;
    for step in mission.steps.iter().filter(|step| !step.is_done()) {
        from = step_requirements(
            from,
            step,
            vehicle,
            crew,
            &mut manifest,
            include_optional,
            margin,
            config,
        );
    }
    manifest
}

/// The cached manifest for the remaining plan, recomputed when stale.
///
/// # Errors
///
/// Returns [`AgentError::NoVehicle`] when the mission has no vehicle and
/// propagates a missing vehicle from the settlement.
pub fn required_resources(
    mission: &mut Mission,
    settlement: &Settlement,
    now: f64,
    config: &AgentConfig,
) -> Result<Manifest, AgentError> {
    if let Some(manifest) = mission
        .needs_cache_mut()
        .as_ref()
        .and_then(|cached| cached.fresh(now))
    {
        return Ok(manifest.clone());
    }
    let vehicle_id = mission.vehicle.ok_or(AgentError::NoVehicle(mission.id))?;
    let vehicle = settlement.vehicle(vehicle_id)?;
    let crew = crew_size(mission, settlement);
    let manifest = plan_requirements(
        mission,
        vehicle,
        crew,
        true,
        config.mission.resource_margin,
        config,
    );
    *mission.needs_cache_mut() = Some(Cached::new(
        manifest.clone(),
        now,
        config.mission.needs_cache_millisols,
    ));
    Ok(manifest)
}

/// Why an underway mission must divert, if it must.
///
/// # Errors
///
/// Returns [`AgentError::NoVehicle`] when the mission has no vehicle.
pub fn emergency_cause(
    mission: &Mission,
    settlement: &Settlement,
    config: &AgentConfig,
) -> Result<Option<StatusReason>, AgentError> {
    let medical = mission
        .members
        .iter()
        .filter_map(|member| settlement.workers.get(member))
        .any(|worker| worker.needs_medical_help(config.mission.medical_threshold));
    if medical {
        return Ok(Some(StatusReason::MedicalEmergency));
    }
    let vehicle_id = mission.vehicle.ok_or(AgentError::NoVehicle(mission.id))?;
    let vehicle = settlement.vehicle(vehicle_id)?;
    let crew = crew_size(mission, settlement);
    let remaining = plan_requirements(mission, vehicle, crew, false, 1.0, config);
    if remaining.is_satisfied_by(&vehicle.cargo, false) {
        Ok(None)
    } else {
        Ok(Some(StatusReason::InsufficientResources))
    }
}

/// The closest settlement to `position` in the prior-tick snapshot, home included.
pub fn emergency_destination(scope: &PulseScope<'_>, position: Coordinates) -> NavPoint {
    scope
        .snapshot()
        .nearest_settlement(position)
        .map_or_else(
            || {
                NavPoint::settlement(
                    scope.settlement.id,
                    scope.settlement.location,
                    &scope.settlement.name,
                )
            },
            |(id, summary)| NavPoint::settlement(id, summary.location, &summary.name),
        )
}

/// Divert the mission to the nearest settlement.
///
/// Replaces the remaining plan with one travel leg, recalls members on the
/// surface into the vehicle, records `reason`, and forces the mission back
/// to [`MissionPhase::Travelling`]. A mission already on its emergency
/// route only records the reason.
///
/// # Errors
///
/// Propagates a missing vehicle or an illegal phase transition.
pub fn begin_emergency(
    mission: &mut Mission,
    scope: &mut PulseScope<'_>,
    reason: StatusReason,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    mission.add_reason(reason);
    if mission.emergency {
        return Ok(());
    }
    let pulse = scope.pulse();
    let vehicle_id = mission.vehicle.ok_or(AgentError::NoVehicle(mission.id))?;
    let position = scope.settlement.vehicle(vehicle_id)?.position;
    let destination = emergency_destination(scope, position);

    mission.emergency = true;
    warn!(
        settlement = %scope.settlement.id,
        pulse = pulse.id(),
        mission = %mission.id,
        ?reason,
        destination = %destination.description,
        "mission diverting to nearest settlement"
    );
    mission.replace_steps(MissionStep::travel(destination));

    let members: Vec<UnitId> = mission.members.iter().copied().collect();
    for member in members {
        if let Some(worker) = scope.settlement.workers.get_mut(&member) {
            if matches!(worker.location, WorkerLocation::Outside(_)) {
                worker.location = WorkerLocation::InVehicle(vehicle_id);
            }
            if matches!(
                worker.task.as_ref().map(|task| &task.kind),
                Some(TaskKind::SiteWork { .. })
            ) {
                interrupt_task(worker, config);
            }
        }
    }
    if mission.phase() != MissionPhase::Travelling {
        mission.set_phase(MissionPhase::Travelling, pulse.now())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use habitat_types::{MissionKind, SettlementId};

    use super::*;

    #[test]
    fn travel_leg_needs_fuel_oxidizer_and_life_support() {
        let config = AgentConfig::default();
        let vehicle =
            Vehicle::new(UnitId(1), "Rover", SettlementId::new(), Coordinates::new(0.0, 0.0));
        let step = MissionStep::travel(NavPoint::site(Coordinates::new(100.0, 0.0), "A"));
        let mut manifest = Manifest::new();
        let end = travel_required_resources(
            vehicle.position,
            &step,
            &vehicle,
            2,
            &mut manifest,
            false,
            &config,
        );
        assert_eq!(end, Coordinates::new(100.0, 0.0));
        // 100 units at 2 units/kg with a 1.2 margin.
        assert!((manifest.amount(Resource::Methanol, false) - 60.0).abs() < 1e-9);
        let oxidizer = 60.0 * 1.5;
        let breathing = 0.84 * (10.0 / 1_000.0) * 2.0 * 1.2;
        assert!((manifest.amount(Resource::Oxygen, false) - (oxidizer + breathing)).abs() < 1e-9);
        assert!(manifest.amount(Resource::Food, true) > 0.0);
        let spare = manifest.amount(Resource::Food, true) - manifest.amount(Resource::Food, false);
        assert!(spare.abs() < 1e-12);
    }

    #[test]
    fn plan_skips_finished_steps() {
        let config = AgentConfig::default();
        let home = SettlementId::new();
        let vehicle = Vehicle::new(UnitId(1), "Rover", home, Coordinates::new(0.0, 0.0));
        let mut mission = Mission::new(MissionKind::Exploration, "E", home, 0.0);
        let mut done = MissionStep::travel(NavPoint::site(Coordinates::new(500.0, 0.0), "old"));
        done.complete();
        mission.steps.push_back(done);
        mission
            .steps
            .push_back(MissionStep::travel(NavPoint::site(Coordinates::new(10.0, 0.0), "B")));
        let manifest = plan_requirements(&mission, &vehicle, 0, false, 1.0, &config);
        assert!((manifest.amount(Resource::Methanol, false) - 5.0).abs() < 1e-9);
    }
}
