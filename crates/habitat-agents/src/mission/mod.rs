//! Vehicle missions: planning, per-pulse advancement and teardown.
//!
//! A mission is planned when a worker's decision picks a mission
//! candidate. It recruits fit, uncommitted people, reserves a vehicle and
//! lays out its step queue. Every pulse [`advance_all`] runs each active
//! mission's current phase once per member; finished missions are reaped
//! at the end of the pulse, releasing their crew and vehicle.
//!
//! # Submodules
//!
//! - [`phase`] -- Phase handlers, the handler table and transitions.
//! - [`resources`] -- Resource manifests and the emergency path.
//! - [`step`] -- Travel leg execution.

pub mod phase;
pub mod resources;
pub mod step;

use std::f64::consts::TAU;

use habitat_types::{
    Coordinates, MissionId, MissionKind, SettlementId, StatusReason, UnitId, VehicleStatus,
};
use habitat_world::{Mission, MissionStep, NavPoint, PulseScope, Settlement, Worker, WorkerLocation};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::task::interrupt_task;
use crate::trade::plan_goods;

pub use phase::{PhaseHandler, determine_new_phase, handler_for, perform_mission};
pub use resources::{required_resources, travel_required_resources};
pub use step::execute_travel;

/// Whether `worker` could be recruited right now.
fn recruitable(worker: &Worker, config: &AgentConfig) -> bool {
    worker.is_person()
        && worker.mission.is_none()
        && worker.location == WorkerLocation::InSettlement
        && worker.can_do_site_work(config.mission.fatigue_limit, config.mission.medical_threshold)
        && worker
            .task
            .as_ref()
            .is_none_or(|task| task.kind.is_leisure())
}

/// Pick up to `capacity` recruits, `lead` first when eligible.
fn recruit(
    settlement: &Settlement,
    lead: UnitId,
    capacity: usize,
    config: &AgentConfig,
) -> Vec<UnitId> {
    let mut crew: Vec<UnitId> = settlement
        .workers
        .get(&lead)
        .filter(|worker| recruitable(worker, config))
        .map(|worker| worker.id)
        .into_iter()
        .collect();
    crew.extend(
        settlement
            .workers
            .values()
            .filter(|worker| worker.id != lead && recruitable(worker, config))
            .map(|worker| worker.id),
    );
    crew.truncate(capacity);
    crew
}

/// Random exploration sites around `home`.
fn survey_sites(settlement: &mut Settlement, config: &AgentConfig) -> Vec<NavPoint> {
    let home = settlement.location;
    let low = config.mission.site_distance_min.max(0.0);
    let high = config.mission.site_distance_max.max(low);
    (1..=config.mission.exploration_sites)
        .map(|index| {
            let rng = settlement.rng_mut();
            let angle = rng.random_range(0.0..TAU);
            let distance = if high > low {
                rng.random_range(low..high)
            } else {
                low
            };
            let location = Coordinates::new(
                home.x + distance * angle.cos(),
                home.y + distance * angle.sin(),
            );
            NavPoint::site(location, format!("Site {index}"))
        })
        .collect()
}

/// Plan a mission of `kind` led by `lead`.
///
/// Returns the new mission's id, or `None` when no vehicle is free. A
/// mission that cannot be staffed, or a trade mission without a reachable
/// buyer or goods worth selling, is still recorded, already aborted, so
/// the attempt shows up in the mission log.
///
/// # Errors
///
/// Propagates missing units from the settlement.
pub fn plan_mission(
    scope: &mut PulseScope<'_>,
    kind: MissionKind,
    lead: UnitId,
    target: Option<SettlementId>,
    config: &AgentConfig,
) -> Result<Option<MissionId>, AgentError> {
    let pulse = scope.pulse();
    let now = pulse.now();
    let snapshot = scope.snapshot();
    let settlement = &mut *scope.settlement;

    let Some(vehicle_id) = settlement.available_vehicle() else {
        debug!(settlement = %settlement.id, ?kind, "no vehicle free for a mission");
        return Ok(None);
    };
    let number = settlement.missions.len() + settlement.mission_log.len() + 1;
    let mut mission = Mission::new(kind, format!("{kind:?} {number}"), settlement.id, now);
    let id = mission.id;

    let capacity = config
        .mission
        .max_members
        .min(settlement.vehicle(vehicle_id)?.crew_capacity);
    let crew = recruit(settlement, lead, usize::try_from(capacity).unwrap_or(usize::MAX), config);
    if u32::try_from(crew.len()).unwrap_or(u32::MAX) < config.mission.min_members.max(1) {
        mission.abort(StatusReason::NoMembers, now);
        info!(settlement = %settlement.id, mission = %id, ?kind, "mission found no members");
        settlement.missions.insert(id, mission);
        return Ok(Some(id));
    }

    match kind {
        MissionKind::Exploration => {
            for site in survey_sites(settlement, config) {
                mission.steps.push_back(MissionStep::travel(site.clone()));
                mission
                    .steps
                    .push_back(MissionStep::site_work(site, config.mission.site_budget_millisols));
            }
        }
        MissionKind::Trade => {
            let buyer = target
                .filter(|id| *id != settlement.id)
                .and_then(|id| snapshot.get(id).map(|summary| (id, summary)));
            let goods = buyer.map(|(_, summary)| plan_goods(settlement, summary, config));
            match (buyer, goods) {
                (Some((buyer_id, summary)), Some(goods)) if !goods.is_empty() => {
                    let point = NavPoint::settlement(buyer_id, summary.location, &summary.name);
                    mission.steps.push_back(MissionStep::travel(point.clone()));
                    mission
                        .steps
                        .push_back(MissionStep::site_work(point, config.mission.trade_millisols));
                    mission.trade_goods = goods;
                }
                _ => {
                    mission.abort(StatusReason::NotApproved, now);
                    info!(
                        settlement = %settlement.id,
                        mission = %id,
                        "trade mission has nothing to sell"
                    );
                    settlement.missions.insert(id, mission);
                    return Ok(Some(id));
                }
            }
        }
    }
    mission.steps.push_back(MissionStep::travel(NavPoint::settlement(
        settlement.id,
        settlement.location,
        &settlement.name,
    )));

    mission.lead = crew.first().copied();
    for member in &crew {
        let worker = settlement.worker_mut(*member)?;
        worker.mission = Some(id);
        worker.task = None;
        mission.members.insert(*member);
    }
    settlement.vehicle_mut(vehicle_id)?.reserved_for = Some(id);
    mission.vehicle = Some(vehicle_id);

    info!(
        settlement = %settlement.id,
        pulse = pulse.id(),
        mission = %id,
        name = %mission.name,
        ?kind,
        members = mission.members.len(),
        steps = mission.steps.len(),
        "mission planned"
    );
    settlement.missions.insert(id, mission);
    Ok(Some(id))
}

/// Abort a mission on request.
///
/// A mission that has not left yet aborts on the spot. One already out on
/// the surface cannot simply stop, so it records the reason and returns to
/// the nearest settlement through the emergency path. Returns whether the
/// mission exists.
///
/// # Errors
///
/// Propagates errors from the emergency path.
pub fn abort_mission(
    scope: &mut PulseScope<'_>,
    mission_id: MissionId,
    reason: StatusReason,
    config: &AgentConfig,
) -> Result<bool, AgentError> {
    let Some(mut mission) = scope.settlement.missions.remove(&mission_id) else {
        return Ok(false);
    };
    let result = if mission.phase().is_underway() {
        resources::begin_emergency(&mut mission, scope, reason, config)
    } else {
        mission.abort(reason, scope.pulse().now());
        Ok(())
    };
    info!(
        settlement = %scope.settlement.id,
        mission = %mission_id,
        ?reason,
        phase = ?mission.phase(),
        "mission abort requested"
    );
    scope.settlement.missions.insert(mission_id, mission);
    result.map(|()| true)
}

/// Detach a mission's crew and vehicle from it.
///
/// Clears every member's mission and mission-bound task and unreserves the
/// vehicle. A vehicle standing at home is unloaded into the store and
/// garaged, and its crew steps back into the settlement. A vehicle away
/// from home stays parked where it is with its crew aboard.
///
/// # Errors
///
/// Propagates store errors while unloading.
pub fn release(
    settlement: &mut Settlement,
    mission: &Mission,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    let home = settlement.location;
    let at_home = mission
        .vehicle
        .and_then(|id| settlement.vehicles.get(&id))
        .is_none_or(|vehicle| vehicle.position.distance_to(home) <= config.mission.arrival_epsilon);

    for member in &mission.members {
        let Some(worker) = settlement.workers.get_mut(member) else {
            continue;
        };
        if worker.mission == Some(mission.id) {
            worker.mission = None;
        }
        if worker
            .task
            .as_ref()
            .is_some_and(|task| task.mission == Some(mission.id))
        {
            interrupt_task(worker, config);
        }
        if at_home && worker.location != WorkerLocation::InSettlement {
            worker.location = WorkerLocation::InSettlement;
        }
    }

    let Some(vehicle_id) = mission.vehicle else {
        return Ok(());
    };
    let store = &mut settlement.store;
    let Some(vehicle) = settlement.vehicles.get_mut(&vehicle_id) else {
        return Ok(());
    };
    if vehicle.reserved_for == Some(mission.id) {
        vehicle.reserved_for = None;
    }
    vehicle.operator = None;
    if at_home {
        vehicle.position = home;
        vehicle.status = VehicleStatus::Garaged;
        vehicle.cargo.transfer_all_into(store)?;
    } else if vehicle.status != VehicleStatus::Stranded {
        vehicle.status = VehicleStatus::Parked;
    }
    Ok(())
}

/// Remove finished missions, release their units and log them.
///
/// Returns the number of missions reaped.
///
/// # Errors
///
/// Propagates errors from [`release`].
pub fn reap(scope: &mut PulseScope<'_>, config: &AgentConfig) -> Result<usize, AgentError> {
    let finished: Vec<MissionId> = scope
        .settlement
        .missions
        .values()
        .filter(|mission| mission.is_done())
        .map(|mission| mission.id)
        .collect();
    let pulse_id = scope.pulse().id();
    for id in &finished {
        let Some(mission) = scope.settlement.missions.remove(id) else {
            continue;
        };
        release(scope.settlement, &mission, config)?;
        info!(
            settlement = %scope.settlement.id,
            pulse = pulse_id,
            mission = %mission.id,
            name = %mission.name,
            phase = ?mission.phase(),
            status = ?mission.status(),
            reasons = ?mission.reasons,
            distance = mission.distance_travelled,
            "mission finished"
        );
        scope
            .settlement
            .record_finished(mission.view(), config.mission.log_capacity);
    }
    Ok(finished.len())
}

/// Advance every active mission by one pulse.
///
/// Each mission runs its current phase once per member, in member order.
/// Members that left the roster are dropped first; a mission with none
/// left aborts.
///
/// # Errors
///
/// Returns [`AgentError::ForeignSettlement`] when a mission owned by
/// another settlement is found here, and propagates phase errors.
pub fn advance_all(scope: &mut PulseScope<'_>, config: &AgentConfig) -> Result<(), AgentError> {
    let ids: Vec<MissionId> = scope.settlement.missions.keys().copied().collect();
    for id in ids {
        let Some(mut mission) = scope.settlement.missions.remove(&id) else {
            continue;
        };
        let result = advance_one(&mut mission, scope, config);
        scope.settlement.missions.insert(id, mission);
        result?;
    }
    Ok(())
}

fn advance_one(
    mission: &mut Mission,
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    if !scope.owns(mission.settlement) {
        return Err(AgentError::ForeignSettlement {
            active: scope.settlement.id,
            owner: mission.settlement,
        });
    }
    if mission.is_done() {
        return Ok(());
    }
    let workers = &scope.settlement.workers;
    if !mission.retain_members(|member| workers.contains_key(&member)) {
        mission.abort(StatusReason::MembersLost, scope.pulse().now());
        warn!(
            settlement = %scope.settlement.id,
            mission = %mission.id,
            "mission lost all members"
        );
        return Ok(());
    }
    let members: Vec<UnitId> = mission.members.iter().copied().collect();
    for member in members {
        if mission.is_done() {
            break;
        }
        perform_mission(mission, member, scope, config)?;
    }
    Ok(())
}
