//! Phase handlers and phase transitions.
//!
//! Each non-terminal phase maps to one handler through [`handler_for`].
//! A handler runs once per member per pulse and may report the phase's
//! exit condition with [`Mission::end_phase`]; [`perform_mission`] then
//! asks [`determine_new_phase`] where to go next. Handlers never pick the
//! next phase themselves, with one exception: the emergency path forces
//! the mission back to [`MissionPhase::Travelling`].

use std::collections::BTreeMap;

use habitat_types::{
    Illumination, MissionPhase, Resource, SettlementId, StatusReason, UnitId, VehicleStatus,
};
use habitat_world::environment::illumination;
use habitat_world::{
    CrossSettlementEffect, Mission, MissionStep, PulseScope, ResourceStore, Settlement, StepKind,
    TaskKind, WorkerLocation, WorldError,
};
use tracing::{debug, info, warn};

use super::release;
use super::resources::{begin_emergency, emergency_cause, required_resources};
use super::step::execute_travel;
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::task::assign_site_work;
use crate::trade::{sale_value, to_credits};

/// Signature shared by every phase handler.
pub type PhaseHandler =
    fn(&mut Mission, UnitId, &mut PulseScope<'_>, &AgentConfig) -> Result<(), AgentError>;

/// The handler for `phase`, or `None` for terminal phases.
pub fn handler_for(phase: MissionPhase) -> Option<PhaseHandler> {
    match phase {
        MissionPhase::Reviewing => Some(review),
        MissionPhase::Embarking => Some(embark),
        MissionPhase::Travelling => Some(travel),
        MissionPhase::Exploring | MissionPhase::Trading => Some(site_work),
        MissionPhase::Disembarking => Some(disembark),
        MissionPhase::Completed | MissionPhase::Aborted => None,
    }
}

/// Run the current phase for one member and transition if it ended.
///
/// # Errors
///
/// Returns [`AgentError::MissingMember`] when `member` is not on the
/// roster, and propagates handler and transition errors.
pub fn perform_mission(
    mission: &mut Mission,
    member: UnitId,
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    if mission.is_done() {
        return Ok(());
    }
    if !scope.settlement.workers.contains_key(&member) {
        return Err(AgentError::MissingMember {
            mission: mission.id,
            member,
        });
    }
    if let Some(handler) = handler_for(mission.phase()) {
        handler(mission, member, scope, config)?;
    }
    if mission.phase_ended() && !mission.is_done() {
        let from = mission.phase();
        let next = determine_new_phase(mission);
        let now = scope.pulse().now();
        if next == MissionPhase::Completed {
            mission.complete(now)?;
        } else {
            mission.set_phase(next, now)?;
        }
        info!(
            settlement = %scope.settlement.id,
            pulse = scope.pulse().id(),
            mission = %mission.id,
            ?from,
            to = ?next,
            "mission phase changed"
        );
    }
    Ok(())
}

/// The phase that follows the current one, given the remaining steps.
///
/// Finished steps are skipped: the first step not yet done decides between
/// travelling and the mission's site phase, and an exhausted queue means
/// the crew disembarks.
pub fn determine_new_phase(mission: &Mission) -> MissionPhase {
    match mission.phase() {
        MissionPhase::Reviewing => MissionPhase::Embarking,
        MissionPhase::Disembarking => MissionPhase::Completed,
        MissionPhase::Embarking
        | MissionPhase::Travelling
        | MissionPhase::Exploring
        | MissionPhase::Trading => {
            match mission.steps.iter().find(|step| !step.is_done()) {
                Some(step) if step.is_travel() => MissionPhase::Travelling,
                Some(_) => mission.kind.site_phase(),
                None => MissionPhase::Disembarking,
            }
        }
        terminal @ (MissionPhase::Completed | MissionPhase::Aborted) => terminal,
    }
}

/// Wait out the review period, then approve if a vehicle and supplies are ready.
fn review(
    mission: &mut Mission,
    _member: UnitId,
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    let pulse = scope.pulse();
    let now = pulse.now();
    if now - mission.phase_started() < config.mission.review_millisols {
        return Ok(());
    }
    let vehicle_ready = mission.vehicle.is_some_and(|id| {
        scope.settlement.vehicles.get(&id).is_some_and(|vehicle| {
            vehicle.reserved_for == Some(mission.id) && vehicle.status == VehicleStatus::Garaged
        })
    });
    if !vehicle_ready {
        mission.abort(StatusReason::NoVehicle, now);
        warn!(
            settlement = %scope.settlement.id,
            mission = %mission.id,
            "mission vehicle unavailable"
        );
        return Ok(());
    }
    let needs = required_resources(mission, scope.settlement, now, config)?;
    if !needs.is_satisfied_by(&scope.settlement.store, false) {
        mission.abort(StatusReason::NotApproved, now);
        info!(
            settlement = %scope.settlement.id,
            pulse = pulse.id(),
            mission = %mission.id,
            "mission not approved: supplies short"
        );
        return Ok(());
    }
    mission.end_phase();
    Ok(())
}

/// Move up to `wanted` of each resource from `store` into `cargo`.
/// Returns what was actually loaded.
fn load(
    store: &mut ResourceStore,
    cargo: &mut ResourceStore,
    wanted: &BTreeMap<Resource, f64>,
) -> Result<BTreeMap<Resource, f64>, AgentError> {
    let mut loaded = BTreeMap::new();
    for (resource, amount) in wanted {
        let taken = store.retrieve_amount_resource(*resource, *amount)?;
        let stored = cargo.store_amount_resource(*resource, taken)?;
        if stored < taken {
            store.store_amount_resource(*resource, taken - stored)?;
        }
        if stored > 0.0 {
            loaded.insert(*resource, stored);
        }
    }
    Ok(loaded)
}

/// Load the vehicle once, then board members until the whole crew is aboard.
fn embark(
    mission: &mut Mission,
    member: UnitId,
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    let pulse = scope.pulse();
    let now = pulse.now();
    let vehicle_id = mission.vehicle.ok_or(AgentError::NoVehicle(mission.id))?;

    if !mission.cargo_loaded {
        let needs = required_resources(mission, scope.settlement, now, config)?;
        let Settlement {
            store, vehicles, ..
        } = &mut *scope.settlement;
        let vehicle = vehicles
            .get_mut(&vehicle_id)
            .ok_or(WorldError::VehicleNotFound(vehicle_id))?;
        load(store, &mut vehicle.cargo, &needs.totals(true))?;
        let goods = std::mem::take(&mut mission.trade_goods);
        mission.trade_goods = load(store, &mut vehicle.cargo, &goods)?;
        mission.cargo_loaded = true;
        if !needs.is_satisfied_by(&vehicle.cargo, false) {
            mission.abort(StatusReason::InsufficientResources, now);
            warn!(
                settlement = %scope.settlement.id,
                mission = %mission.id,
                "mission could not load required supplies"
            );
            return Ok(());
        }
        debug!(mission = %mission.id, cargo_kg = vehicle.cargo.total_mass(), "vehicle loaded");
    }

    let worker = scope.settlement.worker_mut(member)?;
    if !worker.is_aboard(vehicle_id) {
        worker.location = WorkerLocation::InVehicle(vehicle_id);
        if worker.task.as_ref().is_some_and(|task| task.mission.is_none()) {
            worker.task = None;
        }
    }

    let settlement = &mut *scope.settlement;
    let all_aboard = mission.members.iter().all(|id| {
        settlement
            .workers
            .get(id)
            .is_some_and(|worker| worker.is_aboard(vehicle_id))
    });
    if all_aboard {
        let vehicle = settlement.vehicle_mut(vehicle_id)?;
        vehicle.status = VehicleStatus::Travelling;
        mission.distance_travelled = 0.0;
        mission.end_phase();
        info!(
            settlement = %settlement.id,
            pulse = pulse.id(),
            mission = %mission.id,
            crew = mission.members.len(),
            "mission departed"
        );
    }
    Ok(())
}

/// Drive the head travel leg; divert on emergencies.
fn travel(
    mission: &mut Mission,
    member: UnitId,
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    let now = scope.pulse().now();
    if mission.head_step().is_none_or(|step| !step.is_travel()) {
        mission.end_phase();
        return Ok(());
    }
    let vehicle_id = mission.vehicle.ok_or(AgentError::NoVehicle(mission.id))?;
    if scope.settlement.vehicle(vehicle_id)?.status == VehicleStatus::Stranded {
        mission.abort(StatusReason::VehicleStranded, now);
        warn!(
            settlement = %scope.settlement.id,
            mission = %mission.id,
            "mission aborted: vehicle stranded"
        );
        return Ok(());
    }
    if !mission.emergency {
        if let Some(reason) = emergency_cause(mission, scope.settlement, config)? {
            begin_emergency(mission, scope, reason, config)?;
        }
    }
    execute_travel(mission, member, scope, config)?;
    if mission.head_step().is_some_and(MissionStep::is_done) {
        mission.pop_done_step();
        mission.end_phase();
    }
    Ok(())
}

/// Work the head site step; the phase ends once it is done and everyone is back aboard.
fn site_work(
    mission: &mut Mission,
    member: UnitId,
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    let pulse = scope.pulse();
    let Some(site) = mission
        .head_step()
        .filter(|step| !step.is_travel())
        .map(|step| step.navpoint().location)
    else {
        mission.end_phase();
        return Ok(());
    };
    let vehicle_id = mission.vehicle.ok_or(AgentError::NoVehicle(mission.id))?;

    if !mission.emergency {
        if let Some(reason) = emergency_cause(mission, scope.settlement, config)? {
            return begin_emergency(mission, scope, reason, config);
        }
    }
    if mission.last_site_pulse != Some(pulse.id()) {
        mission.last_site_pulse = Some(pulse.id());
        accumulate_site_time(mission, scope, config)?;
    }

    let phase = mission.phase();
    let step_done = mission.head_step().is_some_and(MissionStep::is_done);
    let lit = phase != MissionPhase::Exploring || light_at(scope) == Illumination::Daylight;
    let worker = scope.settlement.worker_mut(member)?;
    let able =
        worker.can_do_site_work(config.mission.fatigue_limit, config.mission.medical_threshold);
    if !step_done && lit && able {
        if phase == MissionPhase::Exploring {
            worker.location = WorkerLocation::Outside(site);
        }
        assign_site_work(worker, phase, mission.id, config);
    } else {
        if matches!(worker.location, WorkerLocation::Outside(_)) {
            worker.location = WorkerLocation::InVehicle(vehicle_id);
        }
        if matches!(
            worker.task.as_ref().map(|task| &task.kind),
            Some(TaskKind::SiteWork { .. })
        ) {
            worker.task = None;
        }
    }

    if step_done {
        let settlement = &*scope.settlement;
        let all_aboard = mission.members.iter().all(|id| {
            settlement
                .workers
                .get(id)
                .is_none_or(|worker| worker.is_aboard(vehicle_id))
        });
        if all_aboard {
            mission.pop_done_step();
            mission.end_phase();
        }
    }
    Ok(())
}

fn light_at(scope: &PulseScope<'_>) -> Illumination {
    illumination(
        scope.pulse().millisol_of_sol(),
        scope.settlement.time_offset_millisols,
    )
}

/// Accumulate one pulse of site time on the head site step.
///
/// Exploration needs daylight, and a fit crew waits through darkness and
/// twilight for it. When no member is fit to work the step is cut short,
/// unless it is dark. Exploration collects rock samples in proportion to
/// the working crew; trading sells the carried goods on the first working
/// pulse.
fn accumulate_site_time(
    mission: &mut Mission,
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    let pulse = scope.pulse();
    let phase = mission.phase();
    let light = light_at(scope);
    let lit = phase == MissionPhase::Trading || light == Illumination::Daylight;
    let crew = mission
        .members
        .iter()
        .filter_map(|id| scope.settlement.workers.get(id))
        .filter(|worker| {
            worker.can_do_site_work(config.mission.fatigue_limit, config.mission.medical_threshold)
        })
        .count();
    let crew = u32::try_from(crew).unwrap_or(u32::MAX);

    let Some(step) = mission.head_step_mut() else {
        return Ok(());
    };
    let StepKind::SiteWork {
        site,
        budget,
        elapsed,
        samples,
    } = &mut step.kind
    else {
        return Ok(());
    };
    let buyer = site.settlement;

    let mut worked = false;
    let mut cut_short = false;
    let finished = if *elapsed >= *budget {
        true
    } else if crew == 0 {
        // An unfit crew waits out darkness only.
        cut_short = !(phase == MissionPhase::Exploring && light == Illumination::Dark);
        cut_short
    } else if !lit {
        false
    } else {
        worked = true;
        *elapsed += pulse.elapsed();
        if phase == MissionPhase::Exploring {
            *samples += config.mission.sample_rate * f64::from(crew) * pulse.elapsed();
        }
        *elapsed >= *budget
    };
    let collected = *samples;
    if finished {
        step.complete();
    }

    if cut_short {
        mission.add_reason(StatusReason::SiteWorkCutShort);
        info!(
            settlement = %scope.settlement.id,
            pulse = pulse.id(),
            mission = %mission.id,
            ?light,
            crew,
            "site work cut short"
        );
    }
    if worked && phase == MissionPhase::Trading && !mission.trade_goods.is_empty() {
        sell_goods(mission, scope, buyer)?;
    }
    if finished && phase == MissionPhase::Exploring && collected > 0.0 {
        let vehicle_id = mission.vehicle.ok_or(AgentError::NoVehicle(mission.id))?;
        let stored = scope
            .settlement
            .vehicle_mut(vehicle_id)?
            .cargo
            .store_amount_resource(Resource::RockSamples, collected)?;
        info!(
            settlement = %scope.settlement.id,
            mission = %mission.id,
            samples_kg = stored,
            "site survey finished"
        );
    }
    Ok(())
}

/// Sell the carried goods to `buyer` and queue their delivery.
fn sell_goods(
    mission: &mut Mission,
    scope: &mut PulseScope<'_>,
    buyer: Option<SettlementId>,
) -> Result<(), AgentError> {
    let Some(buyer) = buyer.filter(|id| !scope.owns(*id)) else {
        return Ok(());
    };
    let Some(summary) = scope.snapshot().get(buyer) else {
        return Ok(());
    };
    let vehicle_id = mission.vehicle.ok_or(AgentError::NoVehicle(mission.id))?;
    let vehicle = scope.settlement.vehicle_mut(vehicle_id)?;
    let mut sold = BTreeMap::new();
    for (resource, amount) in std::mem::take(&mut mission.trade_goods) {
        let taken = vehicle.cargo.retrieve_amount_resource(resource, amount)?;
        if taken > 0.0 {
            sold.insert(resource, taken);
        }
    }
    if sold.is_empty() {
        return Ok(());
    }
    let payment = to_credits(sale_value(&sold, summary));
    scope.settlement.credits += payment;
    info!(
        settlement = %scope.settlement.id,
        mission = %mission.id,
        %buyer,
        %payment,
        "goods sold"
    );
    let from = scope.settlement.id;
    scope.defer(CrossSettlementEffect::DeliverGoods {
        from,
        to: buyer,
        goods: sold,
        payment,
    });
    Ok(())
}

/// Unload and release the crew at home, or hand vehicle and crew to a foreign settlement.
fn disembark(
    mission: &mut Mission,
    _member: UnitId,
    scope: &mut PulseScope<'_>,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    let Some(vehicle_id) = mission.vehicle else {
        mission.end_phase();
        return Ok(());
    };
    let home = scope.settlement.id;
    let epsilon = config.mission.arrival_epsilon;
    let position = scope.settlement.vehicle(vehicle_id)?.position;

    if position.distance_to(scope.settlement.location) <= epsilon {
        release(scope.settlement, mission, config)?;
        info!(settlement = %home, mission = %mission.id, "crew disembarked at home");
    } else if let Some((host, _)) = scope
        .snapshot()
        .nearest_settlement(position)
        .filter(|(id, summary)| *id != home && summary.location.distance_to(position) <= epsilon)
    {
        let settlement = &mut *scope.settlement;
        let mut vehicle = settlement
            .vehicles
            .remove(&vehicle_id)
            .ok_or(WorldError::VehicleNotFound(vehicle_id))?;
        vehicle.reserved_for = None;
        vehicle.operator = None;
        let crew: Vec<_> = mission
            .members
            .iter()
            .filter_map(|id| settlement.workers.remove(id))
            .collect();
        mission.vehicle = None;
        info!(
            settlement = %home,
            mission = %mission.id,
            %host,
            crew = crew.len(),
            "crew and vehicle handed over"
        );
        scope.defer(CrossSettlementEffect::TransferCustody {
            from: home,
            to: host,
            vehicle: Box::new(vehicle),
            crew,
        });
    } else {
        warn!(
            settlement = %home,
            mission = %mission.id,
            x = position.x,
            y = position.y,
            "mission ended away from any settlement"
        );
        release(scope.settlement, mission, config)?;
    }
    mission.end_phase();
    Ok(())
}
