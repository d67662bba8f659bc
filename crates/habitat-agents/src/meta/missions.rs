//! Mission evaluators.
//!
//! A mission candidate only scores when the worker could lead one right
//! now: not already committed, inside the settlement, fit for the trip, a
//! vehicle free and the settlement below its concurrent-mission limit.

use habitat_types::{JobKind, MissionKind, Resource};
use habitat_world::{Worker, WorkerLocation};

use super::{Candidate, DecisionContext, MetaTask};
use crate::trade::best_destination;

/// Kilograms of rock samples at which exploration loses half its appeal.
const SAMPLE_SATURATION: f64 = 100.0;

/// Whether `worker` could lead a new mission from this settlement.
pub fn can_lead_mission(ctx: &DecisionContext<'_>, worker: &Worker) -> bool {
    let settlement = ctx.settlement;
    let mission_config = &ctx.config.mission;
    let active = settlement
        .missions
        .values()
        .filter(|mission| !mission.is_done())
        .count();
    worker.mission.is_none()
        && worker.location == WorkerLocation::InSettlement
        && worker.can_do_site_work(
            mission_config.fatigue_limit / 2.0,
            mission_config.medical_threshold * 2.0,
        )
        && active < usize::try_from(mission_config.max_concurrent).unwrap_or(usize::MAX)
        && settlement.available_vehicle().is_some()
        && settlement.population() >= mission_config.min_members
}

/// Drive out to survey sites and bring back rock samples.
#[derive(Debug, Clone, Copy)]
pub struct ExplorationMeta;

impl MetaTask for ExplorationMeta {
    fn name(&self) -> &'static str {
        "exploration"
    }

    fn score(&self, ctx: &DecisionContext<'_>, worker: &Worker) -> f64 {
        if !can_lead_mission(ctx, worker) {
            return 0.0;
        }
        let samples = ctx
            .settlement
            .store
            .get_amount_resource_stored(Resource::RockSamples);
        12.0 / (1.0 + samples / SAMPLE_SATURATION)
    }

    fn candidate(&self) -> Candidate {
        Candidate::Mission(MissionKind::Exploration)
    }

    fn is_work(&self) -> bool {
        true
    }

    fn job_fit(&self, job: JobKind) -> f64 {
        match job {
            JobKind::Scientist => 1.5,
            JobKind::Pilot => 1.3,
            _ => 1.0,
        }
    }

    fn crowding_weight(&self) -> f64 {
        0.5
    }
}

/// Drive surplus goods to the most profitable settlement.
#[derive(Debug, Clone, Copy)]
pub struct TradeMeta;

impl MetaTask for TradeMeta {
    fn name(&self) -> &'static str {
        "trade"
    }

    fn score(&self, ctx: &DecisionContext<'_>, worker: &Worker) -> f64 {
        if !can_lead_mission(ctx, worker) {
            return 0.0;
        }
        best_destination(ctx.settlement).map_or(0.0, |(_, profit)| (profit / 100.0).min(60.0))
    }

    fn candidate(&self) -> Candidate {
        Candidate::Mission(MissionKind::Trade)
    }

    fn is_work(&self) -> bool {
        true
    }

    fn job_fit(&self, job: JobKind) -> f64 {
        match job {
            JobKind::Trader => 2.0,
            JobKind::Pilot => 1.2,
            _ => 1.0,
        }
    }

    fn crowding_weight(&self) -> f64 {
        0.5
    }

    fn social_weight(&self) -> f64 {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use habitat_types::{ClockPulse, Coordinates, UnitId};
    use habitat_world::{ColonySnapshot, Settlement, Vehicle};

    use super::*;
    use crate::config::AgentConfig;

    #[test]
    fn exploration_needs_a_vehicle() {
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 1);
        let id = settlement.id;
        let worker = Worker::person(UnitId(1), "Ada", JobKind::Scientist, id);
        settlement.add_worker(worker.clone());
        let snapshot = ColonySnapshot::default();
        let config = AgentConfig::default();

        let score = {
            let ctx = DecisionContext {
                settlement: &settlement,
                snapshot: &snapshot,
                pulse: ClockPulse::new(1, 1.0, 500.0, 0, false),
                config: &config,
            };
            ExplorationMeta.score(&ctx, &worker)
        };
        assert!(score.abs() < f64::EPSILON);

        settlement.add_vehicle(Vehicle::new(UnitId(10), "Rover", id, settlement.location));
        let ctx = DecisionContext {
            settlement: &settlement,
            snapshot: &snapshot,
            pulse: ClockPulse::new(1, 1.0, 500.0, 0, false),
            config: &config,
        };
        assert!(ExplorationMeta.score(&ctx, &worker) > 0.0);
        assert!(TradeMeta.score(&ctx, &worker).abs() < f64::EPSILON);
    }
}
