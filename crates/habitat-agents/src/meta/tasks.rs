//! Everyday task evaluators.

use habitat_types::{Illumination, JobKind, Resource, WorkerKind};
use habitat_world::{TaskKind, Worker};

use super::{Candidate, DecisionContext, MetaTask};

/// Fatigue below which sleep has no appeal.
const SLEEP_THRESHOLD: f64 = 300.0;
/// Hunger below which eating has no appeal.
const HUNGER_THRESHOLD: f64 = 250.0;

/// Sleep off fatigue; more appealing after dark.
#[derive(Debug, Clone, Copy)]
pub struct SleepMeta;

impl MetaTask for SleepMeta {
    fn name(&self) -> &'static str {
        "sleep"
    }

    fn score(&self, ctx: &DecisionContext<'_>, worker: &Worker) -> f64 {
        let base = (worker.fatigue - SLEEP_THRESHOLD).max(0.0) / 2.0;
        if ctx.illumination() == Illumination::Dark {
            base * 1.5
        } else {
            base
        }
    }

    fn candidate(&self) -> Candidate {
        Candidate::Task(TaskKind::Sleep)
    }

    fn usable_in_vehicle(&self) -> bool {
        true
    }

    fn social_weight(&self) -> f64 {
        -0.2
    }
}

/// Eat when hungry and food is on hand.
#[derive(Debug, Clone, Copy)]
pub struct EatMeta;

impl MetaTask for EatMeta {
    fn name(&self) -> &'static str {
        "eat"
    }

    fn score(&self, ctx: &DecisionContext<'_>, worker: &Worker) -> f64 {
        if ctx.settlement.store.get_amount_resource_stored(Resource::Food) <= 0.0
            && worker.mission.is_none()
        {
            return 0.0;
        }
        (worker.hunger - HUNGER_THRESHOLD).max(0.0) / 2.0
    }

    fn candidate(&self) -> Candidate {
        Candidate::Task(TaskKind::Eat)
    }

    fn usable_in_vehicle(&self) -> bool {
        true
    }
}

/// Unstructured downtime.
#[derive(Debug, Clone, Copy)]
pub struct RelaxMeta;

impl MetaTask for RelaxMeta {
    fn name(&self) -> &'static str {
        "relax"
    }

    fn score(&self, _ctx: &DecisionContext<'_>, worker: &Worker) -> f64 {
        5.0 + worker.stress / 2.0
    }

    fn candidate(&self) -> Candidate {
        Candidate::Task(TaskKind::Relax)
    }

    fn usable_in_vehicle(&self) -> bool {
        true
    }

    fn social_weight(&self) -> f64 {
        -0.5
    }

    fn crowding_weight(&self) -> f64 {
        -0.5
    }
}

/// Spend time with other people.
#[derive(Debug, Clone, Copy)]
pub struct SocializeMeta;

impl MetaTask for SocializeMeta {
    fn name(&self) -> &'static str {
        "socialize"
    }

    fn score(&self, ctx: &DecisionContext<'_>, worker: &Worker) -> f64 {
        if ctx.settlement.population() < 2 {
            return 0.0;
        }
        4.0 + worker.stress / 4.0
    }

    fn candidate(&self) -> Candidate {
        Candidate::Task(TaskKind::Socialize)
    }

    fn social_weight(&self) -> f64 {
        1.0
    }
}

/// Repair infrastructure wear.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceMeta;

impl MetaTask for MaintenanceMeta {
    fn name(&self) -> &'static str {
        "maintenance"
    }

    fn score(&self, ctx: &DecisionContext<'_>, _worker: &Worker) -> f64 {
        ctx.settlement.wear
    }

    fn candidate(&self) -> Candidate {
        Candidate::Task(TaskKind::Maintenance)
    }

    fn applies_to(&self, _kind: WorkerKind) -> bool {
        true
    }

    fn is_work(&self) -> bool {
        true
    }

    fn job_fit(&self, job: JobKind) -> f64 {
        match job {
            JobKind::Engineer => 1.5,
            JobKind::Pilot => 1.1,
            _ => 1.0,
        }
    }
}

/// Tend greenhouse crops.
#[derive(Debug, Clone, Copy)]
pub struct GreenhouseMeta;

impl MetaTask for GreenhouseMeta {
    fn name(&self) -> &'static str {
        "greenhouse"
    }

    fn score(&self, ctx: &DecisionContext<'_>, _worker: &Worker) -> f64 {
        ctx.settlement.crop_need
    }

    fn candidate(&self) -> Candidate {
        Candidate::Task(TaskKind::TendGreenhouse)
    }

    fn applies_to(&self, _kind: WorkerKind) -> bool {
        true
    }

    fn is_work(&self) -> bool {
        true
    }

    fn job_fit(&self, job: JobKind) -> f64 {
        if job == JobKind::Botanist { 1.5 } else { 1.0 }
    }
}

/// Laboratory research.
#[derive(Debug, Clone, Copy)]
pub struct ResearchMeta;

impl MetaTask for ResearchMeta {
    fn name(&self) -> &'static str {
        "research"
    }

    fn score(&self, _ctx: &DecisionContext<'_>, worker: &Worker) -> f64 {
        8.0 * (1.0 - worker.stress / 100.0)
    }

    fn candidate(&self) -> Candidate {
        Candidate::Task(TaskKind::Research)
    }

    fn is_work(&self) -> bool {
        true
    }

    fn job_fit(&self, job: JobKind) -> f64 {
        match job {
            JobKind::Scientist => 1.5,
            JobKind::Doctor => 1.2,
            _ => 1.0,
        }
    }

    fn social_weight(&self) -> f64 {
        -0.3
    }
}

#[cfg(test)]
mod tests {
    use habitat_types::{ClockPulse, Coordinates, SettlementId, UnitId};
    use habitat_world::{ColonySnapshot, Settlement};

    use super::*;
    use crate::config::AgentConfig;
    use crate::meta::evaluate;

    #[test]
    fn rested_worker_does_not_want_sleep() {
        let settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 1);
        let snapshot = ColonySnapshot::default();
        let config = AgentConfig::default();
        let ctx = DecisionContext {
            settlement: &settlement,
            snapshot: &snapshot,
            pulse: ClockPulse::new(1, 1.0, 900.0, 0, false),
            config: &config,
        };
        let mut worker = Worker::person(UnitId(1), "Ada", JobKind::Pilot, SettlementId::new());
        assert!(evaluate(&SleepMeta, &ctx, &worker, false).abs() < f64::EPSILON);
        worker.fatigue = 700.0;
        let dark = evaluate(&SleepMeta, &ctx, &worker, false);
        assert!(dark > 200.0 * 0.5);
    }

    #[test]
    fn robots_only_do_robot_work() {
        let settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 1);
        let snapshot = ColonySnapshot::default();
        let config = AgentConfig::default();
        let ctx = DecisionContext {
            settlement: &settlement,
            snapshot: &snapshot,
            pulse: ClockPulse::new(1, 1.0, 500.0, 0, false),
            config: &config,
        };
        let robot = Worker::robot(UnitId(2), "R2", JobKind::Engineer, SettlementId::new());
        assert!(evaluate(&ResearchMeta, &ctx, &robot, false).abs() < f64::EPSILON);
        assert!(evaluate(&RelaxMeta, &ctx, &robot, false).abs() < f64::EPSILON);
        assert!(MaintenanceMeta.applies_to(WorkerKind::Robot));
    }
}
