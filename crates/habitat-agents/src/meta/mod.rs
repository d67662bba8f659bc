//! Meta-tasks: evaluators that score candidate activities for a worker.
//!
//! Every decision, each registered [`MetaTask`] scores how appealing its
//! candidate is for one worker. Scores are computed fresh each time from
//! settlement state; only expensive source data (trade profit per
//! destination) is cached on the settlement.
//!
//! A score is a base value from the meta-task times a chain of modifiers
//! collected by a [`Rating`]. Negative and NaN results floor to zero, and
//! zero-score candidates never win the weighted draw.
//!
//! # Modules
//!
//! - [`tasks`] -- Everyday tasks (sleep, eat, relax, socialize, work).
//! - [`missions`] -- Vehicle missions (exploration, trade).

pub mod missions;
pub mod tasks;

use habitat_types::{ClockPulse, Illumination, JobKind, MissionKind, WorkerKind};
use habitat_world::environment::illumination;
use habitat_world::{ColonySnapshot, Settlement, TaskKind, Worker};

use crate::config::AgentConfig;

/// Read-only inputs to a scoring pass.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// The worker's settlement.
    pub settlement: &'a Settlement,
    /// Other settlements as of the previous barrier.
    pub snapshot: &'a ColonySnapshot,
    /// The current pulse.
    pub pulse: ClockPulse,
    /// Agent tunables.
    pub config: &'a AgentConfig,
}

impl DecisionContext<'_> {
    /// Illumination at the settlement right now.
    pub fn illumination(&self) -> Illumination {
        illumination(
            self.pulse.millisol_of_sol(),
            self.settlement.time_offset_millisols,
        )
    }

    /// People per living slot at the settlement; `1.0` is exactly full.
    pub fn crowding(&self) -> f64 {
        let capacity = self.settlement.living_capacity.max(1);
        f64::from(self.settlement.population()) / f64::from(capacity)
    }
}

/// What a meta-task proposes.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Start a task.
    Task(TaskKind),
    /// Start a mission led by the worker.
    Mission(MissionKind),
}

/// An evaluator for one kind of activity.
pub trait MetaTask: Send + Sync {
    /// Name used in logs and as the learned-preference key.
    fn name(&self) -> &'static str;

    /// Base appeal of the activity, before modifiers.
    fn score(&self, ctx: &DecisionContext<'_>, worker: &Worker) -> f64;

    /// The activity this evaluator proposes.
    fn candidate(&self) -> Candidate;

    /// Whether workers of `kind` can perform the activity.
    fn applies_to(&self, kind: WorkerKind) -> bool {
        kind == WorkerKind::Person
    }

    /// Whether the activity can be done aboard a vehicle.
    fn usable_in_vehicle(&self) -> bool {
        false
    }

    /// Whether the activity is work (scaled by performance).
    fn is_work(&self) -> bool {
        false
    }

    /// Multiplier for how well `job` suits the activity.
    fn job_fit(&self, _job: JobKind) -> f64 {
        1.0
    }

    /// `+1` for social activities, `-1` for solitary ones, `0` for neutral.
    fn social_weight(&self) -> f64 {
        0.0
    }

    /// How a crowded settlement changes the appeal: positive for activities
    /// that get people out, negative for ones that need room, `0` for neutral.
    fn crowding_weight(&self) -> f64 {
        0.0
    }
}

/// Multiplicative score accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    base: f64,
    modifiers: Vec<(&'static str, f64)>,
}

impl Rating {
    /// Start from a base score.
    pub const fn new(base: f64) -> Self {
        Self {
            base,
            modifiers: Vec::new(),
        }
    }

    /// Apply a named multiplier.
    pub fn modify(&mut self, name: &'static str, factor: f64) {
        self.modifiers.push((name, factor));
    }

    /// The final score, floored to zero for negative or NaN results.
    pub fn value(&self) -> f64 {
        let score = self
            .modifiers
            .iter()
            .fold(self.base, |score, (_, factor)| score * factor);
        if score.is_nan() || score < 0.0 {
            0.0
        } else {
            score
        }
    }

    /// Modifiers applied so far.
    pub fn modifiers(&self) -> &[(&'static str, f64)] {
        &self.modifiers
    }
}

/// Full score for `meta` applied to `worker`.
pub fn evaluate(
    meta: &dyn MetaTask,
    ctx: &DecisionContext<'_>,
    worker: &Worker,
    in_vehicle: bool,
) -> f64 {
    if !meta.applies_to(worker.kind) || (in_vehicle && !meta.usable_in_vehicle()) {
        return 0.0;
    }
    let mut rating = Rating::new(meta.score(ctx, worker));
    if meta.is_work() {
        rating.modify("performance", worker.performance);
    }
    rating.modify("job", meta.job_fit(worker.job));
    let weight = meta.social_weight();
    if weight != 0.0 && worker.is_person() {
        rating.modify("extraversion", 1.0 + weight * (worker.extraversion - 50.0) / 100.0);
    }
    let crowd = meta.crowding_weight();
    if crowd != 0.0 {
        rating.modify("crowding", (1.0 + crowd * (ctx.crowding() - 1.0)).max(0.0));
    }
    rating.modify("preference", 1.0 + worker.preference(meta.name()));
    rating.value()
}

/// The set of evaluators consulted by the decision layer.
pub struct MetaRegistry {
    entries: Vec<Box<dyn MetaTask>>,
}

impl std::fmt::Debug for MetaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.name()))
            .finish()
    }
}

impl MetaRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Every built-in task and mission evaluator.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(tasks::SleepMeta));
        registry.register(Box::new(tasks::EatMeta));
        registry.register(Box::new(tasks::RelaxMeta));
        registry.register(Box::new(tasks::SocializeMeta));
        registry.register(Box::new(tasks::MaintenanceMeta));
        registry.register(Box::new(tasks::GreenhouseMeta));
        registry.register(Box::new(tasks::ResearchMeta));
        registry.register(Box::new(missions::ExplorationMeta));
        registry.register(Box::new(missions::TradeMeta));
        registry
    }

    /// Add an evaluator.
    pub fn register(&mut self, meta: Box<dyn MetaTask>) {
        self.entries.push(meta);
    }

    /// Iterate over evaluators.
    pub fn iter(&self) -> impl Iterator<Item = &dyn MetaTask> {
        self.entries.iter().map(AsRef::as_ref)
    }

    /// Number of evaluators.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no evaluators.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MetaRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::{Coordinates, SettlementId, UnitId};

    use super::*;

    struct Fixed(f64);

    impl MetaTask for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn score(&self, _ctx: &DecisionContext<'_>, _worker: &Worker) -> f64 {
            self.0
        }
        fn candidate(&self) -> Candidate {
            Candidate::Task(TaskKind::Relax)
        }
    }

    #[test]
    fn rating_floors_negative_and_nan() {
        let mut rating = Rating::new(5.0);
        rating.modify("flip", -1.0);
        assert!(rating.value().abs() < f64::EPSILON);
        assert!(Rating::new(f64::NAN).value().abs() < f64::EPSILON);
        let mut fine = Rating::new(2.0);
        fine.modify("double", 2.0);
        assert!((fine.value() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn evaluate_never_negative() {
        let settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 1);
        let snapshot = ColonySnapshot::default();
        let config = AgentConfig::default();
        let ctx = DecisionContext {
            settlement: &settlement,
            snapshot: &snapshot,
            pulse: ClockPulse::new(1, 1.0, 500.0, 0, false),
            config: &config,
        };
        let worker = Worker::person(UnitId(1), "Ada", JobKind::Pilot, SettlementId::new());
        for base in [-10.0, 0.0, f64::NAN, 3.0] {
            let score = evaluate(&Fixed(base), &ctx, &worker, false);
            assert!(score >= 0.0);
        }
        assert!(evaluate(&Fixed(3.0), &ctx, &worker, true).abs() < f64::EPSILON);
    }

    struct Outing;

    impl MetaTask for Outing {
        fn name(&self) -> &'static str {
            "outing"
        }
        fn score(&self, _ctx: &DecisionContext<'_>, _worker: &Worker) -> f64 {
            10.0
        }
        fn candidate(&self) -> Candidate {
            Candidate::Mission(MissionKind::Exploration)
        }
        fn crowding_weight(&self) -> f64 {
            0.5
        }
    }

    fn settlement_with(people: u32) -> Settlement {
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 1);
        settlement.living_capacity = 4;
        let id = settlement.id;
        for n in 1..=people {
            settlement.add_worker(Worker::person(UnitId(n), "Crew", JobKind::Pilot, id));
        }
        settlement
    }

    #[test]
    fn crowding_scales_scores() {
        let snapshot = ColonySnapshot::default();
        let config = AgentConfig::default();
        let score_at = |settlement: &Settlement| {
            let ctx = DecisionContext {
                settlement,
                snapshot: &snapshot,
                pulse: ClockPulse::new(1, 1.0, 500.0, 0, false),
                config: &config,
            };
            assert!((ctx.crowding() - f64::from(settlement.population()) / 4.0).abs() < 1e-12);
            let worker = settlement.workers.get(&UnitId(1)).unwrap();
            evaluate(&Outing, &ctx, worker, false)
        };

        let full = score_at(&settlement_with(4));
        let roomy = score_at(&settlement_with(2));
        let packed = score_at(&settlement_with(8));
        assert!((full - 10.0).abs() < 1e-9);
        assert!((roomy - 7.5).abs() < 1e-9);
        assert!((packed - 15.0).abs() < 1e-9);
        // Neutral evaluators ignore crowding.
        let crowded = settlement_with(8);
        let ctx = DecisionContext {
            settlement: &crowded,
            snapshot: &snapshot,
            pulse: ClockPulse::new(1, 1.0, 500.0, 0, false),
            config: &config,
        };
        let worker = Worker::person(UnitId(1), "Ada", JobKind::Pilot, SettlementId::new());
        assert!((evaluate(&Fixed(3.0), &ctx, &worker, false) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn standard_registry_has_tasks_and_missions() {
        let registry = MetaRegistry::standard();
        assert_eq!(registry.len(), 9);
        assert!(registry
            .iter()
            .any(|meta| matches!(meta.candidate(), Candidate::Mission(MissionKind::Trade))));
    }
}
