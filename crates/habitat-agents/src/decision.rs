//! The weighted-random decision layer.
//!
//! For each idle worker every registered evaluator is scored against an
//! immutable view of the settlement, zero scores are discarded and one
//! candidate is drawn with probability proportional to its score from the
//! settlement's seeded random stream. The chosen candidate is then applied
//! with mutable access.

use habitat_types::{MissionKind, UnitId};
use habitat_world::{PulseScope, Task, Worker, WorkerLocation};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::meta::{Candidate, DecisionContext, MetaRegistry, evaluate};
use crate::mission::plan_mission;
use crate::task::default_duration;
use crate::trade::refresh_trade_cache;

/// Draw one candidate with probability proportional to its score.
///
/// Candidates with a zero, negative or non-finite score are never drawn.
/// Returns `None` when nothing has a positive score.
pub fn pick_weighted<T: Clone, R: Rng + ?Sized>(scores: &[(T, f64)], rng: &mut R) -> Option<T> {
    let eligible: Vec<&(T, f64)> = scores
        .iter()
        .filter(|(_, score)| score.is_finite() && *score > 0.0)
        .collect();
    eligible
        .choose_weighted(rng, |(_, score)| *score)
        .ok()
        .map(|(candidate, _)| candidate.clone())
}

/// Score every evaluator for one worker.
pub fn score_candidates(
    ctx: &DecisionContext<'_>,
    registry: &MetaRegistry,
    worker: &Worker,
) -> Vec<(Candidate, f64)> {
    let in_vehicle = matches!(worker.location, WorkerLocation::InVehicle(_));
    registry
        .iter()
        .filter(|meta| {
            !(worker.mission.is_some() && matches!(meta.candidate(), Candidate::Mission(_)))
        })
        .map(|meta| (meta.candidate(), evaluate(meta, ctx, worker, in_vehicle)))
        .collect()
}

/// Choose and start an activity for every idle worker.
///
/// # Errors
///
/// Propagates errors from mission planning.
pub fn run_decisions(
    scope: &mut PulseScope<'_>,
    registry: &MetaRegistry,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    let pulse = scope.pulse();
    let snapshot = scope.snapshot();
    refresh_trade_cache(scope.settlement, snapshot, pulse.now(), config);

    let idle: Vec<UnitId> = scope
        .settlement
        .workers
        .values()
        .filter(|worker| worker.is_idle() && !matches!(worker.location, WorkerLocation::Outside(_)))
        .map(|worker| worker.id)
        .collect();

    for id in idle {
        let scores = {
            let settlement = &*scope.settlement;
            let Some(worker) = settlement.workers.get(&id) else {
                continue;
            };
            if !worker.is_idle() {
                continue;
            }
            let ctx = DecisionContext {
                settlement,
                snapshot,
                pulse,
                config,
            };
            score_candidates(&ctx, registry, worker)
        };
        let Some(choice) = pick_weighted(&scores, scope.settlement.rng_mut()) else {
            continue;
        };
        apply_choice(scope, id, choice, config)?;
    }
    Ok(())
}

/// Start the chosen candidate for `worker`.
fn apply_choice(
    scope: &mut PulseScope<'_>,
    worker: UnitId,
    choice: Candidate,
    config: &AgentConfig,
) -> Result<(), AgentError> {
    match choice {
        Candidate::Task(kind) => {
            let duration = default_duration(&kind, config);
            debug!(worker = %worker, task = kind.name(), "task chosen");
            scope.settlement.worker_mut(worker)?.task = Some(Task::new(kind, duration));
        }
        Candidate::Mission(kind) => {
            let target = match kind {
                MissionKind::Trade => {
                    crate::trade::best_destination(scope.settlement).map(|(id, _)| id)
                }
                MissionKind::Exploration => None,
            };
            plan_mission(scope, kind, worker, target, config)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn zero_scores_are_never_picked() {
        let mut rng = StdRng::seed_from_u64(42);
        let scores = [("never", 0.0), ("always", 3.0), ("nan", f64::NAN), ("neg", -2.0)];
        for _ in 0..200 {
            assert_eq!(pick_weighted(&scores, &mut rng), Some("always"));
        }
    }

    #[test]
    fn nothing_eligible_picks_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let scores: [(&str, f64); 2] = [("a", 0.0), ("b", 0.0)];
        assert_eq!(pick_weighted(&scores, &mut rng), None);
        let empty: [(&str, f64); 0] = [];
        assert_eq!(pick_weighted(&empty, &mut rng), None);
    }

    #[test]
    fn draw_is_roughly_proportional() {
        let mut rng = StdRng::seed_from_u64(7);
        let scores = [("low", 1.0), ("high", 3.0)];
        let high = (0..4_000)
            .filter(|_| pick_weighted(&scores, &mut rng) == Some("high"))
            .count();
        assert!((2_700..3_300).contains(&high));
    }

    #[test]
    fn same_seed_same_choice() {
        let scores = [("a", 1.0), ("b", 1.0), ("c", 1.0)];
        let mut first = StdRng::seed_from_u64(99);
        let mut second = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            assert_eq!(
                pick_weighted(&scores, &mut first),
                pick_weighted(&scores, &mut second)
            );
        }
    }
}
