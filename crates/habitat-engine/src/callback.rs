//! Pulse callback that logs a colony summary once per sol.
//!
//! Stands in for a presentation layer: it only reads views from the
//! simulation and never mutates it.

use habitat_core::{PulseCallback, PulseReport, Simulation};
use tracing::{info, warn};

/// Logs one summary line per settlement at every new sol.
#[derive(Debug, Default)]
pub struct SolSummaryCallback {
    pulses: u64,
    failures: u64,
}

impl SolSummaryCallback {
    /// A callback with zeroed counters.
    pub const fn new() -> Self {
        Self {
            pulses: 0,
            failures: 0,
        }
    }

    /// Pulses observed so far.
    pub const fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Settlement updates skipped so far.
    pub const fn failures(&self) -> u64 {
        self.failures
    }
}

impl PulseCallback for SolSummaryCallback {
    fn on_pulse(&mut self, report: &PulseReport, simulation: &Simulation) {
        self.pulses = self.pulses.saturating_add(1);
        let skipped = u64::try_from(report.skipped.len()).unwrap_or(u64::MAX);
        self.failures = self.failures.saturating_add(skipped);
        for skip in &report.skipped {
            warn!(
                pulse = report.pulse.id(),
                settlement = %skip.settlement,
                reason = %skip.reason,
                "settlement skipped this pulse"
            );
        }

        if !report.pulse.is_new_sol() {
            return;
        }
        let view = report.view();
        info!(
            sol = view.sol,
            pulse = view.id,
            updated = view.settlements_updated,
            failed = view.settlements_failed,
            time = %simulation.current_time(),
            "new sol"
        );
        for settlement in simulation.settlements() {
            let busy = simulation
                .worker_views(settlement.id)
                .iter()
                .filter(|worker| worker.task.is_some())
                .count();
            info!(
                sol = view.sol,
                settlement = %settlement.name,
                population = settlement.population(),
                busy,
                missions = settlement.missions.len(),
                finished = settlement.mission_log.len(),
                credits = %settlement.credits,
                "colony status"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_core::SimulationConfig;
    use habitat_core::config::ClockConfig;
    use habitat_types::Coordinates;
    use habitat_world::Settlement;

    use super::*;

    #[test]
    fn counts_pulses_across_a_sol_boundary() {
        let config = SimulationConfig {
            clock: ClockConfig {
                start_millisols: 995.0,
                ..ClockConfig::default()
            },
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::new(config).unwrap();
        simulation.add_settlement(Settlement::new("Base", Coordinates::new(0.0, 0.0), 1));
        let mut callback = SolSummaryCallback::new();

        for _ in 0..3 {
            let report = simulation.step_millisols(4.0).unwrap().unwrap();
            callback.on_pulse(&report, &simulation);
        }
        assert_eq!(callback.pulses(), 3);
        assert_eq!(callback.failures(), 0);
    }
}
