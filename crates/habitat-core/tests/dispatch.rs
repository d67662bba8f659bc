//! Integration tests for pulse dispatch through the [`Simulation`] facade.
//!
//! These run real rayon pools, so they exercise the join barrier and the
//! isolation of failing settlements the way the run loop sees them.

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::items_after_statements,
    clippy::indexing_slicing
)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use habitat_agents::AgentError;
use habitat_core::config::{ClockConfig, DispatcherConfig, SimulationConfig};
use habitat_core::{SettlementUpdater, Simulation};
use habitat_types::{Coordinates, SettlementId};
use habitat_world::{PulseScope, Settlement};

fn config(threads: usize, start_millisols: f64) -> SimulationConfig {
    SimulationConfig {
        clock: ClockConfig {
            start_millisols,
            ..ClockConfig::default()
        },
        dispatcher: DispatcherConfig {
            reserved_cores: 0,
            worker_threads: Some(threads),
        },
        ..SimulationConfig::default()
    }
}

fn add_settlements(simulation: &mut Simulation, names: &[&str]) -> Vec<SettlementId> {
    names
        .iter()
        .zip(0_u64..)
        .map(|(name, seed)| {
            let x = f64::from(u32::try_from(seed).unwrap()) * 100.0;
            simulation.add_settlement(Settlement::new(*name, Coordinates::new(x, 0.0), seed))
        })
        .collect()
}

// =============================================================================
// Join barrier
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Visit {
    pulse: u64,
    entered: Instant,
    exited: Instant,
}

/// Records when each settlement update starts and ends.
struct Recorder {
    visits: Arc<Mutex<Vec<Visit>>>,
}

impl SettlementUpdater for Recorder {
    fn time_passing(&self, scope: &mut PulseScope<'_>) -> Result<bool, AgentError> {
        let entered = Instant::now();
        thread::sleep(Duration::from_millis(2));
        let visit = Visit {
            pulse: scope.pulse().id(),
            entered,
            exited: Instant::now(),
        };
        self.visits.lock().unwrap().push(visit);
        Ok(true)
    }
}

#[test]
fn no_update_of_a_pulse_starts_before_the_previous_pulse_joined() {
    let visits = Arc::new(Mutex::new(Vec::new()));
    let recorder = Recorder {
        visits: Arc::clone(&visits),
    };
    let mut simulation = Simulation::with_updater(config(2, 0.0), Box::new(recorder)).unwrap();
    add_settlements(&mut simulation, &["A", "B", "C", "D", "E"]);

    for _ in 0..6 {
        let report = simulation.step_millisols(1.0).unwrap().unwrap();
        assert_eq!(report.updated.len(), 5);
        assert_eq!(report.threads, 2);
    }

    let visits = visits.lock().unwrap();
    assert_eq!(visits.len(), 30);
    for pulse in 1..6 {
        let last_exit = visits
            .iter()
            .filter(|visit| visit.pulse == pulse)
            .map(|visit| visit.exited)
            .max()
            .unwrap();
        let first_enter = visits
            .iter()
            .filter(|visit| visit.pulse == pulse + 1)
            .map(|visit| visit.entered)
            .min()
            .unwrap();
        assert!(last_exit <= first_enter, "pulse {pulse} overlapped its successor");
    }
}

// =============================================================================
// Failure isolation
// =============================================================================

/// Counts sols like the production update; one named settlement fails.
struct Flaky {
    panics: &'static str,
    errors: Option<&'static str>,
}

impl SettlementUpdater for Flaky {
    fn time_passing(&self, scope: &mut PulseScope<'_>) -> Result<bool, AgentError> {
        let name = scope.settlement.name.clone();
        if name == self.panics {
            panic!("reactor fault in {name}");
        }
        if self.errors == Some(name.as_str()) {
            return Err(AgentError::NoVehicle(habitat_types::MissionId::new()));
        }
        if scope.pulse().is_new_sol() {
            scope.settlement.sols_elapsed += 1;
        }
        Ok(true)
    }
}

#[test]
fn a_panicking_settlement_does_not_stop_the_others() {
    let updater = Flaky {
        panics: "Doomed",
        errors: None,
    };
    let mut simulation = Simulation::with_updater(config(2, 999.5), Box::new(updater)).unwrap();
    let ids = add_settlements(&mut simulation, &["Alpha", "Beta", "Doomed", "Gamma"]);
    let doomed = ids[2];

    let report = simulation.step_millisols(1.0).unwrap().unwrap();
    assert!(report.pulse.is_new_sol());
    assert!(!report.interrupted);
    assert_eq!(report.updated.len(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].settlement, doomed);
    assert!(report.skipped[0].reason.contains("reactor fault"));

    for id in &ids {
        let expected = u64::from(*id != doomed);
        assert_eq!(simulation.settlement(*id).unwrap().sols_elapsed, expected);
    }

    // The clock keeps running and the failing settlement is retried.
    let next = simulation.step_millisols(1.0).unwrap().unwrap();
    assert_eq!(next.pulse.id(), 2);
    assert_eq!(simulation.clock().pulse_id(), 2);
    assert_eq!(next.updated.len(), 3);
    assert_eq!(next.skipped.len(), 1);

    let view = next.view();
    assert_eq!(view.settlements_updated, 3);
    assert_eq!(view.settlements_failed, 1);
}

#[test]
fn an_erroring_settlement_is_reported_with_its_error() {
    let updater = Flaky {
        panics: "",
        errors: Some("Beta"),
    };
    let mut simulation = Simulation::with_updater(config(2, 0.0), Box::new(updater)).unwrap();
    let ids = add_settlements(&mut simulation, &["Alpha", "Beta"]);

    let report = simulation.step_millisols(5.0).unwrap().unwrap();
    assert_eq!(report.updated, vec![ids[0]]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].settlement, ids[1]);
    assert!(report.skipped[0].reason.contains("has no vehicle"));
}

#[test]
fn snapshot_reflects_the_last_barrier() {
    let updater = Flaky {
        panics: "",
        errors: None,
    };
    let mut simulation = Simulation::with_updater(config(1, 0.0), Box::new(updater)).unwrap();
    let ids = add_settlements(&mut simulation, &["Alpha", "Beta", "Gamma"]);

    assert!(simulation.context().snapshot().get(ids[0]).is_none());
    simulation.step_millisols(1.0).unwrap();
    let snapshot = simulation.context().snapshot();
    for id in &ids {
        assert!(snapshot.get(*id).is_some());
    }
}
