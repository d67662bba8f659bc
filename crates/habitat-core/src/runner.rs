//! Simulation loop runner with operator controls.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives the pulse loop with support for:
//!
//! - **Bounded simulation**: stop after `max_pulses` or `max_real_time_seconds`
//! - **Pause/resume**: the operator can halt and continue the loop
//! - **Variable speed**: pulse interval adjustable at runtime
//! - **Operator stop**: cancels in-flight settlement updates and returns
//!
//! Each iteration measures the real time since the previous step and hands
//! it to [`Simulation::step`], which converts it to simulated millisols.

use std::sync::Arc;

use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::dispatch::{DispatchError, PulseReport};
use crate::operator::{OperatorState, SimulationEndReason};
use crate::simulation::{Simulation, SimulationError};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A simulation step failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: SimulationError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last pulse report, if any pulse was dispatched.
    pub final_report: Option<PulseReport>,
    /// Total number of pulses dispatched by this run.
    pub total_pulses: u64,
}

/// Callback invoked after each dispatched pulse.
///
/// Presentation layers use this to refresh their views. The callback
/// receives the report and read access to the simulation.
pub trait PulseCallback: Send {
    /// Called after a pulse completes.
    fn on_pulse(&mut self, report: &PulseReport, simulation: &Simulation);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl PulseCallback for NoOpCallback {
    fn on_pulse(&mut self, _report: &PulseReport, _simulation: &Simulation) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a step fails for any reason other than the
/// dispatcher having been shut down.
pub async fn run_simulation(
    simulation: &mut Simulation,
    operator: &Arc<OperatorState>,
    callback: &mut dyn PulseCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_report: Option<PulseReport> = None;
    let mut total_pulses: u64 = 0;
    let mut last_step = Instant::now();

    info!(
        max_pulses = operator.max_pulses(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        tick_interval_ms = operator.tick_interval_ms(),
        settlements = simulation.settlement_count(),
        "Simulation starting"
    );

    loop {
        // --- Pause ---
        if operator.is_paused() {
            info!("Simulation paused, waiting for resume...");
            operator.wait_if_paused().await;
            // Time spent paused is not simulated.
            last_step = Instant::now();
            info!("Simulation resumed");
        }

        // --- Stop request ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            simulation.shutdown();
            let result =
                finish(operator, SimulationEndReason::OperatorStop, last_report, total_pulses);
            return Ok(result.await);
        }

        // --- Time limit ---
        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            let reason = SimulationEndReason::MaxRealTimeReached;
            let result = finish(operator, reason, last_report, total_pulses);
            return Ok(result.await);
        }

        for (settlement, command) in operator.drain_commands().await {
            simulation.submit_command(settlement, command);
        }

        // --- Step ---
        let now = Instant::now();
        let elapsed = now.duration_since(last_step);
        last_step = now;
        let report = match simulation.step(elapsed) {
            Ok(Some(report)) => report,
            Ok(None) => {
                tokio::task::yield_now().await;
                continue;
            }
            Err(SimulationError::Dispatch {
                source: DispatchError::ShutDown,
            }) => {
                warn!("Dispatcher shut down underneath the run loop");
                let reason = SimulationEndReason::DispatcherShutDown;
                let result = finish(operator, reason, last_report, total_pulses);
                return Ok(result.await);
            }
            Err(error) => return Err(error.into()),
        };

        total_pulses = total_pulses.saturating_add(1);
        debug!(
            pulse = report.pulse.id(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            "pulse complete"
        );

        callback.on_pulse(&report, simulation);

        if report.interrupted {
            // Only a raised shutdown signal interrupts a pulse.
            let reason = if operator.is_stop_requested() {
                SimulationEndReason::OperatorStop
            } else {
                SimulationEndReason::DispatcherShutDown
            };
            simulation.shutdown();
            return Ok(finish(operator, reason, Some(report), total_pulses).await);
        }

        if operator.pulse_limit_reached(report.pulse.id()) {
            info!(
                pulse = report.pulse.id(),
                max_pulses = operator.max_pulses(),
                "Pulse limit reached"
            );
            let reason = SimulationEndReason::MaxPulsesReached;
            let result = finish(operator, reason, Some(report), total_pulses);
            return Ok(result.await);
        }

        last_report = Some(report);

        // --- Pacing ---
        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

async fn finish(
    operator: &OperatorState,
    end_reason: SimulationEndReason,
    final_report: Option<PulseReport>,
    total_pulses: u64,
) -> SimulationResult {
    operator.set_end_reason(end_reason).await;
    SimulationResult {
        end_reason,
        final_report,
        total_pulses,
    }
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_pulses = result.total_pulses,
        final_pulse = result.final_report.as_ref().map(|report| report.pulse.id()),
        "Simulation ended"
    );

    if let Some(ref report) = result.final_report {
        info!(
            pulse = report.pulse.id(),
            sol = report.pulse.sol(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            "Final pulse summary"
        );
    } else {
        warn!("Simulation ended with no pulses dispatched");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_agents::AgentError;
    use habitat_types::Coordinates;
    use habitat_world::{PulseScope, Settlement};

    use super::*;
    use crate::config::{DispatcherConfig, SimulationBoundsConfig, SimulationConfig};
    use crate::dispatch::SettlementUpdater;

    struct Idle;

    impl SettlementUpdater for Idle {
        fn time_passing(&self, _scope: &mut PulseScope<'_>) -> Result<bool, AgentError> {
            Ok(true)
        }
    }

    fn simulation() -> Simulation {
        let config = SimulationConfig {
            dispatcher: DispatcherConfig {
                reserved_cores: 0,
                worker_threads: Some(1),
            },
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::with_updater(config, Box::new(Idle)).unwrap();
        simulation.add_settlement(Settlement::new("Base", Coordinates::new(0.0, 0.0), 1));
        simulation
    }

    fn bounds(max_pulses: u64) -> SimulationBoundsConfig {
        SimulationBoundsConfig {
            max_pulses,
            max_real_time_seconds: 0,
        }
    }

    #[tokio::test]
    async fn bounded_by_max_pulses() {
        let mut simulation = simulation();
        let operator = Arc::new(OperatorState::new(0, &bounds(5)));
        let mut cb = NoOpCallback;

        let result = run_simulation(&mut simulation, &operator, &mut cb)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxPulsesReached);
        assert_eq!(result.total_pulses, 5);
        assert_eq!(result.final_report.unwrap().pulse.id(), 5);
        assert_eq!(
            operator.end_reason().await,
            Some(SimulationEndReason::MaxPulsesReached)
        );
    }

    #[tokio::test]
    async fn operator_stop() {
        let mut simulation = simulation();
        let operator = Arc::new(OperatorState::new(0, &bounds(0)));
        operator.request_stop();
        let mut cb = NoOpCallback;

        let result = run_simulation(&mut simulation, &operator, &mut cb)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_pulses, 0);
        assert!(simulation.shutdown_signal().is_raised());
    }

    #[tokio::test]
    async fn shut_down_dispatcher_ends_the_run() {
        let mut simulation = simulation();
        simulation.shutdown();
        let operator = Arc::new(OperatorState::new(0, &bounds(0)));
        let mut cb = NoOpCallback;

        let result = run_simulation(&mut simulation, &operator, &mut cb)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::DispatcherShutDown);
        assert!(result.final_report.is_none());
    }

    #[tokio::test]
    async fn pulse_callback_is_called() {
        struct CountCallback {
            count: u64,
        }
        impl PulseCallback for CountCallback {
            fn on_pulse(&mut self, _report: &PulseReport, _simulation: &Simulation) {
                self.count = self.count.saturating_add(1);
            }
        }

        let mut simulation = simulation();
        let operator = Arc::new(OperatorState::new(0, &bounds(3)));
        let mut cb = CountCallback { count: 0 };

        let _ = run_simulation(&mut simulation, &operator, &mut cb)
            .await
            .unwrap();

        assert_eq!(cb.count, 3);
    }

    #[tokio::test]
    async fn queued_commands_reach_the_settlement() {
        use habitat_types::UnitId;
        use habitat_world::Command;

        let mut simulation = simulation();
        let settlement = simulation.settlements().next().unwrap().id;
        let operator = Arc::new(OperatorState::new(0, &bounds(1)));
        operator
            .submit_command(settlement, Command::ClearTask { worker: UnitId(3) })
            .await;
        let mut cb = NoOpCallback;

        run_simulation(&mut simulation, &operator, &mut cb)
            .await
            .unwrap();

        // The idle updater never drains the queue, so the command is still there.
        let queued = &simulation.settlement(settlement).unwrap().commands;
        assert_eq!(queued.len(), 1);
        assert!(operator.drain_commands().await.is_empty());
    }

    #[tokio::test]
    async fn variable_speed_changes_interval() {
        let operator = Arc::new(OperatorState::new(1000, &bounds(0)));

        assert_eq!(operator.tick_interval_ms(), 1000);
        let _ = operator.set_tick_interval_ms(500);
        assert_eq!(operator.tick_interval_ms(), 500);
    }
}
