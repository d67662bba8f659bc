//! Engine binary for the Habitat colony scheduler.
//!
//! Wires configuration, logging, the starting colonies and operator
//! controls together, then runs the pulse loop until a bound is reached
//! or the operator stops it.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `habitat-config.yaml` (or `$HABITAT_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the simulation and spawn the configured colonies
//! 4. Create operator state from simulation bounds
//! 5. Install the Ctrl-C handler
//! 6. Run the simulation loop
//! 7. Log the result

mod callback;
mod error;
mod spawner;

use std::sync::Arc;

use habitat_core::config::{self, CONFIG_ENV, LoggingConfig};
use habitat_core::{OperatorState, Simulation, SimulationConfig, log_simulation_end, run_simulation};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::callback::SolSummaryCallback;
use crate::error::EngineError;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself
/// fails; the process then exits with a non-zero status.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let path = config::config_path(std::env::var(CONFIG_ENV).ok());
    let config = SimulationConfig::load_or_default(&path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        path = %path.display(),
        world_name = config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        time_ratio = config.clock.time_ratio,
        colonies = config.colonies.len(),
        "Configuration loaded"
    );

    // 3. Build the simulation and spawn colonies.
    let tick_interval_ms = config.world.tick_interval_ms;
    let bounds = config.simulation.clone();
    let mut simulation = Simulation::new(config)?;
    let settlements = spawner::spawn_colonies(&mut simulation)?;
    info!(
        settlements = settlements.len(),
        units = simulation.context().units().allocated(),
        time = %simulation.current_time(),
        "Colonies spawned"
    );

    // 4. Create operator state.
    let operator = Arc::new(OperatorState::new(tick_interval_ms, &bounds));

    // 5. Ctrl-C requests a clean stop and cancels any in-flight pulse.
    {
        let operator = Arc::clone(&operator);
        let signal = simulation.shutdown_signal();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping");
                    operator.request_stop();
                    signal.raise();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }

    // 6. Run the simulation.
    let mut callback = SolSummaryCallback::new();
    let result = run_simulation(&mut simulation, &operator, &mut callback).await?;

    // 7. Log results.
    log_simulation_end(&result);
    info!(
        end_reason = ?result.end_reason,
        total_pulses = result.total_pulses,
        skipped_updates = callback.failures(),
        "habitat-engine shutdown complete"
    );
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
