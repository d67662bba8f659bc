//! The simulation facade: clock, context and dispatcher in one place.
//!
//! A [`Simulation`] is what the run loop and the presentation layer hold.
//! Each [`step`](Simulation::step) advances the master clock and, when a
//! pulse results, dispatches it to every settlement. Presentation code only
//! reads views and mutates through [`submit_command`](Simulation::submit_command),
//! which the next pulse observes.

use std::sync::Arc;
use std::time::Duration;

use habitat_types::{ClockPulse, MissionView, SettlementId, UnitId, WorkerView};
use habitat_world::{ColonySnapshot, Command, Settlement, ShutdownSignal};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::{ClockError, MarsTime, MasterClock};
use crate::config::SimulationConfig;
use crate::context::{ContextError, SimulationContext};
use crate::dispatch::{
    AgentUpdater, DispatchError, PulseReport, SettlementDispatcher, SettlementUpdater,
};

/// Errors surfaced by the simulation facade.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The master clock rejected a step.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The dispatcher could not run the pulse.
    #[error("dispatch error: {source}")]
    Dispatch {
        /// The underlying dispatch error.
        #[from]
        source: DispatchError,
    },

    /// The simulation context refused a request.
    #[error("context error: {source}")]
    Context {
        /// The underlying context error.
        #[from]
        source: ContextError,
    },

    /// Saved state could not be written or read.
    #[error("saved state error: {source}")]
    SavedState {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// Everything needed to resume a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedState {
    /// Id of the last dispatched pulse.
    pub pulse_id: u64,
    /// Absolute simulated time in millisols.
    pub total_millisols: f64,
    /// Every settlement.
    pub settlements: Vec<Settlement>,
}

/// Master clock, context and dispatcher driven together.
pub struct Simulation {
    clock: MasterClock,
    context: SimulationContext,
    dispatcher: SettlementDispatcher,
    updater: Box<dyn SettlementUpdater>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("clock", &self.clock)
            .field("settlements", &self.dispatcher.len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// A simulation using the production [`AgentUpdater`].
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Clock`] if the clock configuration is invalid.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let updater = AgentUpdater::new(config.agents.clone());
        Self::with_updater(config, Box::new(updater))
    }

    /// A simulation driving settlements through a custom updater.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Clock`] if the clock configuration is invalid.
    pub fn with_updater(
        config: SimulationConfig,
        updater: Box<dyn SettlementUpdater>,
    ) -> Result<Self, SimulationError> {
        let clock = MasterClock::new(&config.clock)?;
        let dispatcher = SettlementDispatcher::new(config.dispatcher.clone());
        Ok(Self {
            clock,
            context: SimulationContext::new(Arc::new(config)),
            dispatcher,
            updater,
        })
    }

    /// Resume from saved state.
    ///
    /// Settlements are reinitialized (fresh random streams, stale mission
    /// references pruned) and their unit ids reserved in the registry. The
    /// colony snapshot is rebuilt so the first resumed pulse sees every
    /// settlement.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Clock`] for an invalid saved time and
    /// [`SimulationError::Context`] if a saved unit id exceeds capacity.
    pub fn restore(
        config: SimulationConfig,
        updater: Box<dyn SettlementUpdater>,
        saved: SavedState,
    ) -> Result<Self, SimulationError> {
        let mut simulation = Self::with_updater(config, updater)?;
        simulation.clock = MasterClock::from_parts(
            saved.pulse_id,
            saved.total_millisols,
            &simulation.context.config().clock,
        )?;
        simulation.context.observe_units(&saved.settlements)?;
        simulation
            .dispatcher
            .reinit(saved.settlements, saved.pulse_id, saved.total_millisols);
        let snapshot = ColonySnapshot::capture(saved.pulse_id, simulation.dispatcher.settlements());
        simulation.context.set_snapshot(snapshot);
        info!(
            pulse = saved.pulse_id,
            settlements = simulation.dispatcher.len(),
            "simulation restored"
        );
        Ok(simulation)
    }

    /// The colony as of the last barrier.
    pub const fn snapshot(&self) -> &ColonySnapshot {
        self.context.snapshot()
    }

    /// Capture the state needed by [`restore`](Self::restore).
    pub fn save(&self) -> SavedState {
        SavedState {
            pulse_id: self.clock.pulse_id(),
            total_millisols: self.clock.total_millisols(),
            settlements: self.dispatcher.settlements().cloned().collect(),
        }
    }

    /// Serialize [`save`](Self::save) as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SavedState`] if serialization fails.
    pub fn save_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string(&self.save())?)
    }

    /// Parse saved state written by [`save_json`](Self::save_json).
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SavedState`] for malformed input.
    pub fn parse_saved(json: &str) -> Result<SavedState, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add a settlement; it joins the next pulse.
    pub fn add_settlement(&mut self, settlement: Settlement) -> SettlementId {
        self.dispatcher.add_settlement(settlement)
    }

    /// Allocate a dense unit id for a new worker or vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Context`] when unit capacity is exhausted.
    pub fn allocate_unit(&mut self) -> Result<UnitId, SimulationError> {
        Ok(self.context.allocate_unit()?)
    }

    /// Queue a command for `settlement`; the next pulse applies it.
    pub fn submit_command(&mut self, settlement: SettlementId, command: Command) {
        self.context.queue_command(settlement, command);
    }

    /// Advance by a real-time step and dispatch the resulting pulse.
    ///
    /// Returns `Ok(None)` when the step was empty and no pulse was emitted.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Clock`] for an invalid step and
    /// [`SimulationError::Dispatch`] when the dispatcher cannot run.
    pub fn step(&mut self, real_elapsed: Duration) -> Result<Option<PulseReport>, SimulationError> {
        let pulse = self.clock.advance(real_elapsed)?;
        self.dispatch(pulse)
    }

    /// Advance by `millisols` of simulated time and dispatch the pulse.
    ///
    /// # Errors
    ///
    /// Same as [`step`](Self::step).
    pub fn step_millisols(
        &mut self,
        millisols: f64,
    ) -> Result<Option<PulseReport>, SimulationError> {
        let pulse = self.clock.advance_millisols(millisols)?;
        self.dispatch(pulse)
    }

    fn dispatch(
        &mut self,
        pulse: Option<ClockPulse>,
    ) -> Result<Option<PulseReport>, SimulationError> {
        let Some(pulse) = pulse else {
            return Ok(None);
        };
        let report = self
            .dispatcher
            .on_pulse(pulse, &mut self.context, self.updater.as_ref())?;
        Ok(Some(report))
    }

    /// Cancel in-flight work and refuse further pulses.
    pub fn shutdown(&mut self) {
        self.dispatcher.shutdown();
    }

    /// A handle that cancels the simulation from another thread.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.dispatcher.shutdown_signal()
    }

    /// The master clock.
    pub const fn clock(&self) -> &MasterClock {
        &self.clock
    }

    /// Current simulated time.
    pub fn current_time(&self) -> MarsTime {
        self.clock.current_time()
    }

    /// The simulation context.
    pub const fn context(&self) -> &SimulationContext {
        &self.context
    }

    /// The configuration in use.
    pub fn config(&self) -> &SimulationConfig {
        self.context.config()
    }

    /// Every settlement.
    pub fn settlements(&self) -> impl Iterator<Item = &Settlement> {
        self.dispatcher.settlements()
    }

    /// Look up a settlement.
    pub fn settlement(&self, id: SettlementId) -> Option<&Settlement> {
        self.dispatcher.settlement(id)
    }

    /// Look up a settlement for setup between pulses.
    pub fn settlement_mut(&mut self, id: SettlementId) -> Option<&mut Settlement> {
        self.dispatcher.settlement_mut(id)
    }

    /// Number of settlements.
    pub fn settlement_count(&self) -> usize {
        self.dispatcher.len()
    }

    /// Views of every active mission, in settlement order.
    pub fn mission_views(&self) -> Vec<MissionView> {
        self.settlements()
            .flat_map(|settlement| settlement.missions.values().map(habitat_world::Mission::view))
            .collect()
    }

    /// Views of one settlement's workers.
    pub fn worker_views(&self, settlement: SettlementId) -> Vec<WorkerView> {
        self.settlement(settlement)
            .map(|settlement| {
                settlement
                    .workers
                    .values()
                    .map(habitat_world::Worker::view)
                    .collect()
            })
            .unwrap_or_default()
    }
}
