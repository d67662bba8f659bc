//! Master clock, settlement dispatcher and run loop for the Habitat colony
//! scheduler.
//!
//! The [`MasterClock`] turns real time into simulated millisols and emits
//! one [`ClockPulse`](habitat_types::ClockPulse) per step. The
//! [`SettlementDispatcher`] fans each pulse out to every settlement on a
//! rayon pool and joins before the next pulse may begin. [`Simulation`]
//! ties both to an explicit [`SimulationContext`], and [`run_simulation`]
//! drives it under operator control.
//!
//! # Modules
//!
//! - [`clock`] -- Master clock, Mars time and pulse emission.
//! - [`config`] -- Configuration loading from `habitat-config.yaml` into
//!   strongly-typed structs.
//! - [`context`] -- Unit id registry, snapshot and command queue.
//! - [`dispatch`] -- The parallel settlement dispatcher and its join barrier.
//! - [`operator`] -- Pause, resume, pacing and stop controls.
//! - [`runner`] -- The async pulse loop.
//! - [`simulation`] -- The facade used by the run loop and presentation code.

pub mod clock;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod operator;
pub mod runner;
pub mod simulation;

pub use clock::{ClockError, MarsTime, MasterClock};
pub use config::{ConfigError, SimulationConfig};
pub use context::{ContextError, SimulationContext, UnitRegistry};
pub use dispatch::{
    AgentUpdater, DispatchError, PulseReport, SettlementDispatcher, SettlementUpdater,
    SkippedSettlement,
};
pub use operator::{OperatorState, SimulationEndReason, SimulationStatus};
pub use runner::{
    NoOpCallback, PulseCallback, RunnerError, SimulationResult, log_simulation_end, run_simulation,
};
pub use simulation::{SavedState, Simulation, SimulationError};
