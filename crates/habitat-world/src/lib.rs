//! Settlement-owned state for the Habitat colony scheduler.
//!
//! This crate models everything a single dispatcher work unit owns and
//! mutates during a pulse, plus the two channels through which settlements
//! see each other: the read-only [`ColonySnapshot`] and deferred
//! [`CrossSettlementEffect`]s applied after the join barrier.
//!
//! # Modules
//!
//! - [`cache`] -- [`Cached`] values with an explicit validity horizon.
//! - [`command`] -- Presentation-layer commands queued for the next pulse.
//! - [`effect`] -- Deferred cross-settlement effects.
//! - [`environment`] -- Surface illumination by local time of sol.
//! - [`error`] -- Error types for settlement-state operations.
//! - [`manifest`] -- Required/optional resource manifests.
//! - [`mission`] -- Mission data and phase transition guards.
//! - [`navigation`] -- Navigation points.
//! - [`process`] -- Resource conversion processes.
//! - [`resource`] -- The clamped [`ResourceStore`].
//! - [`scope`] -- The per-pulse [`PulseScope`] capability and [`ShutdownSignal`].
//! - [`settlement`] -- The [`Settlement`] aggregate.
//! - [`snapshot`] -- The prior-tick [`ColonySnapshot`].
//! - [`step`] -- Mission step queue entries.
//! - [`throttle`] -- Rate limiting for repeated warnings.
//! - [`vehicle`] -- Ground vehicles and fuel burn.
//! - [`worker`] -- People, robots and their tasks.

pub mod cache;
pub mod command;
pub mod effect;
pub mod environment;
pub mod error;
pub mod manifest;
pub mod mission;
pub mod navigation;
pub mod process;
pub mod resource;
pub mod scope;
pub mod settlement;
pub mod snapshot;
pub mod step;
pub mod throttle;
pub mod vehicle;
pub mod worker;

// Re-export primary types at crate root.
pub use cache::Cached;
pub use command::Command;
pub use effect::CrossSettlementEffect;
pub use error::WorldError;
pub use manifest::Manifest;
pub use mission::Mission;
pub use navigation::NavPoint;
pub use process::ResourceProcess;
pub use resource::ResourceStore;
pub use scope::{PulseScope, ShutdownSignal};
pub use settlement::Settlement;
pub use snapshot::{ColonySnapshot, SettlementSummary};
pub use step::{MissionStep, StepKind};
pub use vehicle::Vehicle;
pub use worker::{Task, TaskKind, Worker, WorkerLocation};
