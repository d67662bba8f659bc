//! Worker behavior and mission logic for the Habitat colony scheduler.
//!
//! This crate holds everything that runs inside one settlement's work unit:
//! physiology, task execution, the weighted decision layer and the mission
//! phase machine. It only ever touches the settlement in its
//! [`PulseScope`](habitat_world::PulseScope); other settlements are read
//! through the prior-tick snapshot and changed through deferred effects.
//!
//! # Modules
//!
//! - [`config`] -- Agent tunables ([`AgentConfig`]).
//! - [`decision`] -- Weighted-random choice of the next activity.
//! - [`error`] -- Error types for settlement updates ([`AgentError`]).
//! - [`meta`] -- Meta-task evaluators and the [`MetaRegistry`].
//! - [`mission`] -- Mission planning, phase handlers and travel steps.
//! - [`physiology`] -- Needs and life support draw.
//! - [`task`] -- Task execution and preference learning.
//! - [`tick`] -- The per-pulse update entry point ([`time_passing`]).
//! - [`trade`] -- Trade goods and profit estimates.

pub mod config;
pub mod decision;
pub mod error;
pub mod meta;
pub mod mission;
pub mod physiology;
pub mod task;
pub mod tick;
pub mod trade;

// Re-export primary types at crate root.
pub use config::{AgentConfig, DecisionConfig, LifeSupportConfig, MissionConfig, PhysiologyConfig};
pub use decision::pick_weighted;
pub use error::AgentError;
pub use meta::{Candidate, DecisionContext, MetaRegistry, MetaTask};
pub use mission::{abort_mission, plan_mission};
pub use tick::time_passing;
