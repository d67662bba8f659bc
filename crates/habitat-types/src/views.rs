//! Read-only views for the presentation boundary.
//!
//! UI and console layers only ever read these snapshots; they never hold
//! references into live settlement state.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{JobKind, MissionKind, MissionPhase, MissionStatus, StatusReason, WorkerKind};
use crate::ids::{MissionId, SettlementId, UnitId};

/// What the presentation layer may know about a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MissionView {
    /// Mission id.
    pub id: MissionId,
    /// Settlement the mission belongs to.
    pub settlement: SettlementId,
    /// Display name.
    pub name: String,
    /// Mission flavor.
    pub kind: MissionKind,
    /// Current phase.
    pub phase: MissionPhase,
    /// Overall status.
    pub status: MissionStatus,
    /// Accumulated status reasons, oldest first.
    pub reasons: Vec<StatusReason>,
    /// Number of members.
    pub member_count: u32,
    /// Distance driven so far.
    pub distance_travelled: f64,
    /// Steps still queued.
    pub steps_remaining: u32,
}

/// What the presentation layer may know about a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorkerView {
    /// Worker id.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Person or robot.
    pub kind: WorkerKind,
    /// Job assignment.
    pub job: JobKind,
    /// Human-readable description of the current task, if any.
    pub task: Option<String>,
    /// Mission the worker is committed to, if any.
    pub mission: Option<MissionId>,
}

/// What the presentation layer may know about one dispatched pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PulseView {
    /// Pulse id.
    pub id: u64,
    /// Simulated millisols covered by the pulse.
    pub elapsed_millisols: f64,
    /// Sol number at the end of the pulse.
    pub sol: u64,
    /// Settlements whose update ran to completion.
    pub settlements_updated: u32,
    /// Settlements whose update failed and was skipped.
    pub settlements_failed: u32,
    /// Whether shutdown interrupted the pulse.
    pub interrupted: bool,
}
