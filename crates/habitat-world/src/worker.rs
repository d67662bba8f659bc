//! Workers: people and robots owned by a settlement.
//!
//! People and robots share one [`Worker`] type tagged with a
//! [`WorkerKind`]. Robots ignore the physiological fields; they never tire,
//! hunger or stress.

use std::collections::BTreeMap;

use habitat_types::{
    Coordinates, JobKind, MissionId, MissionPhase, SettlementId, UnitId, WorkerKind, WorkerView,
};
use serde::{Deserialize, Serialize};

/// Upper bound of the fatigue and hunger scales.
pub const NEED_MAX: f64 = 1_000.0;
/// Upper bound of the stress and health scales.
pub const CONDITION_MAX: f64 = 100.0;

/// Where a worker physically is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WorkerLocation {
    /// Inside the owning settlement (or a visited one, for a parked crew).
    InSettlement,
    /// Aboard the vehicle with the given id.
    InVehicle(UnitId),
    /// On foot on the surface.
    Outside(Coordinates),
}

/// The activity a [`Task`] performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Sleep off fatigue.
    Sleep,
    /// Eat a meal from settlement stock.
    Eat,
    /// Unstructured leisure.
    Relax,
    /// Chat with other workers.
    Socialize,
    /// Repair infrastructure wear.
    Maintenance,
    /// Tend greenhouse crops.
    TendGreenhouse,
    /// Generate research points.
    Research,
    /// Drive a mission vehicle toward a destination.
    OperateVehicle {
        /// The vehicle being driven.
        vehicle: UnitId,
        /// Where the vehicle is headed.
        destination: Coordinates,
    },
    /// Work at the current site during a site-work phase.
    SiteWork {
        /// The site phase being worked.
        phase: MissionPhase,
    },
}

impl TaskKind {
    /// Short name, also the key for learned preferences.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Eat => "eat",
            Self::Relax => "relax",
            Self::Socialize => "socialize",
            Self::Maintenance => "maintenance",
            Self::TendGreenhouse => "greenhouse",
            Self::Research => "research",
            Self::OperateVehicle { .. } => "operate-vehicle",
            Self::SiteWork { .. } => "site-work",
        }
    }

    /// Whether this is leisure that a mission duty may interrupt.
    pub const fn is_leisure(&self) -> bool {
        matches!(self, Self::Relax | Self::Socialize)
    }
}

/// An in-progress activity owned by exactly one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// What the task does.
    pub kind: TaskKind,
    /// Millisols left before the task completes on its own.
    pub remaining_millisols: f64,
    /// Mission the task serves, if any. Cleared together with the mission.
    pub mission: Option<MissionId>,
}

impl Task {
    /// A task not tied to a mission.
    pub const fn new(kind: TaskKind, duration: f64) -> Self {
        Self {
            kind,
            remaining_millisols: duration,
            mission: None,
        }
    }

    /// A task performed on behalf of `mission`.
    pub const fn for_mission(kind: TaskKind, duration: f64, mission: MissionId) -> Self {
        Self {
            kind,
            remaining_millisols: duration,
            mission: Some(mission),
        }
    }
}

/// A person or robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// Unit id.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Person or robot.
    pub kind: WorkerKind,
    /// Job assignment.
    pub job: JobKind,
    /// Home settlement.
    pub home: SettlementId,
    /// Physical location.
    pub location: WorkerLocation,
    /// Fatigue, `0..=1000`.
    pub fatigue: f64,
    /// Hunger, `0..=1000`.
    pub hunger: f64,
    /// Stress, `0..=100`.
    pub stress: f64,
    /// Health, `0..=100`. Below the medical threshold the worker needs help.
    pub health: f64,
    /// Work performance multiplier, `0..=1`.
    pub performance: f64,
    /// Extraversion, `0..=100`. Skews social versus solitary choices.
    pub extraversion: f64,
    /// Learned preference per task name, bounded by configuration.
    pub preferences: BTreeMap<String, f64>,
    /// Current activity.
    pub task: Option<Task>,
    /// Mission this worker is a member of (lookup only; the mission owns membership).
    pub mission: Option<MissionId>,
}

impl Worker {
    /// A rested, healthy person.
    pub fn person(id: UnitId, name: impl Into<String>, job: JobKind, home: SettlementId) -> Self {
        Self {
            id,
            name: name.into(),
            kind: WorkerKind::Person,
            job,
            home,
            location: WorkerLocation::InSettlement,
            fatigue: 0.0,
            hunger: 0.0,
            stress: 0.0,
            health: CONDITION_MAX,
            performance: 1.0,
            extraversion: 50.0,
            preferences: BTreeMap::new(),
            task: None,
            mission: None,
        }
    }

    /// A robot with the given job.
    pub fn robot(id: UnitId, name: impl Into<String>, job: JobKind, home: SettlementId) -> Self {
        Self {
            kind: WorkerKind::Robot,
            extraversion: 0.0,
            ..Self::person(id, name, job, home)
        }
    }

    /// Whether this worker has physiological needs.
    pub fn is_person(&self) -> bool {
        self.kind == WorkerKind::Person
    }

    /// Whether the worker has no current task.
    pub const fn is_idle(&self) -> bool {
        self.task.is_none()
    }

    /// Whether the worker is aboard `vehicle`.
    pub fn is_aboard(&self, vehicle: UnitId) -> bool {
        self.location == WorkerLocation::InVehicle(vehicle)
    }

    /// Whether health has dropped below `threshold`.
    pub fn needs_medical_help(&self, threshold: f64) -> bool {
        self.is_person() && self.health < threshold
    }

    /// Whether the worker is too tired to take on a driving shift.
    pub fn is_exhausted(&self, limit: f64) -> bool {
        self.is_person() && self.fatigue >= limit
    }

    /// Whether the worker is fit for surface work at a site.
    pub fn can_do_site_work(&self, fatigue_limit: f64, medical_threshold: f64) -> bool {
        !self.is_exhausted(fatigue_limit) && !self.needs_medical_help(medical_threshold)
    }

    /// Learned preference for a task name (0 when never learned).
    pub fn preference(&self, task: &str) -> f64 {
        self.preferences.get(task).copied().unwrap_or(0.0)
    }

    /// Read-only view for the presentation layer.
    pub fn view(&self) -> WorkerView {
        WorkerView {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            job: self.job,
            task: self.task.as_ref().map(|task| task.kind.name().to_owned()),
            mission: self.mission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_has_no_needs() {
        let mut robot = Worker::robot(UnitId(2), "R2", JobKind::Engineer, SettlementId::new());
        robot.fatigue = NEED_MAX;
        robot.health = 0.0;
        assert!(!robot.is_exhausted(800.0));
        assert!(!robot.needs_medical_help(30.0));
        assert!(robot.can_do_site_work(800.0, 30.0));
    }

    #[test]
    fn view_names_task() {
        let mut person = Worker::person(UnitId(1), "Ada", JobKind::Pilot, SettlementId::new());
        person.task = Some(Task::new(TaskKind::Research, 20.0));
        let view = person.view();
        assert_eq!(view.task.as_deref(), Some("research"));
        assert_eq!(view.kind, WorkerKind::Person);
    }
}
