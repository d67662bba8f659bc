//! Mission steps: the queued navigation plan of a vehicle mission.
//!
//! Steps form a FIFO queue on the mission. Only the head step executes; it
//! becomes [`StepStage::Active`] when it reaches the head and is discarded
//! once [`StepStage::Done`].

use habitat_types::StepStage;
use serde::{Deserialize, Serialize};

use crate::navigation::NavPoint;

/// What a step does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepKind {
    /// Drive to `destination`.
    Travel {
        /// Where the leg ends.
        destination: NavPoint,
    },
    /// Work at `site` for up to `budget` millisols.
    SiteWork {
        /// The site being worked.
        site: NavPoint,
        /// Site time budget in millisols.
        budget: f64,
        /// Site time accumulated so far.
        elapsed: f64,
        /// Kilograms of samples or goods handled so far.
        samples: f64,
    },
}

/// One entry of a mission's step queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionStep {
    /// Lifecycle stage.
    pub stage: StepStage,
    /// Payload.
    pub kind: StepKind,
}

impl MissionStep {
    /// A pending travel leg.
    pub const fn travel(destination: NavPoint) -> Self {
        Self {
            stage: StepStage::Pending,
            kind: StepKind::Travel { destination },
        }
    }

    /// A pending site-work step with the given time budget.
    pub const fn site_work(site: NavPoint, budget: f64) -> Self {
        Self {
            stage: StepStage::Pending,
            kind: StepKind::SiteWork {
                site,
                budget,
                elapsed: 0.0,
                samples: 0.0,
            },
        }
    }

    /// Where this step takes place.
    pub const fn navpoint(&self) -> &NavPoint {
        match &self.kind {
            StepKind::Travel { destination } => destination,
            StepKind::SiteWork { site, .. } => site,
        }
    }

    /// Whether this is a travel leg.
    pub const fn is_travel(&self) -> bool {
        matches!(self.kind, StepKind::Travel { .. })
    }

    /// Move from pending to active. Returns true on the first call only.
    pub fn start(&mut self) -> bool {
        if self.stage == StepStage::Pending {
            self.stage = StepStage::Active;
            true
        } else {
            false
        }
    }

    /// Mark the exit condition met.
    pub fn complete(&mut self) {
        self.stage = StepStage::Done;
    }

    /// Whether the step is done.
    pub fn is_done(&self) -> bool {
        self.stage == StepStage::Done
    }
}
