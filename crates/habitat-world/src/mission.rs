//! Mission data: phases, status, members, vehicle and the step queue.
//!
//! A mission always has exactly one current phase drawn from its declared
//! phase list. Transitions are monotonic along that list, with two
//! exceptions: a site-work phase may fall back to
//! [`MissionPhase::Travelling`] for the next leg, and
//! [`MissionPhase::Aborted`] is reachable from every non-terminal phase.
//! Terminal phases are absorbing. Phase behavior lives in the agents crate;
//! this module only guards the state.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use habitat_types::{
    MissionId, MissionKind, MissionPhase, MissionStatus, MissionView, Resource, SettlementId,
    StatusReason, UnitId,
};
use serde::{Deserialize, Serialize};

use crate::cache::Cached;
use crate::error::WorldError;
use crate::manifest::Manifest;
use crate::step::MissionStep;

/// A multi-member, multi-phase vehicle undertaking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    /// Mission id.
    pub id: MissionId,
    /// Display name.
    pub name: String,
    /// Exploration or trade.
    pub kind: MissionKind,
    /// Owning settlement.
    pub settlement: SettlementId,
    phases: Vec<MissionPhase>,
    phase: MissionPhase,
    phase_ended: bool,
    phase_started: f64,
    status: MissionStatus,
    /// Status reasons, oldest first.
    pub reasons: Vec<StatusReason>,
    /// Member who started the mission.
    pub lead: Option<UnitId>,
    /// Member worker ids.
    pub members: BTreeSet<UnitId>,
    /// Reserved vehicle.
    pub vehicle: Option<UnitId>,
    /// Navigation plan.
    pub steps: VecDeque<MissionStep>,
    /// Navpoints reached so far.
    pub navpoints_reached: u32,
    /// Distance driven since departure.
    pub distance_travelled: f64,
    /// Whether the mission diverted through the emergency path.
    pub emergency: bool,
    /// Whether the vehicle has been loaded during embarking.
    pub cargo_loaded: bool,
    /// Goods loaded for sale (trade missions).
    pub trade_goods: BTreeMap<Resource, f64>,
    /// Pulse on which site time was last accumulated.
    pub last_site_pulse: Option<u64>,
    #[serde(skip)]
    needs_cache: Option<Cached<Manifest>>,
}

impl Mission {
    /// A new mission in [`MissionPhase::Reviewing`].
    pub fn new(
        kind: MissionKind,
        name: impl Into<String>,
        settlement: SettlementId,
        now: f64,
    ) -> Self {
        Self {
            id: MissionId::new(),
            name: name.into(),
            kind,
            settlement,
            phases: kind.declared_phases(),
            phase: MissionPhase::Reviewing,
            phase_ended: false,
            phase_started: now,
            status: MissionStatus::Active,
            reasons: Vec::new(),
            lead: None,
            members: BTreeSet::new(),
            vehicle: None,
            steps: VecDeque::new(),
            navpoints_reached: 0,
            distance_travelled: 0.0,
            emergency: false,
            cargo_loaded: false,
            trade_goods: BTreeMap::new(),
            last_site_pulse: None,
            needs_cache: None,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> MissionPhase {
        self.phase
    }

    /// Declared phases in order.
    pub fn phases(&self) -> &[MissionPhase] {
        &self.phases
    }

    /// Whether the current phase has reported its exit condition.
    pub const fn phase_ended(&self) -> bool {
        self.phase_ended
    }

    /// Absolute millisol at which the current phase started.
    pub const fn phase_started(&self) -> f64 {
        self.phase_started
    }

    /// Overall status.
    pub const fn status(&self) -> MissionStatus {
        self.status
    }

    /// Whether the mission has reached a terminal phase.
    pub const fn is_done(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Move to `next`, enforcing the transition rules.
    ///
    /// Resets the phase-ended flag and invalidates the resource-need cache.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::IllegalTransition`] when leaving a terminal
    /// phase or moving backwards, and [`WorldError::UndeclaredPhase`] when
    /// `next` is not in the declared list.
    pub fn set_phase(&mut self, next: MissionPhase, now: f64) -> Result<(), WorldError> {
        let illegal = WorldError::IllegalTransition {
            mission: self.id,
            from: self.phase,
            to: next,
        };
        if self.phase.is_terminal() {
            return Err(illegal);
        }
        if next != MissionPhase::Aborted {
            let to = self
                .phase_index(next)
                .ok_or(WorldError::UndeclaredPhase {
                    mission: self.id,
                    phase: next,
                })?;
            let from = self.phase_index(self.phase).unwrap_or(0);
            let back_to_travel = self.phase.is_site_work() && next == MissionPhase::Travelling;
            if to < from && !back_to_travel {
                return Err(illegal);
            }
        }
        self.phase = next;
        self.phase_ended = false;
        self.phase_started = now;
        self.needs_cache = None;
        Ok(())
    }

    fn phase_index(&self, phase: MissionPhase) -> Option<usize> {
        self.phases.iter().position(|declared| *declared == phase)
    }

    /// Record that the current phase's exit condition is met.
    pub const fn end_phase(&mut self) {
        self.phase_ended = true;
    }

    /// Append a status reason unless it is already the latest one.
    pub fn add_reason(&mut self, reason: StatusReason) {
        if self.reasons.last() != Some(&reason) {
            self.reasons.push(reason);
        }
    }

    /// Abort from any non-terminal phase. A no-op on finished missions.
    pub fn abort(&mut self, reason: StatusReason, now: f64) {
        if self.is_done() {
            return;
        }
        self.add_reason(reason);
        self.phase = MissionPhase::Aborted;
        self.phase_ended = false;
        self.phase_started = now;
        self.status = MissionStatus::Failed;
        self.needs_cache = None;
    }

    /// Enter [`MissionPhase::Completed`]; the status reflects whether an emergency occurred.
    ///
    /// # Errors
    ///
    /// Propagates transition errors from [`Mission::set_phase`].
    pub fn complete(&mut self, now: f64) -> Result<(), WorldError> {
        self.set_phase(MissionPhase::Completed, now)?;
        self.status = if self.emergency {
            MissionStatus::Failed
        } else {
            MissionStatus::Succeeded
        };
        Ok(())
    }

    /// The head of the step queue, started if it was pending.
    pub fn head_step_mut(&mut self) -> Option<&mut MissionStep> {
        let head = self.steps.front_mut()?;
        if head.start() {
            self.needs_cache = None;
        }
        self.steps.front_mut()
    }

    /// The head of the step queue.
    pub fn head_step(&self) -> Option<&MissionStep> {
        self.steps.front()
    }

    /// Discard the head step if it is done. Returns whether one was discarded.
    pub fn pop_done_step(&mut self) -> bool {
        if self.steps.front().is_some_and(MissionStep::is_done) {
            self.steps.pop_front();
            self.navpoints_reached = self.navpoints_reached.saturating_add(1);
            self.needs_cache = None;
            true
        } else {
            false
        }
    }

    /// Replace the remaining plan with a single step.
    pub fn replace_steps(&mut self, step: MissionStep) {
        self.steps.clear();
        self.steps.push_back(step);
        self.needs_cache = None;
    }

    /// Drop the cached resource manifest.
    pub fn invalidate_needs(&mut self) {
        self.needs_cache = None;
    }

    /// The slot holding the cached resource manifest.
    pub const fn needs_cache_mut(&mut self) -> &mut Option<Cached<Manifest>> {
        &mut self.needs_cache
    }

    /// Whether `worker` is a member.
    pub fn is_member(&self, worker: UnitId) -> bool {
        self.members.contains(&worker)
    }

    /// Drop members for which `present` returns false. Returns whether any member remains.
    pub fn retain_members(&mut self, present: impl Fn(UnitId) -> bool) -> bool {
        self.members.retain(|member| present(*member));
        if self.lead.is_some_and(|lead| !self.members.contains(&lead)) {
            self.lead = self.members.first().copied();
        }
        !self.members.is_empty()
    }

    /// Read-only view for the presentation layer.
    pub fn view(&self) -> MissionView {
        MissionView {
            id: self.id,
            settlement: self.settlement,
            name: self.name.clone(),
            kind: self.kind,
            phase: self.phase,
            status: self.status,
            reasons: self.reasons.clone(),
            member_count: u32::try_from(self.members.len()).unwrap_or(u32::MAX),
            distance_travelled: self.distance_travelled,
            steps_remaining: u32::try_from(self.steps.len()).unwrap_or(u32::MAX),
        }
    }
}
