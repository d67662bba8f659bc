//! The settlement aggregate: everything one dispatcher work unit owns.
//!
//! A [`Settlement`] exclusively owns its workers, vehicles, missions,
//! resource store and processes. It is updated by exactly one work unit
//! per pulse; nothing outside that unit holds references into it.

use std::collections::{BTreeMap, VecDeque};

use habitat_types::{
    ClockPulse, Coordinates, MissionId, MissionView, SettlementId, StatusReason, UnitId,
    WorkerKind,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::Cached;
use crate::command::Command;
use crate::error::WorldError;
use crate::mission::Mission;
use crate::process::ResourceProcess;
use crate::resource::ResourceStore;
use crate::throttle::LogThrottle;
use crate::vehicle::Vehicle;
use crate::worker::Worker;

/// Default store capacity in kilograms.
pub const DEFAULT_STORE_CAPACITY: f64 = 100_000.0;
/// Default number of finished missions kept for display.
pub const DEFAULT_MISSION_LOG_CAPACITY: usize = 20;

/// Source data cached for the decision layer.
#[derive(Debug, Clone, Default)]
pub struct DecisionCache {
    /// Best trade profit per destination settlement.
    pub trade_profit: BTreeMap<SettlementId, Cached<f64>>,
}

/// A semi-autonomous colony.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement id.
    pub id: SettlementId,
    /// Display name.
    pub name: String,
    /// Surface position.
    pub location: Coordinates,
    /// Longitude as a local-time offset in millisols.
    pub time_offset_millisols: f64,
    /// Number of people the habitat supports.
    pub living_capacity: u32,
    /// Amount-resource storage.
    pub store: ResourceStore,
    /// Conversion processes.
    pub processes: Vec<ResourceProcess>,
    /// People and robots.
    pub workers: BTreeMap<UnitId, Worker>,
    /// Motor pool.
    pub vehicles: BTreeMap<UnitId, Vehicle>,
    /// Active missions.
    pub missions: BTreeMap<MissionId, Mission>,
    /// Recently finished missions, oldest first.
    pub mission_log: VecDeque<MissionView>,
    /// Infrastructure wear, `0..=100`.
    pub wear: f64,
    /// Greenhouse care backlog, `0..=100`.
    pub crop_need: f64,
    /// Accumulated research.
    pub research_points: f64,
    /// Trade credits.
    pub credits: Decimal,
    /// Sols elapsed since founding.
    pub sols_elapsed: u64,
    /// Visiting vehicles parked here, with their home settlement.
    pub visitors: BTreeMap<UnitId, SettlementId>,
    /// Queued presentation-layer commands.
    pub commands: VecDeque<Command>,
    /// Seed for the settlement's random stream.
    pub seed: u64,
    /// Cached decision-layer source data.
    #[serde(skip)]
    pub decision_cache: DecisionCache,
    #[serde(skip, default = "unseeded_rng")]
    rng: StdRng,
    #[serde(skip)]
    throttle: LogThrottle,
}

fn unseeded_rng() -> StdRng {
    StdRng::seed_from_u64(0)
}

impl Settlement {
    /// A new, empty settlement.
    pub fn new(name: impl Into<String>, location: Coordinates, seed: u64) -> Self {
        Self {
            id: SettlementId::new(),
            name: name.into(),
            location,
            time_offset_millisols: 0.0,
            living_capacity: 12,
            store: ResourceStore::new(DEFAULT_STORE_CAPACITY),
            processes: Vec::new(),
            workers: BTreeMap::new(),
            vehicles: BTreeMap::new(),
            missions: BTreeMap::new(),
            mission_log: VecDeque::new(),
            wear: 0.0,
            crop_need: 0.0,
            research_points: 0.0,
            credits: Decimal::ZERO,
            sols_elapsed: 0,
            visitors: BTreeMap::new(),
            commands: VecDeque::new(),
            seed,
            decision_cache: DecisionCache::default(),
            rng: StdRng::seed_from_u64(seed),
            throttle: LogThrottle::default(),
        }
    }

    /// The settlement's random stream.
    pub const fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Whether a warning keyed by `key` may be logged on `pulse_id`.
    pub fn should_warn(&mut self, key: &str, pulse_id: u64) -> bool {
        self.throttle.should_log(key, pulse_id)
    }

    /// Number of people (robots excluded).
    pub fn population(&self) -> u32 {
        let people = self
            .workers
            .values()
            .filter(|worker| worker.kind == WorkerKind::Person)
            .count();
        u32::try_from(people).unwrap_or(u32::MAX)
    }

    /// Add a worker.
    pub fn add_worker(&mut self, worker: Worker) {
        self.workers.insert(worker.id, worker);
    }

    /// Add a vehicle.
    pub fn add_vehicle(&mut self, vehicle: Vehicle) {
        self.vehicles.insert(vehicle.id, vehicle);
    }

    /// Look up a worker.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WorkerNotFound`] if the id is not on the roster.
    pub fn worker_mut(&mut self, id: UnitId) -> Result<&mut Worker, WorldError> {
        self.workers.get_mut(&id).ok_or(WorldError::WorkerNotFound(id))
    }

    /// Look up a vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::VehicleNotFound`] if the id is not in the motor pool.
    pub fn vehicle_mut(&mut self, id: UnitId) -> Result<&mut Vehicle, WorldError> {
        self.vehicles.get_mut(&id).ok_or(WorldError::VehicleNotFound(id))
    }

    /// Look up a vehicle immutably.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::VehicleNotFound`] if the id is not in the motor pool.
    pub fn vehicle(&self, id: UnitId) -> Result<&Vehicle, WorldError> {
        self.vehicles.get(&id).ok_or(WorldError::VehicleNotFound(id))
    }

    /// First vehicle a new mission could reserve.
    pub fn available_vehicle(&self) -> Option<UnitId> {
        self.vehicles
            .values()
            .find(|vehicle| vehicle.home == self.id && vehicle.is_available())
            .map(|vehicle| vehicle.id)
    }

    /// Run every resource process for the pulse.
    ///
    /// Processes that hit a shortage disable themselves; the warning is
    /// throttled per process. On a new sol every process is re-enabled
    /// before running.
    ///
    /// # Errors
    ///
    /// Propagates [`WorldError::InvalidAmount`] from a misconfigured rate.
    pub fn run_processes(&mut self, pulse: &ClockPulse) -> Result<(), WorldError> {
        if pulse.is_new_sol() {
            for process in &mut self.processes {
                process.enabled = true;
            }
        }
        let mut shortages = Vec::new();
        for process in &mut self.processes {
            let run = process.process(pulse.elapsed(), &mut self.store)?;
            if run.disabled {
                shortages.push((process.name.clone(), run.fraction));
            }
        }
        for (name, fraction) in shortages {
            if self.should_warn(&name, pulse.id()) {
                warn!(
                    settlement = %self.id,
                    pulse = pulse.id(),
                    process = %name,
                    fraction,
                    "resource process short of inputs, disabled until next sol"
                );
            }
        }
        Ok(())
    }

    /// Append a finished mission to the bounded display log.
    pub fn record_finished(&mut self, view: MissionView, capacity: usize) {
        self.mission_log.push_back(view);
        while self.mission_log.len() > capacity {
            self.mission_log.pop_front();
        }
    }

    /// Rebuild transient state after loading and prune stale references.
    ///
    /// Reseeds the random stream from the settlement seed and `pulse_id`,
    /// resets the log throttle and decision cache, detaches members and
    /// vehicles that no longer exist, aborts missions left without members,
    /// and clears worker back-references to missions that are gone.
    pub fn reinit(&mut self, pulse_id: u64, now: f64) {
        self.rng = StdRng::seed_from_u64(self.seed.wrapping_add(pulse_id));
        self.throttle = LogThrottle::default();
        self.decision_cache = DecisionCache::default();

        let workers = &self.workers;
        let vehicles = &self.vehicles;
        for mission in self.missions.values_mut() {
            mission.invalidate_needs();
            if mission.vehicle.is_some_and(|id| !vehicles.contains_key(&id)) {
                mission.vehicle = None;
            }
            if !mission.retain_members(|member| workers.contains_key(&member)) {
                mission.abort(StatusReason::MembersLost, now);
            }
        }

        let missions = &self.missions;
        for worker in self.workers.values_mut() {
            let stale = worker.mission.is_some_and(|id| {
                missions
                    .get(&id)
                    .is_none_or(|mission| !mission.is_member(worker.id))
            });
            if stale {
                worker.mission = None;
            }
            if worker
                .task
                .as_ref()
                .and_then(|task| task.mission)
                .is_some_and(|id| !missions.contains_key(&id))
            {
                worker.task = None;
            }
        }
        debug!(settlement = %self.id, pulse = pulse_id, "settlement reinitialized");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::{JobKind, MissionKind, Resource};

    use super::*;

    fn sample() -> Settlement {
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 7);
        let id = settlement.id;
        settlement.add_worker(Worker::person(UnitId(1), "Ada", JobKind::Pilot, id));
        settlement.add_worker(Worker::robot(UnitId(2), "R2", JobKind::Engineer, id));
        settlement
    }

    #[test]
    fn population_counts_people_only() {
        assert_eq!(sample().population(), 1);
    }

    #[test]
    fn new_sol_reenables_processes() {
        let mut settlement = sample();
        settlement.processes.push(
            ResourceProcess::new("electrolysis")
                .with_input(Resource::Water, 1.0)
                .with_output(Resource::Oxygen, 0.8),
        );
        settlement
            .run_processes(&ClockPulse::new(1, 5.0, 5.0, 0, false))
            .unwrap();
        assert!(!settlement.processes.first().unwrap().enabled);
        settlement
            .store
            .store_amount_resource(Resource::Water, 100.0)
            .unwrap();
        settlement
            .run_processes(&ClockPulse::new(2, 5.0, 1_002.0, 1, true))
            .unwrap();
        assert!(settlement.processes.first().unwrap().enabled);
        assert!(settlement.store.get_amount_resource_stored(Resource::Oxygen) > 0.0);
    }

    #[test]
    fn reinit_prunes_stale_members() {
        let mut settlement = sample();
        let mut mission = Mission::new(MissionKind::Exploration, "E", settlement.id, 0.0);
        mission.members.insert(UnitId(99));
        mission.vehicle = Some(UnitId(50));
        let mission_id = mission.id;
        settlement.missions.insert(mission_id, mission);
        settlement.workers.get_mut(&UnitId(1)).unwrap().mission = Some(MissionId::new());

        settlement.reinit(10, 100.0);

        let mission = settlement.missions.get(&mission_id).unwrap();
        assert!(mission.vehicle.is_none());
        assert!(mission.is_done());
        assert_eq!(mission.reasons, vec![StatusReason::MembersLost]);
        assert!(settlement.workers.get(&UnitId(1)).unwrap().mission.is_none());
    }

    #[test]
    fn mission_log_is_bounded() {
        let mut settlement = sample();
        for n in 0..5 {
            let mission = Mission::new(MissionKind::Trade, format!("T{n}"), settlement.id, 0.0);
            settlement.record_finished(mission.view(), 3);
        }
        assert_eq!(settlement.mission_log.len(), 3);
        assert_eq!(settlement.mission_log.front().unwrap().name, "T2");
    }
}
