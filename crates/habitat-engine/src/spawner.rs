//! Colony spawner for seeding the simulation with starting settlements.
//!
//! At startup, the spawner turns every configured colony into a
//! [`Settlement`]: crew with unique names and rotating jobs, maintenance
//! robots, a motor pool parked at the settlement, the starting stock, the
//! resource processes and the trade credits. Unit ids come from the
//! simulation's registry so they stay dense across colonies.

use habitat_core::Simulation;
use habitat_core::config::{ColonyConfig, ProcessConfig};
use habitat_types::{Coordinates, JobKind, SettlementId};
use habitat_world::{ResourceProcess, Settlement, Vehicle, Worker};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::info;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in pool of crew names. Each colony draws without replacement.
const NAME_POOL: &[&str] = &[
    "Ada", "Bashir", "Chen", "Dagny", "Emeka", "Farah", "Goran", "Hana",
    "Ines", "Jonas", "Keiko", "Lars", "Mira", "Nkosi", "Oren", "Priya",
    "Quinn", "Rafael", "Sanna", "Tariq", "Uma", "Viktor", "Wen", "Ximena",
    "Yusuf", "Zofia", "Arjun", "Bette", "Cyrus", "Delia",
];

/// Jobs handed to crew members in rotation.
const JOB_ROTATION: [JobKind; 6] = [
    JobKind::Pilot,
    JobKind::Engineer,
    JobKind::Botanist,
    JobKind::Scientist,
    JobKind::Trader,
    JobKind::Doctor,
];

/// Jobs handed to robots in rotation.
const ROBOT_JOBS: [JobKind; 2] = [JobKind::Engineer, JobKind::Botanist];

/// Odd multiplier spreading colony seeds apart.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed for the colony at `index` under `world_seed`.
pub const fn colony_seed(world_seed: u64, index: u64) -> u64 {
    world_seed.wrapping_add(index.wrapping_add(1).wrapping_mul(SEED_STRIDE))
}

/// Spawn every configured colony into `simulation`.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] when no colony is configured or a
/// colony asks for more crew than the name pool holds, and propagates
/// unit-capacity and store errors.
pub fn spawn_colonies(simulation: &mut Simulation) -> Result<Vec<SettlementId>, EngineError> {
    let colonies = simulation.config().colonies.clone();
    if colonies.is_empty() {
        return Err(EngineError::Spawner {
            message: String::from("no colonies configured"),
        });
    }
    let world_seed = simulation.config().world.seed;

    let mut ids = Vec::with_capacity(colonies.len());
    for (colony, index) in colonies.iter().zip(0_u64..) {
        let settlement = build_settlement(simulation, colony, colony_seed(world_seed, index))?;
        info!(
            settlement = %settlement.id,
            name = %settlement.name,
            people = colony.people,
            robots = colony.robots,
            vehicles = colony.vehicles,
            "colony spawned"
        );
        ids.push(simulation.add_settlement(settlement));
    }
    Ok(ids)
}

/// Build one settlement from its colony definition.
///
/// # Errors
///
/// Same as [`spawn_colonies`].
pub fn build_settlement(
    simulation: &mut Simulation,
    colony: &ColonyConfig,
    seed: u64,
) -> Result<Settlement, EngineError> {
    let location = Coordinates::new(colony.x, colony.y);
    let mut settlement = Settlement::new(colony.name.clone(), location, seed);
    settlement.time_offset_millisols = colony.time_offset_millisols;
    settlement.credits = Decimal::from(colony.credits);
    let home = settlement.id;

    let mut rng = StdRng::seed_from_u64(seed);
    let names = pick_unique_names(&mut rng, colony.people)?;
    for (name, job) in names.into_iter().zip(JOB_ROTATION.iter().cycle()) {
        let id = simulation.allocate_unit()?;
        settlement.add_worker(Worker::person(id, name, *job, home));
    }

    let prefix = initials(&colony.name);
    for (n, job) in (1..=colony.robots).zip(ROBOT_JOBS.iter().cycle()) {
        let id = simulation.allocate_unit()?;
        settlement.add_worker(Worker::robot(id, format!("{prefix}-R{n}"), *job, home));
    }

    for n in 1..=colony.vehicles {
        let id = simulation.allocate_unit()?;
        let name = format!("{} Rover {n}", colony.name);
        settlement.add_vehicle(Vehicle::new(id, name, home, location));
    }

    for (resource, amount) in &colony.stock {
        settlement.store.store_amount_resource(*resource, *amount)?;
    }
    settlement
        .processes
        .extend(colony.processes.iter().map(build_process));
    Ok(settlement)
}

fn build_process(config: &ProcessConfig) -> ResourceProcess {
    let process = config
        .inputs
        .iter()
        .fold(ResourceProcess::new(config.name.clone()), |process, (resource, rate)| {
            process.with_input(*resource, *rate)
        });
    config
        .outputs
        .iter()
        .fold(process, |process, (resource, rate)| process.with_output(*resource, *rate))
}

fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Pick `count` unique names from [`NAME_POOL`].
fn pick_unique_names<R: Rng>(rng: &mut R, count: u32) -> Result<Vec<String>, EngineError> {
    let pool_len = NAME_POOL.len();
    let count = usize::try_from(count).map_err(|_conversion_err| EngineError::Spawner {
        message: format!("crew size {count} exceeds usize range"),
    })?;
    if count > pool_len {
        return Err(EngineError::Spawner {
            message: format!("requested {count} names but pool only has {pool_len}"),
        });
    }

    // Partial Fisher-Yates over the pool indices.
    let mut indices: Vec<usize> = (0..pool_len).collect();
    for i in 0..count {
        let j = rng.random_range(i..pool_len);
        indices.swap(i, j);
    }
    Ok(indices
        .into_iter()
        .take(count)
        .filter_map(|index| NAME_POOL.get(index))
        .map(|name| String::from(*name))
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use habitat_core::SimulationConfig;
    use habitat_types::{Resource, UnitId, WorkerKind};

    use super::*;

    fn simulation() -> Simulation {
        Simulation::new(SimulationConfig::default()).unwrap()
    }

    #[test]
    fn spawns_every_default_colony() {
        let mut simulation = simulation();
        let ids = spawn_colonies(&mut simulation).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(simulation.settlement_count(), 2);
    }

    #[test]
    fn colony_has_crew_robots_vehicles_and_stock() {
        let mut simulation = simulation();
        let colony = ColonyConfig::named("Jezero Base", 10.0, 20.0);
        let settlement = build_settlement(&mut simulation, &colony, 7).unwrap();

        let people = settlement
            .workers
            .values()
            .filter(|worker| worker.kind == WorkerKind::Person)
            .count();
        let robots = settlement
            .workers
            .values()
            .filter(|worker| worker.kind == WorkerKind::Robot)
            .count();
        assert_eq!(people, usize::try_from(colony.people).unwrap());
        assert_eq!(robots, usize::try_from(colony.robots).unwrap());
        assert_eq!(settlement.vehicles.len(), usize::try_from(colony.vehicles).unwrap());
        assert!(settlement.workers.values().any(|worker| worker.name == "JB-R1"));
        assert!(settlement.store.get_amount_resource_stored(Resource::Oxygen) > 0.0);
        assert_eq!(settlement.processes.len(), colony.processes.len());
        assert_eq!(settlement.credits, Decimal::from(colony.credits));
        assert!(settlement
            .vehicles
            .values()
            .all(|vehicle| vehicle.position == settlement.location));
    }

    #[test]
    fn unit_ids_are_dense_across_colonies() {
        let mut simulation = simulation();
        spawn_colonies(&mut simulation).unwrap();
        let ids: BTreeSet<UnitId> = simulation
            .settlements()
            .flat_map(|settlement| {
                settlement
                    .workers
                    .keys()
                    .chain(settlement.vehicles.keys())
                    .copied()
                    .collect::<Vec<_>>()
            })
            .collect();
        let count = u32::try_from(ids.len()).unwrap();
        assert_eq!(ids.first(), Some(&UnitId(1)));
        assert_eq!(ids.last(), Some(&UnitId(count)));
    }

    #[test]
    fn crew_names_are_unique_within_a_colony() {
        let mut rng = StdRng::seed_from_u64(1);
        let names = pick_unique_names(&mut rng, 20).unwrap();
        let unique: BTreeSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn oversized_crew_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let too_many = u32::try_from(NAME_POOL.len() + 1).unwrap();
        assert!(pick_unique_names(&mut rng, too_many).is_err());
    }

    #[test]
    fn colony_seeds_differ() {
        assert_ne!(colony_seed(42, 0), colony_seed(42, 1));
        assert_eq!(colony_seed(42, 3), colony_seed(42, 3));
    }

    #[test]
    fn empty_colony_list_is_an_error() {
        let config = SimulationConfig {
            colonies: Vec::new(),
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::new(config).unwrap();
        assert!(matches!(
            spawn_colonies(&mut simulation),
            Err(EngineError::Spawner { .. })
        ));
    }
}
