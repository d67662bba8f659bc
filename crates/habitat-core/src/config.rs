//! Configuration loading and typed config structures for the Habitat scheduler.
//!
//! The canonical configuration lives in `habitat-config.yaml` at the project
//! root; the `HABITAT_CONFIG` environment variable points elsewhere. This
//! module defines strongly-typed structs that mirror the YAML structure and
//! a loader that reads the file, falling back to defaults when it is absent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use habitat_agents::AgentConfig;
use habitat_types::Resource;
use serde::Deserialize;
use tracing::info;

/// Environment variable that overrides the configuration file path.
pub const CONFIG_ENV: &str = "HABITAT_CONFIG";

/// Configuration file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "habitat-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `habitat-config.yaml`. Every field has a
/// default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, pacing, unit capacity).
    #[serde(default)]
    pub world: WorldConfig,

    /// Master clock settings.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Worker pool sizing.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Worker, decision and mission tunables.
    #[serde(default)]
    pub agents: AgentConfig,

    /// Settlements created at startup.
    #[serde(default = "default_colonies")]
    pub colonies: Vec<ColonyConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            clock: ClockConfig::default(),
            dispatcher: DispatcherConfig::default(),
            simulation: SimulationBoundsConfig::default(),
            logging: LoggingConfig::default(),
            agents: AgentConfig::default(),
            colonies: default_colonies(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Load from `path`, or return the defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file) for a file that exists.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Resolve the configuration path from the value of [`CONFIG_ENV`].
pub fn config_path(env_value: Option<String>) -> PathBuf {
    env_value
        .filter(|value| !value.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed; each settlement derives its own stream from it.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between pulses.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Most units (people, robots, vehicles) the colony may ever hold.
    #[serde(default = "default_max_units")]
    pub max_units: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            max_units: default_max_units(),
        }
    }
}

/// Master clock configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClockConfig {
    /// Simulated seconds per real second.
    #[serde(default = "default_time_ratio")]
    pub time_ratio: f64,

    /// Largest elapsed time a single pulse may cover, in millisols.
    #[serde(default = "default_max_pulse_millisols")]
    pub max_pulse_millisols: f64,

    /// Absolute simulated time at startup, in millisols.
    #[serde(default = "default_start_millisols")]
    pub start_millisols: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            time_ratio: default_time_ratio(),
            max_pulse_millisols: default_max_pulse_millisols(),
            start_millisols: default_start_millisols(),
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatcherConfig {
    /// Cores left free for the runtime and the rest of the process.
    #[serde(default = "default_reserved_cores")]
    pub reserved_cores: usize,

    /// Fixed pool size; overrides the hardware-derived size when set.
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            reserved_cores: default_reserved_cores(),
            worker_threads: None,
        }
    }
}

/// Simulation boundary configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum pulses before the run stops (0 = unlimited).
    #[serde(default)]
    pub max_pulses: u64,

    /// Maximum wall-clock seconds before the run stops (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log level filter (`RUST_LOG` takes precedence).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// One settlement created at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColonyConfig {
    /// Settlement name.
    pub name: String,

    /// Surface position, east-west.
    #[serde(default)]
    pub x: f64,

    /// Surface position, north-south.
    #[serde(default)]
    pub y: f64,

    /// Longitude as a local time offset, in millisols.
    #[serde(default)]
    pub time_offset_millisols: f64,

    /// Number of people.
    #[serde(default = "default_people")]
    pub people: u32,

    /// Number of robots.
    #[serde(default = "default_robots")]
    pub robots: u32,

    /// Number of ground vehicles.
    #[serde(default = "default_vehicles")]
    pub vehicles: u32,

    /// Starting trade credits.
    #[serde(default = "default_credits")]
    pub credits: u64,

    /// Starting stock in kilograms.
    #[serde(default = "default_stock")]
    pub stock: BTreeMap<Resource, f64>,

    /// Resource processes the settlement runs.
    #[serde(default = "default_processes")]
    pub processes: Vec<ProcessConfig>,
}

impl ColonyConfig {
    /// A colony with default population, stock and processes.
    pub fn named(name: &str, x: f64, y: f64) -> Self {
        Self {
            name: name.to_owned(),
            x,
            y,
            time_offset_millisols: 0.0,
            people: default_people(),
            robots: default_robots(),
            vehicles: default_vehicles(),
            credits: default_credits(),
            stock: default_stock(),
            processes: default_processes(),
        }
    }
}

/// A resource process definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessConfig {
    /// Process name.
    pub name: String,

    /// Kilograms consumed per millisol.
    #[serde(default)]
    pub inputs: BTreeMap<Resource, f64>,

    /// Kilograms produced per millisol.
    #[serde(default)]
    pub outputs: BTreeMap<Resource, f64>,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Tharsis Colony".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    1_000
}

const fn default_max_units() -> u32 {
    10_000
}

const fn default_time_ratio() -> f64 {
    1_000.0
}

const fn default_max_pulse_millisols() -> f64 {
    50.0
}

const fn default_start_millisols() -> f64 {
    0.0
}

const fn default_reserved_cores() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_people() -> u32 {
    6
}

const fn default_robots() -> u32 {
    2
}

const fn default_vehicles() -> u32 {
    2
}

const fn default_credits() -> u64 {
    5_000
}

fn default_stock() -> BTreeMap<Resource, f64> {
    BTreeMap::from([
        (Resource::Oxygen, 2_000.0),
        (Resource::Water, 3_000.0),
        (Resource::Food, 800.0),
        (Resource::Methanol, 1_500.0),
        (Resource::CarbonDioxide, 500.0),
        (Resource::Ice, 1_000.0),
        (Resource::SpareParts, 200.0),
    ])
}

fn default_processes() -> Vec<ProcessConfig> {
    vec![
        ProcessConfig {
            name: "Atmosphere intake".to_owned(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::from([(Resource::CarbonDioxide, 0.6)]),
        },
        ProcessConfig {
            name: "Ice melter".to_owned(),
            inputs: BTreeMap::from([(Resource::Ice, 0.5)]),
            outputs: BTreeMap::from([(Resource::Water, 0.5)]),
        },
        ProcessConfig {
            name: "Electrolysis".to_owned(),
            inputs: BTreeMap::from([(Resource::Water, 0.4)]),
            outputs: BTreeMap::from([(Resource::Oxygen, 0.35), (Resource::Hydrogen, 0.05)]),
        },
        ProcessConfig {
            name: "Methanol synthesis".to_owned(),
            inputs: BTreeMap::from([(Resource::CarbonDioxide, 0.3), (Resource::Hydrogen, 0.04)]),
            outputs: BTreeMap::from([(Resource::Methanol, 0.2), (Resource::Water, 0.1)]),
        },
    ]
}

fn default_colonies() -> Vec<ColonyConfig> {
    vec![
        ColonyConfig::named("Schiaparelli", 0.0, 0.0),
        ColonyConfig {
            time_offset_millisols: 120.0,
            ..ColonyConfig::named("Ares Vallis", 400.0, 150.0)
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.dispatcher.reserved_cores, 1);
        assert!(config.dispatcher.worker_threads.is_none());
        assert_eq!(config.simulation.max_pulses, 0);
        assert!(!config.logging.json);
    }

    #[test]
    fn omitted_colonies_use_the_default_pair() {
        assert_eq!(SimulationConfig::default().colonies.len(), 2);
        let parsed = SimulationConfig::parse("world:\n  seed: 1\n").unwrap();
        assert_eq!(parsed.colonies, SimulationConfig::default().colonies);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  name: "Test Colony"
  seed: 123
  tick_interval_ms: 250
  max_units: 64

clock:
  time_ratio: 500.0
  max_pulse_millisols: 20.0
  start_millisols: 300.0

dispatcher:
  reserved_cores: 2
  worker_threads: 3

simulation:
  max_pulses: 100
  max_real_time_seconds: 60

logging:
  level: "debug"
  json: true

agents:
  mission:
    max_members: 2
    site_budget_millisols: 120.0

colonies:
  - name: "Alpha"
    x: 10.0
    y: -5.0
    people: 3
    stock:
      Oxygen: 50.0
      Methanol: 20.0
    processes:
      - name: "Melter"
        inputs:
          Ice: 1.0
        outputs:
          Water: 1.0
"#;

        let config = SimulationConfig::parse(yaml).unwrap();

        assert_eq!(config.world.name, "Test Colony");
        assert_eq!(config.world.max_units, 64);
        assert!((config.clock.start_millisols - 300.0).abs() < 1e-9);
        assert_eq!(config.dispatcher.worker_threads, Some(3));
        assert_eq!(config.simulation.max_pulses, 100);
        assert!(config.logging.json);
        assert_eq!(config.agents.mission.max_members, 2);
        assert_eq!(config.colonies.len(), 1);
        let colony = config.colonies.first().unwrap();
        assert_eq!(colony.people, 3);
        assert_eq!(colony.robots, 2);
        let methanol = colony.stock.get(&Resource::Methanol).copied().unwrap_or_default();
        assert!((methanol - 20.0).abs() < 1e-9);
        assert_eq!(colony.processes.len(), 1);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimulationConfig::parse("clock:\n  time_ratio: 10.0\n").unwrap();
        assert!((config.clock.time_ratio - 10.0).abs() < 1e-9);
        assert!((config.clock.max_pulse_millisols - 50.0).abs() < 1e-9);
        assert_eq!(config.world.seed, 42);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(SimulationConfig::parse("").is_ok());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let result = SimulationConfig::parse("world: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn env_value_overrides_path() {
        assert_eq!(config_path(None), PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(config_path(Some(String::new())), PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(
            config_path(Some("/etc/habitat.yaml".to_owned())),
            PathBuf::from("/etc/habitat.yaml")
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let missing = Path::new("/nonexistent/habitat.yaml");
        let config = SimulationConfig::load_or_default(missing).unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(DEFAULT_CONFIG_PATH);
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
