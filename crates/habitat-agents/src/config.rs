//! Tunables for physiology, tasks, decisions and missions.
//!
//! These values mirror the `agents` section of `habitat-config.yaml`. The
//! [`AgentConfig`] struct bundles every tunable so that callers (the
//! dispatcher's updater, tests) can override defaults. Every field falls
//! back to its default when missing from the YAML.

use serde::Deserialize;

/// All agent-layer settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Mission planning and phase parameters.
    pub mission: MissionConfig,
    /// Life support consumption per person.
    pub life_support: LifeSupportConfig,
    /// Need accumulation and recovery rates.
    pub physiology: PhysiologyConfig,
    /// Decision-layer parameters.
    pub decision: DecisionConfig,
}

/// Mission planning and phase parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Fewest members a mission may start with (default: 1).
    pub min_members: u32,
    /// Most members a mission recruits (default: 4).
    pub max_members: u32,
    /// Millisols a mission waits in review before approval (default: 20).
    pub review_millisols: f64,
    /// Site time budget per exploration site, millisols (default: 250).
    pub site_budget_millisols: f64,
    /// Time spent trading at a foreign settlement, millisols (default: 100).
    pub trade_millisols: f64,
    /// Distance under which a vehicle counts as arrived (default: 0.01).
    pub arrival_epsilon: f64,
    /// Kilograms of oxygen burned per kilogram of fuel (default: 1.5).
    pub oxidizer_ratio: f64,
    /// Exploration sites per mission (default: 2).
    pub exploration_sites: u32,
    /// Shortest distance to an exploration site (default: 50).
    pub site_distance_min: f64,
    /// Longest distance to an exploration site (default: 300).
    pub site_distance_max: f64,
    /// Health below which a member needs medical help (default: 30).
    pub medical_threshold: f64,
    /// Fatigue at or above which a member cannot take a shift (default: 800).
    pub fatigue_limit: f64,
    /// Safety factor applied to required travel resources (default: 1.2).
    pub resource_margin: f64,
    /// Extra factor loaded as optional life support (default: 0.5).
    pub optional_margin: f64,
    /// How long a computed resource manifest stays valid, millisols (default: 50).
    pub needs_cache_millisols: f64,
    /// Most missions a settlement runs at once (default: 2).
    pub max_concurrent: u32,
    /// Length of one driving shift, millisols (default: 50).
    pub drive_shift_millisols: f64,
    /// Finished missions kept in the settlement log (default: 20).
    pub log_capacity: usize,
    /// Rock samples collected per working member per millisol, kg (default: 0.2).
    pub sample_rate: f64,
    /// Most kilograms of goods loaded for a trade run (default: 400).
    pub trade_load_kg: f64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            min_members: 1,
            max_members: 4,
            review_millisols: 20.0,
            site_budget_millisols: 250.0,
            trade_millisols: 100.0,
            arrival_epsilon: 0.01,
            oxidizer_ratio: 1.5,
            exploration_sites: 2,
            site_distance_min: 50.0,
            site_distance_max: 300.0,
            medical_threshold: 30.0,
            fatigue_limit: 800.0,
            resource_margin: 1.2,
            optional_margin: 0.5,
            needs_cache_millisols: 50.0,
            max_concurrent: 2,
            drive_shift_millisols: 50.0,
            log_capacity: 20,
            sample_rate: 0.2,
            trade_load_kg: 400.0,
        }
    }
}

/// Life support consumption per person per sol, in kilograms.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LifeSupportConfig {
    /// Oxygen (default: 0.84).
    pub oxygen_per_sol: f64,
    /// Water (default: 3.0).
    pub water_per_sol: f64,
    /// Food (default: 0.62).
    pub food_per_sol: f64,
}

impl Default for LifeSupportConfig {
    fn default() -> Self {
        Self {
            oxygen_per_sol: 0.84,
            water_per_sol: 3.0,
            food_per_sol: 0.62,
        }
    }
}

/// Per-millisol need and condition rates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysiologyConfig {
    /// Fatigue gained while awake (default: 0.3).
    pub fatigue_rate: f64,
    /// Hunger gained (default: 0.25).
    pub hunger_rate: f64,
    /// Stress gained while working (default: 0.02).
    pub stress_rate: f64,
    /// Fatigue shed while sleeping (default: 2.5).
    pub sleep_recovery: f64,
    /// Hunger shed while eating (default: 10.0).
    pub eat_relief: f64,
    /// Stress shed while relaxing or socializing (default: 0.15).
    pub relax_relief: f64,
    /// Health lost per millisol when starving or short of oxygen (default: 0.05).
    pub deprivation_damage: f64,
    /// Health regained per millisol when needs are met (default: 0.01).
    pub heal_rate: f64,
    /// Infrastructure wear per millisol (default: 0.004).
    pub wear_rate: f64,
    /// Greenhouse care backlog per millisol (default: 0.006).
    pub crop_need_rate: f64,
    /// Wear repaired per millisol of maintenance (default: 0.08).
    pub repair_rate: f64,
    /// Backlog cleared per millisol of greenhouse work (default: 0.1).
    pub tending_rate: f64,
    /// Research points per millisol of research (default: 0.05).
    pub research_rate: f64,
}

impl Default for PhysiologyConfig {
    fn default() -> Self {
        Self {
            fatigue_rate: 0.3,
            hunger_rate: 0.25,
            stress_rate: 0.02,
            sleep_recovery: 2.5,
            eat_relief: 10.0,
            relax_relief: 0.15,
            deprivation_damage: 0.05,
            heal_rate: 0.01,
            wear_rate: 0.004,
            crop_need_rate: 0.006,
            repair_rate: 0.08,
            tending_rate: 0.1,
            research_rate: 0.05,
        }
    }
}

/// Decision-layer parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// How long a cached trade profit stays valid, millisols (default: 100).
    pub trade_cache_millisols: f64,
    /// Preference nudge per finished or interrupted task (default: 0.05).
    pub learning_rate: f64,
    /// Bound on the absolute learned preference (default: 0.5).
    pub preference_limit: f64,
    /// Default task duration, millisols (default: 50).
    pub task_millisols: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            trade_cache_millisols: 100.0,
            learning_rate: 0.05,
            preference_limit: 0.5,
            task_millisols: 50.0,
        }
    }
}

impl LifeSupportConfig {
    /// Per-person consumption for `millisols`, as `(oxygen, water, food)`.
    pub fn per_person(&self, millisols: f64) -> (f64, f64, f64) {
        let sols = millisols.max(0.0) / habitat_types::MILLISOLS_PER_SOL;
        (
            self.oxygen_per_sol * sols,
            self.water_per_sol * sols,
            self.food_per_sol * sols,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "mission:\n  max_members: 6\ndecision:\n  learning_rate: 0.1\n";
        let config: AgentConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.mission.max_members, 6);
        assert_eq!(config.mission.min_members, 1);
        assert!((config.decision.learning_rate - 0.1).abs() < 1e-12);
        assert!((config.life_support.food_per_sol - 0.62).abs() < 1e-12);
    }

    #[test]
    fn per_person_scales_by_sols() {
        let (oxygen, water, food) = LifeSupportConfig::default().per_person(500.0);
        assert!((oxygen - 0.42).abs() < 1e-12);
        assert!((water - 1.5).abs() < 1e-12);
        assert!((food - 0.31).abs() < 1e-12);
    }
}
