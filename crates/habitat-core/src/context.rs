//! Explicit simulation context shared by the dispatcher and the facade.
//!
//! [`SimulationContext`] replaces process-wide singletons: it carries the
//! configuration, the dense unit id allocator, the colony snapshot taken at
//! the last join barrier and the commands waiting for the next pulse. It is
//! owned by the simulation and lent to the dispatcher for each pulse.

use std::sync::Arc;

use habitat_types::{SettlementId, UnitId};
use habitat_world::{ColonySnapshot, Command, Settlement};

use crate::config::SimulationConfig;

/// Errors raised by the simulation context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The unit registry is full.
    #[error("unit capacity exceeded: at most {max} units may exist")]
    UnitCapacityExceeded {
        /// The configured maximum.
        max: u32,
    },
}

/// Sequential allocator for dense [`UnitId`]s.
///
/// Ids start at 1. Once `max` ids have been handed out every further
/// request fails; running out is fatal to the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRegistry {
    /// Highest id handed out so far (0 when none).
    last: u32,
    /// Most ids the registry will hand out.
    max: u32,
}

impl UnitRegistry {
    /// An empty registry allowing up to `max` units.
    pub const fn new(max: u32) -> Self {
        Self { last: 0, max }
    }

    /// Hand out the next id.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::UnitCapacityExceeded`] when `max` ids have
    /// already been allocated.
    pub fn allocate(&mut self) -> Result<UnitId, ContextError> {
        if self.last >= self.max {
            return Err(ContextError::UnitCapacityExceeded { max: self.max });
        }
        self.last = self.last.saturating_add(1);
        Ok(UnitId(self.last))
    }

    /// Number of ids handed out.
    pub const fn allocated(&self) -> u32 {
        self.last
    }

    /// Configured maximum.
    pub const fn capacity(&self) -> u32 {
        self.max
    }

    /// Mark every id up to `id` as taken (used after loading saved state).
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::UnitCapacityExceeded`] when `id` lies beyond
    /// the configured maximum.
    pub fn observe(&mut self, id: UnitId) -> Result<(), ContextError> {
        if id.index() > self.max {
            return Err(ContextError::UnitCapacityExceeded { max: self.max });
        }
        self.last = self.last.max(id.index());
        Ok(())
    }
}

/// Everything the dispatcher needs besides the settlements themselves.
#[derive(Debug)]
pub struct SimulationContext {
    config: Arc<SimulationConfig>,
    units: UnitRegistry,
    snapshot: ColonySnapshot,
    commands: Vec<(SettlementId, Command)>,
}

impl SimulationContext {
    /// A fresh context for `config`.
    pub fn new(config: Arc<SimulationConfig>) -> Self {
        let units = UnitRegistry::new(config.world.max_units);
        Self {
            config,
            units,
            snapshot: ColonySnapshot::default(),
            commands: Vec::new(),
        }
    }

    /// The simulation configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Shared handle to the configuration.
    pub fn config_handle(&self) -> Arc<SimulationConfig> {
        Arc::clone(&self.config)
    }

    /// The unit id allocator.
    pub const fn units(&self) -> &UnitRegistry {
        &self.units
    }

    /// Allocate a unit id.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::UnitCapacityExceeded`] when the registry is full.
    pub fn allocate_unit(&mut self) -> Result<UnitId, ContextError> {
        self.units.allocate()
    }

    /// Record every unit of loaded settlements so new ids do not collide.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::UnitCapacityExceeded`] when a loaded id lies
    /// beyond the configured maximum.
    pub fn observe_units<'a>(
        &mut self,
        settlements: impl IntoIterator<Item = &'a Settlement>,
    ) -> Result<(), ContextError> {
        for settlement in settlements {
            let ids = settlement.workers.keys().chain(settlement.vehicles.keys());
            for id in ids {
                self.units.observe(*id)?;
            }
        }
        Ok(())
    }

    /// Colony state as of the last join barrier.
    pub const fn snapshot(&self) -> &ColonySnapshot {
        &self.snapshot
    }

    /// Replace the snapshot after a barrier.
    pub fn set_snapshot(&mut self, snapshot: ColonySnapshot) {
        self.snapshot = snapshot;
    }

    /// Queue a command for `settlement`'s next pulse.
    pub fn queue_command(&mut self, settlement: SettlementId, command: Command) {
        self.commands.push((settlement, command));
    }

    /// Take every queued command, oldest first.
    pub fn take_commands(&mut self) -> Vec<(SettlementId, Command)> {
        std::mem::take(&mut self.commands)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::{Coordinates, JobKind};
    use habitat_world::Worker;

    use super::*;

    #[test]
    fn ids_are_dense_and_bounded() {
        let mut registry = UnitRegistry::new(2);
        assert_eq!(registry.allocate().unwrap(), UnitId(1));
        assert_eq!(registry.allocate().unwrap(), UnitId(2));
        assert!(matches!(
            registry.allocate(),
            Err(ContextError::UnitCapacityExceeded { max: 2 })
        ));
        assert_eq!(registry.allocated(), 2);
    }

    #[test]
    fn observed_units_are_not_reissued() {
        let config = Arc::new(SimulationConfig::default());
        let mut context = SimulationContext::new(config);
        let mut settlement = Settlement::new("Base", Coordinates::new(0.0, 0.0), 1);
        let id = settlement.id;
        settlement.add_worker(Worker::person(UnitId(41), "Ada", JobKind::Pilot, id));
        context.observe_units([&settlement]).unwrap();
        assert_eq!(context.allocate_unit().unwrap(), UnitId(42));
    }

    #[test]
    fn observing_beyond_capacity_fails() {
        let mut registry = UnitRegistry::new(5);
        assert!(registry.observe(UnitId(6)).is_err());
        assert!(registry.observe(UnitId(5)).is_ok());
        assert!(registry.allocate().is_err());
    }

    #[test]
    fn commands_drain_in_submission_order() {
        let mut context = SimulationContext::new(Arc::new(SimulationConfig::default()));
        let settlement = SettlementId::new();
        context.queue_command(settlement, Command::ClearTask { worker: UnitId(1) });
        context.queue_command(settlement, Command::ClearTask { worker: UnitId(2) });
        let drained = context.take_commands();
        assert_eq!(
            drained,
            vec![
                (settlement, Command::ClearTask { worker: UnitId(1) }),
                (settlement, Command::ClearTask { worker: UnitId(2) }),
            ]
        );
        assert!(context.take_commands().is_empty());
    }
}
