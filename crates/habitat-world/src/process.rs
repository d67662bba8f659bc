//! Settlement-local resource conversion processes.
//!
//! A [`ResourceProcess`] converts inputs into outputs at fixed per-millisol
//! rates. When any input runs short, the whole process runs at the
//! achievable fraction: exactly that fraction of every input is consumed
//! and every output is scaled by it. A process that could not run at full
//! rate switches itself off until the next sol.

use std::collections::BTreeMap;

use habitat_types::Resource;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::resource::ResourceStore;

/// A continuous conversion of input resources into output resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProcess {
    /// Display name, also used as the throttle key for shortage warnings.
    pub name: String,
    /// Kilograms of each input consumed per millisol at full rate.
    pub inputs: BTreeMap<Resource, f64>,
    /// Kilograms of each output produced per millisol at full rate.
    pub outputs: BTreeMap<Resource, f64>,
    /// Whether the process runs this pulse.
    pub enabled: bool,
}

/// What one pulse of a process achieved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessRun {
    /// Achieved fraction of the full rate, in `[0, 1]`.
    pub fraction: f64,
    /// Whether the process disabled itself because of a shortage.
    pub disabled: bool,
}

impl ResourceProcess {
    /// Create an enabled process with no inputs or outputs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            enabled: true,
        }
    }

    /// Builder-style input rate.
    #[must_use]
    pub fn with_input(mut self, resource: Resource, rate_per_millisol: f64) -> Self {
        self.inputs.insert(resource, rate_per_millisol);
        self
    }

    /// Builder-style output rate.
    #[must_use]
    pub fn with_output(mut self, resource: Resource, rate_per_millisol: f64) -> Self {
        self.outputs.insert(resource, rate_per_millisol);
        self
    }

    /// The fraction of full rate `store` can feed for `elapsed` millisols.
    pub fn achievable_fraction(&self, elapsed: f64, store: &ResourceStore) -> f64 {
        self.inputs
            .iter()
            .map(|(resource, rate)| {
                let need = rate * elapsed;
                if need <= 0.0 {
                    1.0
                } else {
                    (store.get_amount_resource_stored(*resource) / need).min(1.0)
                }
            })
            .fold(1.0_f64, f64::min)
    }

    /// Run the process for `elapsed` millisols against `store`.
    ///
    /// Disabled processes do nothing and report a zero fraction.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidAmount`] if a configured rate is negative
    /// or not finite.
    pub fn process(
        &mut self,
        elapsed: f64,
        store: &mut ResourceStore,
    ) -> Result<ProcessRun, WorldError> {
        if !self.enabled || elapsed <= 0.0 {
            return Ok(ProcessRun {
                fraction: 0.0,
                disabled: false,
            });
        }
        let fraction = self.achievable_fraction(elapsed, store);
        for (resource, rate) in &self.inputs {
            store.retrieve_amount_resource(*resource, rate * elapsed * fraction)?;
        }
        for (resource, rate) in &self.outputs {
            store.store_amount_resource(*resource, rate * elapsed * fraction)?;
        }
        let disabled = fraction < 1.0;
        if disabled {
            self.enabled = false;
        }
        Ok(ProcessRun { fraction, disabled })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn electrolysis() -> ResourceProcess {
        ResourceProcess::new("electrolysis")
            .with_input(Resource::Water, 1.0)
            .with_output(Resource::Oxygen, 0.8)
            .with_output(Resource::Hydrogen, 0.1)
    }

    #[test]
    fn full_rate_when_stocked() {
        let mut store = ResourceStore::new(10_000.0);
        store.store_amount_resource(Resource::Water, 100.0).unwrap();
        let mut process = electrolysis();
        let run = process.process(10.0, &mut store).unwrap();
        assert!((run.fraction - 1.0).abs() < 1e-12);
        assert!(!run.disabled);
        assert!((store.get_amount_resource_stored(Resource::Water) - 90.0).abs() < 1e-9);
        assert!((store.get_amount_resource_stored(Resource::Oxygen) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn shortage_scales_everything_and_disables() {
        let mut store = ResourceStore::new(10_000.0);
        store.store_amount_resource(Resource::Water, 4.0).unwrap();
        let mut process = electrolysis();
        let run = process.process(10.0, &mut store).unwrap();
        assert!((run.fraction - 0.4).abs() < 1e-12);
        assert!(run.disabled);
        assert!(!process.enabled);
        assert!(store.get_amount_resource_stored(Resource::Water) < 1e-9);
        assert!((store.get_amount_resource_stored(Resource::Oxygen) - 3.2).abs() < 1e-9);

        let again = process.process(10.0, &mut store).unwrap();
        assert!(again.fraction.abs() < 1e-12);
    }
}
