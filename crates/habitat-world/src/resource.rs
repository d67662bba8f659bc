//! Amount-resource storage for settlements and vehicle cargo holds.
//!
//! The store obeys a clamping law: a retrieval never takes more than is
//! stored, so for any requested amount `r` and stored amount `s` the
//! retrieved amount is exactly `min(r, s)`. Storing is clamped by the
//! remaining total capacity in the same way.

use std::collections::BTreeMap;

use habitat_types::Resource;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Amounts below this are treated as empty to keep rounding dust out of the map.
const DUST: f64 = 1e-9;

/// A mass-limited store of amount resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStore {
    /// Stored kilograms per resource.
    amounts: BTreeMap<Resource, f64>,
    /// Total mass capacity across all resources, in kilograms.
    capacity: f64,
}

impl ResourceStore {
    /// Create an empty store with the given total capacity.
    pub const fn new(capacity: f64) -> Self {
        Self {
            amounts: BTreeMap::new(),
            capacity,
        }
    }

    /// Total capacity in kilograms.
    pub const fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Kilograms of `resource` currently stored.
    pub fn get_amount_resource_stored(&self, resource: Resource) -> f64 {
        self.amounts.get(&resource).copied().unwrap_or(0.0)
    }

    /// Total stored mass.
    pub fn total_mass(&self) -> f64 {
        self.amounts.values().sum()
    }

    /// Unused capacity.
    pub fn remaining_capacity(&self) -> f64 {
        (self.capacity - self.total_mass()).max(0.0)
    }

    /// Retrieve up to `amount` of `resource`; returns the amount actually taken.
    pub fn retrieve_amount_resource(
        &mut self,
        resource: Resource,
        amount: f64,
    ) -> Result<f64, WorldError> {
        validate(resource, amount)?;
        let stored = self.get_amount_resource_stored(resource);
        let taken = amount.min(stored);
        let left = stored - taken;
        if left <= DUST {
            self.amounts.remove(&resource);
        } else {
            self.amounts.insert(resource, left);
        }
        Ok(taken)
    }

    /// Store up to `amount` of `resource`; returns the amount actually stored.
    pub fn store_amount_resource(
        &mut self,
        resource: Resource,
        amount: f64,
    ) -> Result<f64, WorldError> {
        validate(resource, amount)?;
        let accepted = amount.min(self.remaining_capacity());
        if accepted > DUST {
            let entry = self.amounts.entry(resource).or_insert(0.0);
            *entry += accepted;
        }
        Ok(accepted)
    }

    /// Move everything into `target`, returning what did not fit back here.
    pub fn transfer_all_into(&mut self, target: &mut Self) -> Result<(), WorldError> {
        let drained: Vec<(Resource, f64)> =
            std::mem::take(&mut self.amounts).into_iter().collect();
        for (resource, amount) in drained {
            let stored = target.store_amount_resource(resource, amount)?;
            let rejected = amount - stored;
            if rejected > DUST {
                self.store_amount_resource(resource, rejected)?;
            }
        }
        Ok(())
    }

    /// Iterate over stored amounts.
    pub fn iter(&self) -> impl Iterator<Item = (Resource, f64)> + '_ {
        self.amounts.iter().map(|(resource, amount)| (*resource, *amount))
    }

    /// A copy of the stored amounts (used for snapshots).
    pub fn amounts(&self) -> BTreeMap<Resource, f64> {
        self.amounts.clone()
    }
}

fn validate(resource: Resource, amount: f64) -> Result<(), WorldError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(WorldError::InvalidAmount { resource, amount })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_is_clamped_to_stored() {
        let cases = [(0.0, 0.0), (5.0, 10.0), (10.0, 5.0), (7.5, 7.5), (0.0, 3.0)];
        for (requested, stored) in cases {
            let mut store = ResourceStore::new(1_000.0);
            store.store_amount_resource(Resource::Water, stored).unwrap();
            let taken = store
                .retrieve_amount_resource(Resource::Water, requested)
                .unwrap();
            assert!((taken - requested.min(stored)).abs() < 1e-12);
            assert!(store.get_amount_resource_stored(Resource::Water) >= 0.0);
        }
    }

    #[test]
    fn storing_respects_capacity() {
        let mut store = ResourceStore::new(100.0);
        let first = store.store_amount_resource(Resource::Food, 70.0).unwrap();
        let second = store.store_amount_resource(Resource::Water, 70.0).unwrap();
        assert!((first - 70.0).abs() < 1e-12);
        assert!((second - 30.0).abs() < 1e-12);
        assert!(store.remaining_capacity() < 1e-9);
    }

    #[test]
    fn rejects_negative_and_nan() {
        let mut store = ResourceStore::new(10.0);
        assert!(store.store_amount_resource(Resource::Ice, -1.0).is_err());
        assert!(store.retrieve_amount_resource(Resource::Ice, f64::NAN).is_err());
    }

    #[test]
    fn transfer_keeps_overflow() {
        let mut cargo = ResourceStore::new(100.0);
        cargo.store_amount_resource(Resource::Food, 60.0).unwrap();
        let mut home = ResourceStore::new(40.0);
        cargo.transfer_all_into(&mut home).unwrap();
        assert!((home.get_amount_resource_stored(Resource::Food) - 40.0).abs() < 1e-9);
        assert!((cargo.get_amount_resource_stored(Resource::Food) - 20.0).abs() < 1e-9);
    }
}
