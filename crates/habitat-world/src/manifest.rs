//! Resource manifests: accumulators of required quantities for an upcoming activity.
//!
//! Mission steps contribute to a shared manifest through
//! [`Manifest::add_resource`]. Required and optional amounts are kept apart
//! so that a caller can load optional extras when stock allows while only
//! failing on the required part.

use std::collections::BTreeMap;

use habitat_types::Resource;
use serde::{Deserialize, Serialize};

use crate::resource::ResourceStore;

/// Required and optional resource quantities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    required: BTreeMap<Resource, f64>,
    optional: BTreeMap<Resource, f64>,
}

impl Manifest {
    /// An empty manifest.
    pub const fn new() -> Self {
        Self {
            required: BTreeMap::new(),
            optional: BTreeMap::new(),
        }
    }

    /// Add `amount` of `resource`. Non-positive and non-finite amounts are ignored.
    pub fn add_resource(&mut self, resource: Resource, amount: f64, optional: bool) {
        if !(amount.is_finite() && amount > 0.0) {
            return;
        }
        let bucket = if optional {
            &mut self.optional
        } else {
            &mut self.required
        };
        *bucket.entry(resource).or_insert(0.0) += amount;
    }

    /// Amount of `resource`, including optional extras if asked.
    pub fn amount(&self, resource: Resource, include_optional: bool) -> f64 {
        let required = self.required.get(&resource).copied().unwrap_or(0.0);
        if include_optional {
            required + self.optional.get(&resource).copied().unwrap_or(0.0)
        } else {
            required
        }
    }

    /// Every resource mentioned, with totals.
    pub fn totals(&self, include_optional: bool) -> BTreeMap<Resource, f64> {
        let mut totals = self.required.clone();
        if include_optional {
            for (resource, amount) in &self.optional {
                *totals.entry(*resource).or_insert(0.0) += amount;
            }
        }
        totals
    }

    /// Fold another manifest into this one.
    pub fn merge(&mut self, other: &Self) {
        for (resource, amount) in &other.required {
            self.add_resource(*resource, *amount, false);
        }
        for (resource, amount) in &other.optional {
            self.add_resource(*resource, *amount, true);
        }
    }

    /// Per-resource amounts that `store` cannot cover.
    pub fn shortfall(
        &self,
        store: &ResourceStore,
        include_optional: bool,
    ) -> BTreeMap<Resource, f64> {
        self.totals(include_optional)
            .into_iter()
            .filter_map(|(resource, needed)| {
                let missing = needed - store.get_amount_resource_stored(resource);
                (missing > 1e-6).then_some((resource, missing))
            })
            .collect()
    }

    /// Whether `store` covers the manifest.
    pub fn is_satisfied_by(&self, store: &ResourceStore, include_optional: bool) -> bool {
        self.shortfall(store, include_optional).is_empty()
    }

    /// Whether nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn optional_amounts_are_separate() {
        let mut manifest = Manifest::new();
        manifest.add_resource(Resource::Food, 10.0, false);
        manifest.add_resource(Resource::Food, 4.0, true);
        manifest.add_resource(Resource::Water, -3.0, false);
        assert!((manifest.amount(Resource::Food, false) - 10.0).abs() < 1e-12);
        assert!((manifest.amount(Resource::Food, true) - 14.0).abs() < 1e-12);
        assert!(manifest.amount(Resource::Water, true).abs() < 1e-12);
    }

    #[test]
    fn shortfall_reports_missing_part() {
        let mut manifest = Manifest::new();
        manifest.add_resource(Resource::Methanol, 50.0, false);
        manifest.add_resource(Resource::Oxygen, 75.0, false);
        let mut store = ResourceStore::new(1_000.0);
        store.store_amount_resource(Resource::Methanol, 80.0).unwrap();
        store.store_amount_resource(Resource::Oxygen, 25.0).unwrap();
        let short = manifest.shortfall(&store, false);
        assert_eq!(short.len(), 1);
        assert!((short.get(&Resource::Oxygen).copied().unwrap() - 50.0).abs() < 1e-9);
        assert!(!manifest.is_satisfied_by(&store, false));
    }
}
