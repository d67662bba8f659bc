//! The read-only colony snapshot shared by all work units during a pulse.
//!
//! Built by the dispatcher after every join barrier. During pulse `N` each
//! settlement reads other settlements only through the snapshot taken at
//! the end of pulse `N - 1`, so reads are consistent and race-free.

use std::collections::BTreeMap;

use habitat_types::{Coordinates, Resource, SettlementId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::settlement::Settlement;

/// What other settlements may know about one settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementSummary {
    /// Display name.
    pub name: String,
    /// Surface position.
    pub location: Coordinates,
    /// Number of people.
    pub population: u32,
    /// Stored kilograms per resource.
    pub stock: BTreeMap<Resource, f64>,
    /// Value per kilogram the settlement would pay for each resource.
    pub good_values: BTreeMap<Resource, f64>,
    /// Trade credits.
    pub credits: Decimal,
}

/// Value per kilogram of `resource` given the current stock.
///
/// Scarce goods approach twice the base value; plentiful goods approach zero.
pub fn good_value(resource: Resource, stock: f64) -> f64 {
    2.0 * resource.base_value() / (1.0 + stock.max(0.0) / resource.target_stock())
}

impl SettlementSummary {
    /// Summarize a settlement.
    pub fn of(settlement: &Settlement) -> Self {
        let stock = settlement.store.amounts();
        let good_values = Resource::ALL
            .iter()
            .map(|resource| {
                let held = stock.get(resource).copied().unwrap_or(0.0);
                (*resource, good_value(*resource, held))
            })
            .collect();
        Self {
            name: settlement.name.clone(),
            location: settlement.location,
            population: settlement.population(),
            stock,
            good_values,
            credits: settlement.credits,
        }
    }

    /// Value of `resource` to this settlement (0 when unknown).
    pub fn value_of(&self, resource: Resource) -> f64 {
        self.good_values.get(&resource).copied().unwrap_or(0.0)
    }
}

/// Summaries of every settlement as of the end of a pulse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColonySnapshot {
    /// Pulse at whose barrier the snapshot was taken (0 before the first pulse).
    pub pulse_id: u64,
    /// Per-settlement summaries.
    pub settlements: BTreeMap<SettlementId, SettlementSummary>,
}

impl ColonySnapshot {
    /// Capture a snapshot from live settlements.
    pub fn capture<'a>(
        pulse_id: u64,
        settlements: impl IntoIterator<Item = &'a Settlement>,
    ) -> Self {
        Self {
            pulse_id,
            settlements: settlements
                .into_iter()
                .map(|settlement| (settlement.id, SettlementSummary::of(settlement)))
                .collect(),
        }
    }

    /// Summary of one settlement.
    pub fn get(&self, id: SettlementId) -> Option<&SettlementSummary> {
        self.settlements.get(&id)
    }

    /// The settlement closest to `from`, including the caller's own.
    pub fn nearest_settlement(
        &self,
        from: Coordinates,
    ) -> Option<(SettlementId, &SettlementSummary)> {
        self.settlements
            .iter()
            .min_by(|(_, a), (_, b)| {
                from.distance_to(a.location)
                    .total_cmp(&from.distance_to(b.location))
            })
            .map(|(id, summary)| (*id, summary))
    }
}
