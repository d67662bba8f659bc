//! Trade planning: which goods to sell where, and what it would earn.
//!
//! Profit toward each destination is derived from the prior-tick snapshot
//! and cached on the settlement for
//! [`DecisionConfig::trade_cache_millisols`](crate::config::DecisionConfig).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use habitat_types::{Resource, SettlementId};
use habitat_world::snapshot::good_value;
use habitat_world::vehicle::DEFAULT_FUEL_ECONOMY;
use habitat_world::{Cached, ColonySnapshot, Settlement, SettlementSummary};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::config::AgentConfig;

/// Resources a settlement never sells.
const RESERVED: [Resource; 4] = [
    Resource::Oxygen,
    Resource::Water,
    Resource::Food,
    Resource::Methanol,
];

/// Goods worth carrying from `settlement` to `buyer`, most profitable first.
pub fn plan_goods(
    settlement: &Settlement,
    buyer: &SettlementSummary,
    config: &AgentConfig,
) -> BTreeMap<Resource, f64> {
    let mut offers: Vec<(Resource, f64, f64)> = Resource::ALL
        .iter()
        .filter(|resource| !RESERVED.contains(resource))
        .filter_map(|resource| {
            let stored = settlement.store.get_amount_resource_stored(*resource);
            let surplus = stored - resource.target_stock();
            let gain = buyer.value_of(*resource) - good_value(*resource, stored);
            (surplus > 0.0 && gain > 0.0).then_some((*resource, surplus, gain))
        })
        .collect();
    offers.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));

    let mut room = config.mission.trade_load_kg;
    let mut goods = BTreeMap::new();
    for (resource, surplus, _) in offers {
        if room <= 0.0 {
            break;
        }
        let amount = surplus.min(room);
        room -= amount;
        goods.insert(resource, amount);
    }
    goods
}

/// Sale value of `goods` at `buyer`.
pub fn sale_value(goods: &BTreeMap<Resource, f64>, buyer: &SettlementSummary) -> f64 {
    goods
        .iter()
        .map(|(resource, amount)| amount * buyer.value_of(*resource))
        .sum()
}

/// Convert a sale value to credits, rounded to cents.
pub fn to_credits(value: f64) -> Decimal {
    Decimal::from_f64(value.max(0.0))
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

/// Expected profit of one round trip to `buyer`.
pub fn estimate_profit(
    settlement: &Settlement,
    buyer: &SettlementSummary,
    config: &AgentConfig,
) -> f64 {
    let goods = plan_goods(settlement, buyer, config);
    if goods.is_empty() {
        return 0.0;
    }
    let revenue = sale_value(&goods, buyer);
    let cost: f64 = goods
        .iter()
        .map(|(resource, amount)| {
            amount * good_value(*resource, settlement.store.get_amount_resource_stored(*resource))
        })
        .sum();
    let round_trip = 2.0 * settlement.location.distance_to(buyer.location);
    let fuel = round_trip / DEFAULT_FUEL_ECONOMY;
    let fuel_cost = fuel
        * (good_value(
            Resource::Methanol,
            settlement.store.get_amount_resource_stored(Resource::Methanol),
        ) + config.mission.oxidizer_ratio
            * good_value(
                Resource::Oxygen,
                settlement.store.get_amount_resource_stored(Resource::Oxygen),
            ));
    revenue - cost - fuel_cost
}

/// Recompute stale trade profits for every other settlement in the snapshot.
pub fn refresh_trade_cache(
    settlement: &mut Settlement,
    snapshot: &ColonySnapshot,
    now: f64,
    config: &AgentConfig,
) {
    let ttl = config.decision.trade_cache_millisols;
    let own = settlement.id;
    settlement
        .decision_cache
        .trade_profit
        .retain(|id, _| snapshot.settlements.contains_key(id));
    for (id, summary) in snapshot.settlements.iter().filter(|(id, _)| **id != own) {
        let fresh = settlement
            .decision_cache
            .trade_profit
            .get(id)
            .is_some_and(|cached| cached.is_fresh(now));
        if !fresh {
            let profit = estimate_profit(settlement, summary, config);
            settlement
                .decision_cache
                .trade_profit
                .insert(*id, Cached::new(profit, now, ttl));
        }
    }
}

/// The destination with the highest positive cached profit.
pub fn best_destination(settlement: &Settlement) -> Option<(SettlementId, f64)> {
    settlement
        .decision_cache
        .trade_profit
        .iter()
        .map(|(id, cached)| (*id, *cached.value()))
        .filter(|(_, profit)| *profit > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::Coordinates;

    use super::*;

    fn pair() -> (Settlement, Settlement) {
        let mut seller = Settlement::new("Seller", Coordinates::new(0.0, 0.0), 1);
        seller
            .store
            .store_amount_resource(Resource::SpareParts, 2_000.0)
            .unwrap();
        let buyer = Settlement::new("Buyer", Coordinates::new(100.0, 0.0), 2);
        (seller, buyer)
    }

    #[test]
    fn plans_surplus_only() {
        let (seller, buyer) = pair();
        let summary = SettlementSummary::of(&buyer);
        let config = AgentConfig::default();
        let goods = plan_goods(&seller, &summary, &config);
        assert_eq!(goods.len(), 1);
        let parts = goods.get(&Resource::SpareParts).copied().unwrap();
        assert!((parts - config.mission.trade_load_kg).abs() < 1e-9);
    }

    #[test]
    fn cache_picks_profitable_destination() {
        let (mut seller, buyer) = pair();
        let snapshot = ColonySnapshot::capture(1, [&seller, &buyer]);
        let config = AgentConfig::default();
        refresh_trade_cache(&mut seller, &snapshot, 0.0, &config);
        let (destination, profit) = best_destination(&seller).unwrap();
        assert_eq!(destination, buyer.id);
        assert!(profit > 0.0);
        assert!(!seller.decision_cache.trade_profit.contains_key(&seller.id));
    }

    #[test]
    fn credits_round_to_cents() {
        assert_eq!(to_credits(12.345_6).to_string(), "12.35");
        assert_eq!(to_credits(-3.0), Decimal::ZERO);
    }
}
