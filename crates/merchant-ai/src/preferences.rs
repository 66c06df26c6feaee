//! Learned Trading Preferences
//!
//! Item, strategy and market-condition affinities. An item id lives in at most
//! one of `preferred_items` / `avoided_items` at any time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::strategy::StrategyKind;

/// An agent's learned affinities. Ordered maps keep iteration deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// item id -> preference score (may go negative before migrating)
    pub preferred_items: BTreeMap<String, f64>,
    /// item id -> avoidance magnitude (positive)
    pub avoided_items: BTreeMap<String, f64>,
    pub preferred_strategies: BTreeMap<StrategyKind, f64>,
    /// market state label -> preference score
    pub market_conditions: BTreeMap<String, f64>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preferred score, negated avoidance, or 0 for unknown items.
    pub fn item_preference(&self, item_id: &str) -> f64 {
        if let Some(score) = self.preferred_items.get(item_id) {
            return *score;
        }
        if let Some(avoid) = self.avoided_items.get(item_id) {
            return -avoid;
        }
        0.0
    }

    pub fn is_avoided(&self, item_id: &str) -> bool {
        self.avoided_items.contains_key(item_id)
    }

    /// Raises an item's score by `boost` (capped at `cap`) and clears any avoidance.
    pub fn reward_item(&mut self, item_id: &str, boost: f64, cap: f64) {
        self.avoided_items.remove(item_id);
        let score = self.preferred_items.entry(item_id.to_string()).or_insert(0.0);
        *score = (*score + boost).min(cap);
    }

    /// Lowers an item's score by `penalty`. Once the score drops below
    /// `avoid_threshold` the magnitude moves to `avoided_items`.
    /// An already-avoided item has its avoidance deepened instead.
    ///
    /// Returns true when this call migrated the item.
    pub fn penalize_item(&mut self, item_id: &str, penalty: f64, avoid_threshold: f64) -> bool {
        if let Some(avoid) = self.avoided_items.get_mut(item_id) {
            *avoid += penalty;
            return false;
        }

        let score = self.preferred_items.entry(item_id.to_string()).or_insert(0.0);
        *score -= penalty;
        if *score < avoid_threshold {
            let magnitude = -*score;
            self.preferred_items.remove(item_id);
            self.avoided_items.insert(item_id.to_string(), magnitude);
            return true;
        }
        false
    }

    pub fn adjust_market_condition(&mut self, state: &str, delta: f64) {
        *self.market_conditions.entry(state.to_string()).or_insert(0.0) += delta;
    }

    pub fn adjust_strategy(&mut self, strategy: StrategyKind, delta: f64) {
        *self.preferred_strategies.entry(strategy).or_insert(0.0) += delta;
    }

    /// Strategy the agent has learned to favour for `market_state`.
    ///
    /// With no recorded strategy scores, "volatile" markets suggest momentum,
    /// "stable" ones value, anything else has no preference. Otherwise the
    /// highest positive score wins; ties resolve to the earlier kind.
    pub fn strategy_for_market(&self, market_state: &str) -> Option<StrategyKind> {
        if self.preferred_strategies.is_empty() {
            return match market_state {
                "volatile" => Some(StrategyKind::Momentum),
                "stable" => Some(StrategyKind::Value),
                _ => None,
            };
        }

        let mut best: Option<(StrategyKind, f64)> = None;
        for (kind, score) in &self.preferred_strategies {
            if *score > best.map_or(0.0, |(_, s)| s) {
                best = Some((*kind, *score));
            }
        }
        best.map(|(kind, _)| kind)
    }
}
