//! Trading Agents
//!
//! An agent is created once and lives for the whole simulation. Its identity
//! and personality are immutable; funds, reputation, statistics and local
//! preferences sit behind a read/write lock so the execution layer and the
//! decision layer can share it across threads.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::personality::{Archetype, Personality};
use crate::preferences::Preferences;

/// Reputation is kept within [-REPUTATION_LIMIT, REPUTATION_LIMIT].
pub const REPUTATION_LIMIT: f64 = 100.0;

/// Number of trade records retained per agent.
pub const TRADE_HISTORY_LIMIT: usize = 100;

/// A single settled trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub item_id: String,
    pub quantity: u32,
    pub buy_price: f64,
    pub sell_price: f64,
    pub profit: f64,
    pub timestamp: u64,
}

/// Running performance figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingStatistics {
    pub total_trades: u64,
    pub profitable_trades: u64,
    pub total_profit: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    /// Newest last
    pub history: VecDeque<TradeRecord>,
}

impl TradingStatistics {
    /// Fraction of trades that made a profit, 0 with no trades.
    pub fn success_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        self.profitable_trades as f64 / self.total_trades as f64
    }

    fn record(&mut self, record: TradeRecord) {
        self.total_trades += 1;
        self.total_profit += record.profit;
        if record.profit > 0.0 {
            self.profitable_trades += 1;
        }
        self.best_trade = self.best_trade.max(record.profit);
        self.worst_trade = self.worst_trade.min(record.profit);

        self.history.push_back(record);
        while self.history.len() > TRADE_HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
}

#[derive(Debug, Default)]
struct AgentState {
    funds: u64,
    reputation: f64,
    stats: TradingStatistics,
    preferences: Preferences,
}

/// A simulated trading participant.
#[derive(Debug)]
pub struct Agent {
    id: String,
    name: String,
    personality: Arc<dyn Personality>,
    state: RwLock<AgentState>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        funds: u64,
        personality: Arc<dyn Personality>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            personality,
            state: RwLock::new(AgentState {
                funds,
                ..Default::default()
            }),
        }
    }

    /// Creates an agent using one of the built-in profiles.
    pub fn with_archetype(
        id: impl Into<String>,
        name: impl Into<String>,
        funds: u64,
        archetype: Archetype,
    ) -> Self {
        Self::new(id, name, funds, Arc::new(*archetype.profile()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn personality(&self) -> &dyn Personality {
        self.personality.as_ref()
    }

    pub fn funds(&self) -> u64 {
        self.state.read().funds
    }

    pub fn set_funds(&self, amount: u64) {
        self.state.write().funds = amount;
    }

    pub fn add_funds(&self, amount: u64) {
        let mut state = self.state.write();
        state.funds = state.funds.saturating_add(amount);
    }

    /// Withdraws `amount` if the agent can cover it. Never overdraws.
    pub fn remove_funds(&self, amount: u64) -> bool {
        let mut state = self.state.write();
        if state.funds >= amount {
            state.funds -= amount;
            true
        } else {
            false
        }
    }

    pub fn reputation(&self) -> f64 {
        self.state.read().reputation
    }

    pub fn set_reputation(&self, reputation: f64) {
        self.state.write().reputation = clamp_reputation(reputation);
    }

    pub fn adjust_reputation(&self, delta: f64) {
        let mut state = self.state.write();
        state.reputation = clamp_reputation(state.reputation + delta);
    }

    /// Copy of the current statistics.
    pub fn trading_stats(&self) -> TradingStatistics {
        self.state.read().stats.clone()
    }

    pub fn record_trade(&self, record: TradeRecord) {
        self.state.write().stats.record(record);
    }

    /// Copy of the agent-local preferences.
    pub fn preferences(&self) -> Preferences {
        self.state.read().preferences.clone()
    }

    /// Nudges the local item preference after a trade: +0.1 on profit,
    /// -0.1 otherwise, moving the item to avoided below -1.0.
    pub fn update_preferences(&self, item_id: &str, profit: f64) {
        let mut state = self.state.write();
        if profit > 0.0 {
            state.preferences.reward_item(item_id, 0.1, f64::INFINITY);
        } else {
            state.preferences.penalize_item(item_id, 0.1, -1.0);
        }
    }
}

fn clamp_reputation(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-REPUTATION_LIMIT, REPUTATION_LIMIT)
}
