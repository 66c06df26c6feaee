//! Learning Engine
//!
//! Keeps a bounded outcome history per agent and adapts that agent's
//! preferences from every recorded outcome. Recording and adapting happen
//! under a single write lock.

use market_events::{DecisionType, Outcome};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, trace};

use crate::config::LearningConfig;
use crate::preferences::Preferences;
use crate::strategy::StrategyKind;

/// Success rate reported for an agent with no history
pub const DEFAULT_SUCCESS_RATE: f64 = 0.5;

/// Summary mined from an agent's outcome history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPattern {
    /// Item with the highest summed profit, if any item made money
    pub most_profitable_item: Option<String>,
    /// Decision type with the best success rate
    pub most_successful_action: DecisionType,
    /// Market state label with the best success rate
    pub optimal_market_state: Option<String>,
    pub outcomes_analyzed: usize,
}

#[derive(Debug, Default)]
struct LearningState {
    outcomes: HashMap<String, VecDeque<Outcome>>,
    preferences: HashMap<String, Preferences>,
}

/// Outcome recorder and preference adapter shared by all agents.
#[derive(Debug, Default)]
pub struct LearningEngine {
    config: LearningConfig,
    state: RwLock<LearningState>,
}

impl LearningEngine {
    pub fn new(config: LearningConfig) -> Self {
        Self {
            config,
            state: RwLock::new(LearningState::default()),
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Appends `outcome` to the agent's history and adapts its preferences.
    pub fn record_outcome(&self, agent_id: &str, outcome: Outcome) {
        let mut state = self.state.write();

        let history = state.outcomes.entry(agent_id.to_string()).or_default();
        history.push_back(outcome.clone());
        while history.len() > self.config.history_limit {
            history.pop_front();
        }

        let preferences = state.preferences.entry(agent_id.to_string()).or_default();
        self.adapt(agent_id, preferences, &outcome);
    }

    fn adapt(&self, agent_id: &str, preferences: &mut Preferences, outcome: &Outcome) {
        let item_id = outcome.item_id();
        if !item_id.is_empty() {
            if outcome.success {
                preferences.reward_item(item_id, self.config.success_boost, 1.0);
            } else if preferences.penalize_item(
                item_id,
                self.config.failure_penalty,
                self.config.avoid_threshold,
            ) {
                debug!(agent = agent_id, item = item_id, "item moved to avoided");
            }
        }

        if !outcome.market_state.is_empty() {
            let step = if outcome.success {
                self.config.condition_step
            } else {
                -self.config.condition_step
            };
            preferences.adjust_market_condition(&outcome.market_state, step);
        }

        trace!(
            agent = agent_id,
            item = item_id,
            success = outcome.success,
            profit = outcome.profit,
            "outcome adapted"
        );
    }

    /// Credits or debits the strategy that produced a traded decision.
    pub fn reinforce_strategy(&self, agent_id: &str, strategy: StrategyKind, success: bool) {
        let step = if success {
            self.config.condition_step
        } else {
            -self.config.condition_step
        };
        let mut state = self.state.write();
        state
            .preferences
            .entry(agent_id.to_string())
            .or_default()
            .adjust_strategy(strategy, step);
    }

    /// Independent copy of the agent's learned preferences.
    pub fn preferences(&self, agent_id: &str) -> Preferences {
        self.state
            .read()
            .preferences
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Copy of the retained outcomes, oldest first.
    pub fn history(&self, agent_id: &str) -> Vec<Outcome> {
        self.state
            .read()
            .outcomes
            .get(agent_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn outcome_count(&self, agent_id: &str) -> usize {
        self.state.read().outcomes.get(agent_id).map_or(0, VecDeque::len)
    }

    pub fn success_rate(&self, agent_id: &str) -> f64 {
        let state = self.state.read();
        match state.outcomes.get(agent_id) {
            Some(history) if !history.is_empty() => {
                let successes = history.iter().filter(|o| o.success).count();
                successes as f64 / history.len() as f64
            }
            _ => DEFAULT_SUCCESS_RATE,
        }
    }

    pub fn average_profit(&self, agent_id: &str) -> f64 {
        let state = self.state.read();
        match state.outcomes.get(agent_id) {
            Some(history) if !history.is_empty() => {
                history.iter().map(|o| o.profit).sum::<f64>() / history.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Removes everything learned about an agent.
    pub fn forget(&self, agent_id: &str) {
        let mut state = self.state.write();
        state.outcomes.remove(agent_id);
        state.preferences.remove(agent_id);
    }

    /// Mines the agent's history. `None` below `min_pattern_outcomes`.
    ///
    /// Ties resolve to the lowest item id, the earliest decision type
    /// (buy, sell, hold) and the lowest market state label.
    pub fn analyze_patterns(&self, agent_id: &str) -> Option<TradingPattern> {
        let state = self.state.read();
        let history = state.outcomes.get(agent_id)?;
        if history.len() < self.config.min_pattern_outcomes {
            return None;
        }

        let mut item_profit: BTreeMap<&str, f64> = BTreeMap::new();
        let mut action_stats: BTreeMap<DecisionType, RateCounter> = BTreeMap::new();
        let mut condition_stats: BTreeMap<&str, RateCounter> = BTreeMap::new();

        for outcome in history {
            let item_id = outcome.item_id();
            if !item_id.is_empty() {
                *item_profit.entry(item_id).or_default() += outcome.profit;
            }
            action_stats
                .entry(outcome.decision.decision_type)
                .or_default()
                .record(outcome.success);
            if !outcome.market_state.is_empty() {
                condition_stats
                    .entry(outcome.market_state.as_str())
                    .or_default()
                    .record(outcome.success);
            }
        }

        let most_profitable_item = argmax(item_profit.into_iter()).map(str::to_string);
        let most_successful_action =
            argmax(action_stats.into_iter().map(|(action, counter)| (action, counter.rate())))
                .unwrap_or(DecisionType::Hold);
        let optimal_market_state =
            argmax(condition_stats.into_iter().map(|(label, counter)| (label, counter.rate())))
                .map(str::to_string);

        Some(TradingPattern {
            most_profitable_item,
            most_successful_action,
            optimal_market_state,
            outcomes_analyzed: history.len(),
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RateCounter {
    successes: u32,
    total: u32,
}

impl RateCounter {
    fn record(&mut self, success: bool) {
        self.total += 1;
        if success {
            self.successes += 1;
        }
    }

    fn rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successes as f64 / self.total as f64
    }
}

/// First key whose value is positive and strictly exceeds every earlier value.
fn argmax<K>(entries: impl Iterator<Item = (K, f64)>) -> Option<K> {
    let mut best: Option<K> = None;
    let mut best_value = 0.0;
    for (key, value) in entries {
        if value > best_value {
            best_value = value;
            best = Some(key);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_events::Decision;

    fn outcome(item: &str, profit: f64, success: bool) -> Outcome {
        Outcome::new(Decision::buy(item, 1, 10.0, 0.5, "test"), profit, success)
    }

    fn engine() -> LearningEngine {
        LearningEngine::new(LearningConfig::default())
    }

    #[test]
    fn test_defaults_without_history() {
        let engine = engine();
        assert_eq!(engine.success_rate("nobody"), 0.5);
        assert_eq!(engine.average_profit("nobody"), 0.0);
        assert_eq!(engine.outcome_count("nobody"), 0);
        assert!(engine.analyze_patterns("nobody").is_none());
        assert_eq!(engine.preferences("nobody"), Preferences::default());
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let engine = engine();
        for i in 0..101 {
            engine.record_outcome("m1", outcome("sword", i as f64, true).at(i));
        }
        let history = engine.history("m1");
        assert_eq!(history.len(), 100);
        assert_eq!(history[0].timestamp, 1);
        assert_eq!(history[99].timestamp, 100);
    }

    #[test]
    fn test_success_raises_and_caps_preference() {
        let engine = engine();
        engine.record_outcome("m1", outcome("sword", 50.0, true));
        let first = engine.preferences("m1").item_preference("sword");
        assert!(first > 0.0);

        for _ in 0..20 {
            engine.record_outcome("m1", outcome("sword", 50.0, true));
        }
        assert_eq!(engine.preferences("m1").item_preference("sword"), 1.0);
    }

    #[test]
    fn test_failures_migrate_to_avoided() {
        let engine = engine();
        for _ in 0..4 {
            engine.record_outcome("m1", outcome("potion", -5.0, false));
        }
        let prefs = engine.preferences("m1");
        assert!(prefs.preferred_items.contains_key("potion"));
        assert!(!prefs.avoided_items.contains_key("potion"));

        for _ in 0..2 {
            engine.record_outcome("m1", outcome("potion", -5.0, false));
        }
        let prefs = engine.preferences("m1");
        assert!(!prefs.preferred_items.contains_key("potion"));
        assert!(prefs.avoided_items["potion"] > 1.0);

        // a success afterwards clears the avoidance
        engine.record_outcome("m1", outcome("potion", 5.0, true));
        let prefs = engine.preferences("m1");
        assert!(!prefs.avoided_items.contains_key("potion"));
        assert!(prefs.preferred_items.contains_key("potion"));
    }

    #[test]
    fn test_failure_strictly_decreases_preference() {
        let engine = engine();
        engine.record_outcome("m1", outcome("gem", 10.0, true));
        let before = engine.preferences("m1").item_preference("gem");
        engine.record_outcome("m1", outcome("gem", -10.0, false));
        assert!(engine.preferences("m1").item_preference("gem") < before);
    }

    #[test]
    fn test_market_condition_scores() {
        let engine = engine();
        engine.record_outcome("m1", outcome("a", 1.0, true).with_market_state("bullish"));
        engine.record_outcome("m1", outcome("a", 1.0, true).with_market_state("bullish"));
        engine.record_outcome("m1", outcome("a", -1.0, false).with_market_state("bearish"));
        engine.record_outcome("m1", outcome("a", 1.0, true));

        let prefs = engine.preferences("m1");
        assert!((prefs.market_conditions["bullish"] - 0.1).abs() < 1e-12);
        assert!((prefs.market_conditions["bearish"] + 0.05).abs() < 1e-12);
        assert_eq!(prefs.market_conditions.len(), 2);
    }

    #[test]
    fn test_preferences_are_copies() {
        let engine = engine();
        engine.record_outcome("m1", outcome("sword", 1.0, true));
        let mut copy = engine.preferences("m1");
        copy.preferred_items.insert("fake".into(), 1.0);
        assert!(!engine.preferences("m1").preferred_items.contains_key("fake"));
    }

    #[test]
    fn test_rates() {
        let engine = engine();
        engine.record_outcome("m1", outcome("a", 30.0, true));
        engine.record_outcome("m1", outcome("a", -10.0, false));
        engine.record_outcome("m1", outcome("b", 10.0, true));
        engine.record_outcome("m1", outcome("b", 10.0, true));
        assert_eq!(engine.success_rate("m1"), 0.75);
        assert_eq!(engine.average_profit("m1"), 10.0);
    }

    #[test]
    fn test_patterns_need_ten_outcomes() {
        let engine = engine();
        for _ in 0..9 {
            engine.record_outcome("m1", outcome("a", 1.0, true));
        }
        assert!(engine.analyze_patterns("m1").is_none());
        engine.record_outcome("m1", outcome("a", 1.0, true));
        assert_eq!(engine.analyze_patterns("m1").unwrap().outcomes_analyzed, 10);
    }

    #[test]
    fn test_patterns() {
        let engine = engine();
        for _ in 0..4 {
            engine.record_outcome("m1", outcome("sword", 20.0, true).with_market_state("bullish"));
            engine.record_outcome("m1", outcome("potion", -5.0, false).with_market_state("bearish"));
        }
        let sell = Decision::sell("gem", 1, 100.0, 0.9, "test");
        engine.record_outcome("m1", Outcome::new(sell.clone(), 5.0, true).with_market_state("neutral"));
        engine.record_outcome("m1", Outcome::new(sell, 5.0, true).with_market_state("neutral"));

        let pattern = engine.analyze_patterns("m1").unwrap();
        assert_eq!(pattern.most_profitable_item.as_deref(), Some("sword"));
        // buy 4/8, sell 2/2
        assert_eq!(pattern.most_successful_action, DecisionType::Sell);
        // bullish and neutral both 1.0, lowest label wins
        assert_eq!(pattern.optimal_market_state.as_deref(), Some("bullish"));
    }

    #[test]
    fn test_pattern_ties_are_deterministic() {
        let engine = engine();
        for item in ["zeta", "alpha", "mid", "alpha", "zeta", "mid", "x", "x", "y", "y"] {
            engine.record_outcome("m1", outcome(item, 10.0, true));
        }
        let pattern = engine.analyze_patterns("m1").unwrap();
        assert_eq!(pattern.most_profitable_item.as_deref(), Some("alpha"));
        assert_eq!(pattern.most_successful_action, DecisionType::Buy);
        assert_eq!(pattern.optimal_market_state, None);
    }

    #[test]
    fn test_no_profitable_item() {
        let engine = engine();
        for _ in 0..10 {
            engine.record_outcome("m1", outcome("junk", -1.0, false));
        }
        let pattern = engine.analyze_patterns("m1").unwrap();
        assert_eq!(pattern.most_profitable_item, None);
        assert_eq!(pattern.most_successful_action, DecisionType::Hold);
        assert_eq!(pattern.optimal_market_state, None);
    }

    #[test]
    fn test_failed_state_is_never_optimal() {
        let engine = engine();
        for _ in 0..10 {
            engine.record_outcome("m1", outcome("junk", -1.0, false).with_market_state("bearish"));
        }
        engine.record_outcome("m1", outcome("gem", 4.0, true).with_market_state("bullish"));

        let pattern = engine.analyze_patterns("m1").unwrap();
        assert_eq!(pattern.most_successful_action, DecisionType::Buy);
        assert_eq!(pattern.optimal_market_state.as_deref(), Some("bullish"));
        assert_eq!(pattern.most_profitable_item.as_deref(), Some("gem"));
    }

    #[test]
    fn test_reinforce_strategy() {
        let engine = engine();
        engine.reinforce_strategy("m1", StrategyKind::Momentum, true);
        engine.reinforce_strategy("m1", StrategyKind::Value, false);
        let prefs = engine.preferences("m1");
        assert_eq!(prefs.strategy_for_market("anything"), Some(StrategyKind::Momentum));
    }

    #[test]
    fn test_concurrent_recording() {
        let engine = engine();
        std::thread::scope(|scope| {
            for t in 0..4 {
                let engine = &engine;
                scope.spawn(move || {
                    for i in 0..50 {
                        engine.record_outcome("shared", outcome("a", 1.0, true).at(t * 100 + i));
                    }
                });
            }
        });
        assert_eq!(engine.outcome_count("shared"), 100);
        assert_eq!(engine.preferences("shared").item_preference("a"), 1.0);
    }

    #[test]
    fn test_forget() {
        let engine = engine();
        engine.record_outcome("m1", outcome("a", 1.0, true));
        engine.forget("m1");
        assert_eq!(engine.outcome_count("m1"), 0);
        assert_eq!(engine.preferences("m1"), Preferences::default());
    }
}
