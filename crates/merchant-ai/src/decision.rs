//! Decision Engine
//!
//! Reads the overall market mood, picks a strategy for the agent's
//! personality, and applies personality modifiers to the result. Also scans a
//! snapshot item by item for multi-decision turns.

use market_events::{clamp_unit, Decision, ItemQuote, MarketSnapshot, TemporalContext};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

use crate::agent::Agent;
use crate::config::DecisionConfig;
use crate::personality::{Archetype, Personality};
use crate::strategy::{StrategyKind, TradingStrategy, ValueStrategy};

/// Market mood thresholds
pub mod thresholds {
    /// Scores above this are bullish
    pub const BULLISH: f64 = 0.7;
    /// Scores below this are bearish
    pub const BEARISH: f64 = 0.3;
    /// Score reported for an empty market
    pub const NEUTRAL_SCORE: f64 = 0.5;
    /// Discount required by a fully risk-averse agent
    pub const BASE_REQUIRED_DISCOUNT: f64 = 0.1;
    /// Widest confidence jitter honoured from tuning
    pub const MAX_JITTER: f64 = 1.0;
}

/// Classified market mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCondition {
    Bullish,
    Neutral,
    Bearish,
}

impl MarketCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketCondition::Bullish => "bullish",
            MarketCondition::Neutral => "neutral",
            MarketCondition::Bearish => "bearish",
        }
    }
}

impl fmt::Display for MarketCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything `decide` worked out along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub market_score: f64,
    pub condition: MarketCondition,
    pub strategy: StrategyKind,
    pub decision: Decision,
}

/// Fallback used when a selected strategy is not registered
static FALLBACK_STRATEGY: ValueStrategy = ValueStrategy;

/// Strategy dispatcher and multi-item scanner.
pub struct DecisionEngine {
    strategies: BTreeMap<StrategyKind, Box<dyn TradingStrategy>>,
    config: DecisionConfig,
}

impl fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DecisionConfig::default())
    }
}

impl DecisionEngine {
    /// Creates an engine with all stock strategies registered.
    pub fn new(config: DecisionConfig) -> Self {
        let strategies = StrategyKind::all()
            .iter()
            .map(|kind| (*kind, kind.build()))
            .collect();
        Self { strategies, config }
    }

    /// Creates an engine with no strategies; every dispatch falls back to value.
    pub fn empty(config: DecisionConfig) -> Self {
        Self {
            strategies: BTreeMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Registers (or replaces) the implementation for its kind.
    pub fn register(&mut self, strategy: Box<dyn TradingStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    pub fn unregister(&mut self, kind: StrategyKind) -> bool {
        self.strategies.remove(&kind).is_some()
    }

    pub fn is_registered(&self, kind: StrategyKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    fn strategy(&self, kind: StrategyKind) -> &dyn TradingStrategy {
        self.strategies
            .get(&kind)
            .map(|s| s.as_ref())
            .unwrap_or(&FALLBACK_STRATEGY)
    }

    /// Mean per-item score of (price ratio + demand pressure) / 2, each item
    /// clamped to [0, 1]. 0.5 for an empty snapshot.
    pub fn evaluate_market(&self, snapshot: &MarketSnapshot) -> f64 {
        if snapshot.is_empty() {
            return thresholds::NEUTRAL_SCORE;
        }

        let total: f64 = snapshot
            .iter()
            .map(|quote| clamp_unit((quote.price_ratio() + quote.demand_pressure()) / 2.0))
            .sum();
        total / snapshot.len() as f64
    }

    pub fn classify(score: f64) -> MarketCondition {
        if score > thresholds::BULLISH {
            MarketCondition::Bullish
        } else if score < thresholds::BEARISH {
            MarketCondition::Bearish
        } else {
            MarketCondition::Neutral
        }
    }

    /// Strategy for a personality under a market condition.
    ///
    /// Balanced (and custom) personalities use seasonal only while it is
    /// registered.
    pub fn select_strategy(
        &self,
        personality: &dyn Personality,
        condition: MarketCondition,
    ) -> StrategyKind {
        let selected = match personality.archetype() {
            Archetype::Aggressive => {
                if condition == MarketCondition::Bullish {
                    StrategyKind::Momentum
                } else {
                    StrategyKind::Value
                }
            }
            Archetype::Conservative => StrategyKind::Value,
            Archetype::Opportunistic => {
                if condition == MarketCondition::Bearish {
                    StrategyKind::Value
                } else {
                    StrategyKind::Momentum
                }
            }
            Archetype::Balanced | Archetype::Custom => {
                if self.is_registered(StrategyKind::Seasonal) {
                    StrategyKind::Seasonal
                } else {
                    StrategyKind::Value
                }
            }
        };

        if self.is_registered(selected) {
            selected
        } else {
            StrategyKind::Value
        }
    }

    /// Full single-decision pipeline, keeping the intermediate results.
    pub fn plan(&self, agent: &Agent, snapshot: &MarketSnapshot, context: &TemporalContext) -> Plan {
        let market_score = self.evaluate_market(snapshot);
        let condition = Self::classify(market_score);
        let strategy = self.select_strategy(agent.personality(), condition);

        let raw = self.strategy(strategy).evaluate(agent, snapshot, context);
        let decision = apply_personality_modifiers(raw, agent.personality());

        debug!(
            agent = agent.id(),
            %condition,
            %strategy,
            decision = %decision.decision_type,
            item = decision.item_id.as_str(),
            "agent decided"
        );

        Plan {
            market_score,
            condition,
            strategy,
            decision,
        }
    }

    /// evaluate -> classify -> select -> evaluate strategy -> modifiers.
    pub fn decide(&self, agent: &Agent, snapshot: &MarketSnapshot, context: &TemporalContext) -> Decision {
        self.plan(agent, snapshot, context).decision
    }

    /// Scans items in snapshot order, at most `max_decisions` results.
    ///
    /// Sell eligibility is tested before buy eligibility for each item. Results
    /// keep snapshot order. Confidence jitter draws from `rng`.
    pub fn decide_many<R: Rng + ?Sized>(
        &self,
        agent: &Agent,
        snapshot: &MarketSnapshot,
        max_decisions: usize,
        rng: &mut R,
    ) -> Vec<Decision> {
        let personality = agent.personality();
        let mut decisions = Vec::with_capacity(max_decisions.min(snapshot.len()));

        for quote in snapshot.iter() {
            if decisions.len() >= max_decisions {
                break;
            }
            if !quote.is_tradeable() || quote.base_price <= 0.0 {
                trace!(item = quote.item_id.as_str(), "skipping unpriced item");
                continue;
            }

            let funds = agent.funds();
            if should_sell(personality, quote) {
                decisions.push(Decision::sell(
                    &quote.item_id,
                    sell_quantity(personality),
                    quote.current_price,
                    self.scan_confidence(personality, quote, rng),
                    "High profit margin",
                ));
            } else if should_buy(personality, quote, funds) {
                decisions.push(Decision::buy(
                    &quote.item_id,
                    buy_quantity(personality, quote, funds),
                    quote.current_price,
                    self.scan_confidence(personality, quote, rng),
                    "Good value opportunity",
                ));
            }
        }

        decisions
    }

    fn scan_confidence<R: Rng + ?Sized>(
        &self,
        personality: &dyn Personality,
        quote: &ItemQuote,
        rng: &mut R,
    ) -> f64 {
        let volatility_factor = 1.0 - quote.volatility;
        let price_factor = 1.0 - (1.0 - quote.price_ratio()).abs();
        let base = (volatility_factor + price_factor) / 2.0 * personality.trading_frequency();

        let spread = if self.config.jitter.is_finite() {
            self.config.jitter.abs().min(thresholds::MAX_JITTER)
        } else {
            0.0
        };
        let jitter = if spread > 0.0 {
            rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        clamp_unit(base + jitter)
    }
}

/// quantity * (0.5 + risk), rounded; confidence * frequency, clamped.
pub fn apply_personality_modifiers(mut decision: Decision, personality: &dyn Personality) -> Decision {
    let scaled = decision.quantity as f64 * (0.5 + personality.risk_tolerance());
    decision.quantity = scaled.round().max(0.0) as u32;
    decision.set_confidence(decision.confidence * personality.trading_frequency());
    decision
}

fn should_sell(personality: &dyn Personality, quote: &ItemQuote) -> bool {
    let profit_margin = (quote.current_price - quote.base_price) / quote.base_price;
    profit_margin >= personality.profit_margin_target()
}

fn should_buy(personality: &dyn Personality, quote: &ItemQuote, funds: u64) -> bool {
    if quote.affordable_units(funds) < 1 {
        return false;
    }
    let discount = (quote.base_price - quote.current_price) / quote.base_price;
    let required = thresholds::BASE_REQUIRED_DISCOUNT * (1.0 - personality.risk_tolerance());
    discount >= required
}

fn buy_quantity(personality: &dyn Personality, quote: &ItemQuote, funds: u64) -> u32 {
    let affordable = quote.affordable_units(funds);
    let quantity = (affordable as f64 * personality.risk_tolerance() * 0.3) as u64;
    u32::try_from(quantity.max(1)).unwrap_or(u32::MAX)
}

fn sell_quantity(personality: &dyn Personality) -> u32 {
    match personality.archetype() {
        Archetype::Aggressive => 10,
        Archetype::Conservative => 2,
        _ => 5,
    }
}
