//! Trading Strategies
//!
//! Interchangeable evaluators that turn a market snapshot into one candidate
//! decision. Every strategy returns a decision; `Hold` is the fallback when
//! nothing qualifies.
//!
//! - [`ValueStrategy`]: buy below base price, sell above it
//! - [`MomentumStrategy`]: follow the latest price move
//! - [`SeasonalStrategy`]: trade on season tags and categories

mod momentum;
mod seasonal;
mod value;

pub use momentum::MomentumStrategy;
pub use seasonal::{seasonal_score, SeasonalStrategy};
pub use value::ValueStrategy;

use market_events::{Decision, MarketSnapshot, TemporalContext};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::Agent;

/// Confidence of the hold returned for an empty snapshot
pub const NO_DATA_CONFIDENCE: f64 = 0.5;
/// Confidence of the hold returned when no item qualifies
pub const NO_OPPORTUNITY_CONFIDENCE: f64 = 0.3;

/// Enumerated strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Value,
    Momentum,
    Seasonal,
}

impl StrategyKind {
    pub fn all() -> &'static [StrategyKind] {
        &[StrategyKind::Value, StrategyKind::Momentum, StrategyKind::Seasonal]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Value => "value",
            StrategyKind::Momentum => "momentum",
            StrategyKind::Seasonal => "seasonal",
        }
    }

    /// Builds the stock implementation for this kind.
    pub fn build(&self) -> Box<dyn TradingStrategy> {
        match self {
            StrategyKind::Value => Box::new(ValueStrategy),
            StrategyKind::Momentum => Box::new(MomentumStrategy),
            StrategyKind::Seasonal => Box::new(SeasonalStrategy),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A pure market evaluator.
pub trait TradingStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Evaluates `snapshot` for `agent`. Never fails; confidence is in [0, 1]
    /// and quantities are never negative.
    fn evaluate(&self, agent: &Agent, snapshot: &MarketSnapshot, context: &TemporalContext)
        -> Decision;
}

/// Highest-scoring opportunity seen so far in a scan.
///
/// Only strictly better scores replace the current pick, so the earliest item
/// in snapshot order wins ties and a score must be positive to count.
#[derive(Debug, Default)]
pub(crate) struct BestOpportunity {
    score: f64,
    decision: Option<Decision>,
}

impl BestOpportunity {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn offer(&mut self, score: f64, build: impl FnOnce() -> Decision) {
        if score > self.score {
            self.score = score;
            self.decision = Some(build());
        }
    }

    pub(crate) fn into_decision(self, fallback_reason: &str) -> Decision {
        self.decision
            .unwrap_or_else(|| Decision::hold(NO_OPPORTUNITY_CONFIDENCE, fallback_reason))
    }
}

pub(crate) fn no_data() -> Decision {
    Decision::hold(NO_DATA_CONFIDENCE, "No market data available")
}

/// Saturating conversion from a unit count to a decision quantity.
pub(crate) fn to_quantity(units: u64) -> u32 {
    u32::try_from(units).unwrap_or(u32::MAX)
}
