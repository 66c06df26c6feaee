//! Decision and Outcome Types
//!
//! A `Decision` is what an agent proposes; an `Outcome` is what the execution
//! layer reports back once the trade has been settled.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of trading action.
///
/// Declaration order doubles as the tie-break order when ranking actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionType::Buy => write!(f, "buy"),
            DecisionType::Sell => write!(f, "sell"),
            DecisionType::Hold => write!(f, "hold"),
        }
    }
}

/// A proposed trade. Confidence is always within [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision_type: DecisionType,
    /// Empty for holds
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub price: f64,
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
}

impl Decision {
    pub fn hold(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            decision_type: DecisionType::Hold,
            item_id: String::new(),
            quantity: 0,
            price: 0.0,
            confidence: clamp_unit(confidence),
            reason: reason.into(),
        }
    }

    pub fn buy(
        item_id: impl Into<String>,
        quantity: u32,
        price: f64,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            decision_type: DecisionType::Buy,
            item_id: item_id.into(),
            quantity,
            price,
            confidence: clamp_unit(confidence),
            reason: reason.into(),
        }
    }

    pub fn sell(
        item_id: impl Into<String>,
        quantity: u32,
        price: f64,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            decision_type: DecisionType::Sell,
            item_id: item_id.into(),
            quantity,
            price,
            confidence: clamp_unit(confidence),
            reason: reason.into(),
        }
    }

    pub fn is_hold(&self) -> bool {
        self.decision_type == DecisionType::Hold
    }

    /// Replaces the confidence, clamped to [0, 1].
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = clamp_unit(confidence);
    }
}

/// Clamp to [0, 1], mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The realized result of an executed decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub decision: Decision,
    pub profit: f64,
    pub success: bool,
    /// May be empty
    #[serde(default)]
    pub market_state: String,
    #[serde(default)]
    pub timestamp: u64,
}

impl Outcome {
    pub fn new(decision: Decision, profit: f64, success: bool) -> Self {
        Self {
            decision,
            profit,
            success,
            market_state: String::new(),
            timestamp: 0,
        }
    }

    pub fn with_market_state(mut self, state: impl Into<String>) -> Self {
        self.market_state = state.into();
        self
    }

    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn item_id(&self) -> &str {
        &self.decision.item_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_clamp_confidence() {
        assert_eq!(Decision::buy("a", 1, 1.0, 3.0, "").confidence, 1.0);
        assert_eq!(Decision::sell("a", 1, 1.0, -0.5, "").confidence, 0.0);
        assert_eq!(Decision::hold(f64::NAN, "").confidence, 0.0);
    }

    #[test]
    fn test_hold_has_no_item() {
        let hold = Decision::hold(0.3, "nothing to do");
        assert!(hold.is_hold());
        assert!(hold.item_id.is_empty());
        assert_eq!(hold.quantity, 0);
    }

    #[test]
    fn test_decision_type_ordering() {
        assert!(DecisionType::Buy < DecisionType::Sell);
        assert!(DecisionType::Sell < DecisionType::Hold);
    }

    #[test]
    fn test_outcome_serde() {
        let outcome = Outcome::new(Decision::buy("sword", 2, 50.0, 0.7, "cheap"), 12.5, true)
            .with_market_state("bullish")
            .at(42);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"decision_type\":\"buy\""));
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.item_id(), "sword");
        assert_eq!(back.timestamp, 42);
    }
}
