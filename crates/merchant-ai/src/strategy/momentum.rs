use market_events::{Decision, MarketSnapshot, TemporalContext};

use super::{no_data, to_quantity, BestOpportunity, StrategyKind, TradingStrategy};
use crate::agent::Agent;

/// Minimum absolute momentum that triggers a trade
pub const MOMENTUM_THRESHOLD: f64 = 0.1;
pub const SELL_QUANTITY: u32 = 10;

/// Follows the most recent price move.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumStrategy;

impl TradingStrategy for MomentumStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Momentum
    }

    fn evaluate(&self, agent: &Agent, snapshot: &MarketSnapshot, _context: &TemporalContext) -> Decision {
        if snapshot.is_empty() {
            return no_data();
        }

        let funds = agent.funds();
        let mut best = BestOpportunity::new();

        for quote in snapshot.iter().filter(|q| q.is_tradeable()) {
            let Some(momentum) = quote.momentum() else {
                continue;
            };

            if momentum > MOMENTUM_THRESHOLD {
                let affordable = quote.affordable_units(funds);
                if affordable >= 1 {
                    best.offer(momentum, || {
                        Decision::buy(
                            &quote.item_id,
                            momentum_quantity(affordable, momentum),
                            quote.current_price,
                            momentum * 2.0,
                            "Strong upward price momentum",
                        )
                    });
                }
            } else if momentum < -MOMENTUM_THRESHOLD {
                let strength = -momentum;
                best.offer(strength, || {
                    Decision::sell(
                        &quote.item_id,
                        SELL_QUANTITY,
                        quote.current_price,
                        strength * 2.0,
                        "Strong downward price momentum",
                    )
                });
            }
        }

        best.into_decision("No strong momentum detected")
    }
}

/// affordable * momentum * 2, capped at half of affordable, at least 1.
fn momentum_quantity(affordable: u64, momentum: f64) -> u32 {
    let raw = (affordable as f64 * momentum * 2.0) as u64;
    to_quantity(raw.min(affordable / 2).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personality::Archetype;
    use market_events::{DecisionType, ItemQuote};

    fn evaluate(funds: u64, items: Vec<ItemQuote>) -> Decision {
        let agent = Agent::with_archetype("m2", "Momentum Trader", funds, Archetype::Aggressive);
        MomentumStrategy.evaluate(&agent, &MarketSnapshot::new(items), &TemporalContext::new())
    }

    #[test]
    fn test_gentle_rise_holds() {
        // 110 / 105 - 1 is below the threshold
        let decision = evaluate(
            1000,
            vec![ItemQuote::new("rising", 110.0, 100.0).with_history(vec![95.0, 100.0, 105.0, 110.0])],
        );
        assert!(decision.is_hold());
    }

    #[test]
    fn test_strong_rise_buys() {
        let decision = evaluate(
            1000,
            vec![ItemQuote::new("rocket", 100.0, 100.0).with_history(vec![70.0, 80.0, 100.0])],
        );
        assert_eq!(decision.decision_type, DecisionType::Buy);
        // affordable 10, raw = 10 * 0.25 * 2 = 5, cap = 5
        assert_eq!(decision.quantity, 5);
        assert!((decision.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_quantity_capped_at_half_affordable() {
        assert_eq!(momentum_quantity(10, 0.9), 5);
        assert_eq!(momentum_quantity(1, 0.9), 1);
        assert_eq!(momentum_quantity(100, 0.11), 22);
    }

    #[test]
    fn test_strongest_move_wins() {
        let decision = evaluate(
            1000,
            vec![
                ItemQuote::new("up", 115.0, 100.0).with_history(vec![100.0, 115.0]),
                ItemQuote::new("crash", 50.0, 100.0).with_history(vec![100.0, 50.0]),
            ],
        );
        assert_eq!(decision.decision_type, DecisionType::Sell);
        assert_eq!(decision.item_id, "crash");
        assert_eq!(decision.quantity, SELL_QUANTITY);
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn test_short_history_skipped() {
        let decision = evaluate(
            1000,
            vec![ItemQuote::new("new", 100.0, 100.0).with_history(vec![100.0])],
        );
        assert!(decision.is_hold());
    }
}
