use market_events::{clamp_unit, Decision, MarketSnapshot, TemporalContext};

use super::{no_data, to_quantity, BestOpportunity, StrategyKind, TradingStrategy};
use crate::agent::Agent;

/// base/current above this is undervalued
pub const BUY_THRESHOLD: f64 = 1.2;
/// base/current below this is overvalued
pub const SELL_THRESHOLD: f64 = 0.8;
pub const SELL_QUANTITY: u32 = 5;

/// Buys undervalued items and sells overvalued ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueStrategy;

impl TradingStrategy for ValueStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Value
    }

    fn evaluate(&self, agent: &Agent, snapshot: &MarketSnapshot, _context: &TemporalContext) -> Decision {
        if snapshot.is_empty() {
            return no_data();
        }

        let funds = agent.funds();
        let mut best = BestOpportunity::new();

        // no base price, no notion of value
        for quote in snapshot.iter().filter(|q| q.is_tradeable() && q.base_price > 0.0) {
            let value_ratio = quote.value_ratio();

            if value_ratio > BUY_THRESHOLD {
                let affordable = quote.affordable_units(funds);
                if affordable >= 1 {
                    let score = (value_ratio - 1.0) * quote.demand_pressure();
                    best.offer(score, || {
                        Decision::buy(
                            &quote.item_id,
                            to_quantity((affordable / 4).max(1)),
                            quote.current_price,
                            value_confidence(value_ratio),
                            "Undervalued item with good demand",
                        )
                    });
                }
            }

            if value_ratio < SELL_THRESHOLD {
                let score =
                    (1.0 - value_ratio) * quote.supply as f64 / (quote.demand as f64 + 1.0);
                best.offer(score, || {
                    Decision::sell(
                        &quote.item_id,
                        SELL_QUANTITY,
                        quote.current_price,
                        value_confidence(1.0 / value_ratio),
                        "Overvalued item with low demand",
                    )
                });
            }
        }

        best.into_decision("No valuable opportunities found")
    }
}

fn value_confidence(ratio: f64) -> f64 {
    clamp_unit((ratio - 1.0) * 0.5)
}
