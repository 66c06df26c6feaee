use market_events::{Decision, ItemCategory, ItemQuote, MarketSnapshot, Season, TemporalContext};

use super::{no_data, to_quantity, BestOpportunity, StrategyKind, TradingStrategy};
use crate::agent::Agent;

pub const IN_SEASON_SCORE: f64 = 0.8;
/// Scores beyond this magnitude trigger a trade
pub const TRADE_THRESHOLD: f64 = 0.5;
pub const SELL_QUANTITY: u32 = 5;

/// Trades on season tags and seasonal categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalStrategy;

/// Seasonal affinity of an item in [-0.8, 0.8].
///
/// The first tag naming the season (or its opposite) decides; otherwise
/// potions favour winter and summer, food favours autumn.
pub fn seasonal_score(quote: &ItemQuote, season: Season) -> f64 {
    let opposite = season.opposite();
    for tag in &quote.tags {
        if tag == season.as_str() {
            return IN_SEASON_SCORE;
        }
        if tag == opposite.as_str() {
            return -IN_SEASON_SCORE;
        }
    }

    match (quote.category, season) {
        (ItemCategory::Potion, Season::Winter | Season::Summer) => 0.4,
        (ItemCategory::Food, Season::Autumn) => 0.6,
        _ => 0.0,
    }
}

impl TradingStrategy for SeasonalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Seasonal
    }

    fn evaluate(&self, agent: &Agent, snapshot: &MarketSnapshot, context: &TemporalContext) -> Decision {
        if snapshot.is_empty() {
            return no_data();
        }

        let season = context.season();
        let funds = agent.funds();
        let mut best = BestOpportunity::new();

        for quote in snapshot.iter().filter(|q| q.is_tradeable()) {
            let score = seasonal_score(quote, season);

            if score > TRADE_THRESHOLD {
                let affordable = quote.affordable_units(funds);
                if affordable >= 1 {
                    let quantity = ((affordable as f64 * score * 0.3) as u64).max(1);
                    best.offer(score, || {
                        Decision::buy(
                            &quote.item_id,
                            to_quantity(quantity),
                            quote.current_price,
                            score,
                            "Seasonal item in high demand",
                        )
                    });
                }
            } else if score < -TRADE_THRESHOLD {
                best.offer(-score, || {
                    Decision::sell(
                        &quote.item_id,
                        SELL_QUANTITY,
                        quote.current_price,
                        -score,
                        "Out of season item",
                    )
                });
            }
        }

        best.into_decision("No seasonal opportunities")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personality::Archetype;
    use market_events::DecisionType;

    fn agent(funds: u64) -> Agent {
        Agent::with_archetype("m3", "Seasonal Trader", funds, Archetype::Balanced)
    }

    #[test]
    fn test_scores() {
        let summer_item = ItemQuote::new("ice", 50.0, 50.0).with_tags(["summer", "cooling"]);
        assert_eq!(seasonal_score(&summer_item, Season::Summer), 0.8);
        assert_eq!(seasonal_score(&summer_item, Season::Winter), -0.8);
        assert_eq!(seasonal_score(&summer_item, Season::Spring), 0.0);

        // tags match the lowercase season name exactly
        let shouting = ItemQuote::new("fan", 5.0, 5.0).with_tags(["SUMMER"]);
        assert_eq!(seasonal_score(&shouting, Season::Summer), 0.0);

        let potion = ItemQuote::new("p", 10.0, 10.0).with_category(ItemCategory::Potion);
        assert_eq!(seasonal_score(&potion, Season::Winter), 0.4);
        assert_eq!(seasonal_score(&potion, Season::Autumn), 0.0);

        let bread = ItemQuote::new("b", 2.0, 2.0).with_category(ItemCategory::Food);
        assert_eq!(seasonal_score(&bread, Season::Autumn), 0.6);
    }

    #[test]
    fn test_prefers_in_season_items() {
        let snapshot = MarketSnapshot::new(vec![
            ItemQuote::new("ice_potion", 50.0, 50.0)
                .with_category(ItemCategory::Potion)
                .with_tags(["summer", "cooling"]),
            ItemQuote::new("fire_sword", 100.0, 100.0)
                .with_category(ItemCategory::Weapon)
                .with_tags(["winter", "heating"]),
        ]);
        let ctx = TemporalContext::new().with_season(Season::Summer);
        let decision = SeasonalStrategy.evaluate(&agent(1000), &snapshot, &ctx);

        assert_eq!(decision.decision_type, DecisionType::Buy);
        assert_eq!(decision.item_id, "ice_potion");
        // affordable 20 * 0.8 * 0.3 = 4.8
        assert_eq!(decision.quantity, 4);
        assert_eq!(decision.confidence, 0.8);
    }

    #[test]
    fn test_sells_out_of_season_when_broke() {
        let snapshot = MarketSnapshot::new(vec![
            ItemQuote::new("ice_potion", 50.0, 50.0).with_tags(["summer"]),
            ItemQuote::new("fur_coat", 100.0, 100.0).with_tags(["winter"]),
        ]);
        let ctx = TemporalContext::new().with_season(Season::Summer);
        let decision = SeasonalStrategy.evaluate(&agent(10), &snapshot, &ctx);

        assert_eq!(decision.decision_type, DecisionType::Sell);
        assert_eq!(decision.item_id, "fur_coat");
        assert_eq!(decision.quantity, SELL_QUANTITY);
    }

    #[test]
    fn test_defaults_to_spring() {
        let snapshot = MarketSnapshot::new(vec![ItemQuote::new("blossom", 5.0, 5.0).with_tags(["spring"])]);
        let decision = SeasonalStrategy.evaluate(&agent(100), &snapshot, &TemporalContext::new());
        assert_eq!(decision.item_id, "blossom");
    }
}
