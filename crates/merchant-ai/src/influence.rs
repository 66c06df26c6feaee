//! Market Influence Model
//!
//! Estimates how far a wealthy, reputable or pushy agent distorts prices,
//! demand and supply, and combines many agents with diminishing returns.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::config::InfluenceConfig;
use crate::personality::Personality;

/// Per-agent channel caps
pub mod caps {
    pub const PRICE: f64 = 0.2;
    pub const DEMAND: f64 = 0.15;
    pub const SUPPLY: f64 = 0.1;

    pub const AGGREGATE_PRICE: f64 = 0.5;
    pub const AGGREGATE_DEMAND: f64 = 0.4;
    pub const AGGREGATE_SUPPLY: f64 = 0.3;

    /// Upper bound of the wealth factor
    pub const GOLD_FACTOR: f64 = 3.0;
}

/// Modelled market distortion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    pub price_impact: f64,
    pub demand_impact: f64,
    pub supply_impact: f64,
    /// Carried through from the agent
    pub reputation: f64,
}

impl Influence {
    pub fn price_effect(&self, base_price: f64) -> f64 {
        base_price * (1.0 + self.price_impact)
    }

    pub fn demand_effect(&self, base_demand: u32) -> u32 {
        scale_count(base_demand, self.demand_impact)
    }

    pub fn supply_effect(&self, base_supply: u32) -> u32 {
        scale_count(base_supply, self.supply_impact)
    }
}

fn scale_count(base: u32, impact: f64) -> u32 {
    let scaled = (base as f64 * (1.0 + impact)).round();
    if scaled <= 0.0 {
        0
    } else if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Influence calculator. Stateless apart from its configuration.
#[derive(Debug, Clone, Default)]
pub struct MarketInfluenceModel {
    config: InfluenceConfig,
}

impl MarketInfluenceModel {
    pub fn new(config: InfluenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InfluenceConfig {
        &self.config
    }

    pub fn calculate(&self, agent: &Agent) -> Influence {
        self.calculate_from(agent.funds(), agent.reputation(), agent.personality())
    }

    pub fn calculate_from(&self, funds: u64, reputation: f64, personality: &dyn Personality) -> Influence {
        let base = self.config.base_influence;
        let gold = gold_factor(funds);
        let reputation_factor = (reputation + 100.0) / 100.0;
        let personality_factor =
            (personality.competitiveness_factor() + personality.trading_frequency()) / 2.0;

        Influence {
            price_impact: (base * gold * personality_factor).min(caps::PRICE),
            demand_impact: (base * reputation_factor * personality_factor).min(caps::DEMAND),
            supply_impact: (base * gold * 0.5).min(caps::SUPPLY),
            reputation,
        }
    }

    /// Folds many influences with diminishing returns per channel, then caps.
    ///
    /// Each step is `acc + impact * (1 - acc / 2)`, which equals
    /// `2 * (1 - prod(1 - impact / 2))`, so the result does not depend on
    /// input order beyond float rounding.
    pub fn aggregate(&self, influences: &[Influence]) -> Influence {
        if influences.is_empty() {
            return Influence::default();
        }

        let channel = |pick: fn(&Influence) -> f64, cap: f64| -> f64 {
            fold_diminishing(influences.iter().map(pick)).min(cap)
        };

        let reputation =
            influences.iter().map(|i| i.reputation).sum::<f64>() / influences.len() as f64;

        Influence {
            price_impact: channel(|i| i.price_impact, caps::AGGREGATE_PRICE),
            demand_impact: channel(|i| i.demand_impact, caps::AGGREGATE_DEMAND),
            supply_impact: channel(|i| i.supply_impact, caps::AGGREGATE_SUPPLY),
            reputation,
        }
    }
}

/// log10(funds / 100 + 1) clamped to [0, 3]; 0 without funds.
pub fn gold_factor(funds: u64) -> f64 {
    if funds == 0 {
        return 0.0;
    }
    (funds as f64 / 100.0 + 1.0).log10().clamp(0.0, caps::GOLD_FACTOR)
}

fn fold_diminishing(impacts: impl Iterator<Item = f64>) -> f64 {
    impacts.fold(0.0, |acc, impact| acc + impact * (1.0 - acc * 0.5))
}
