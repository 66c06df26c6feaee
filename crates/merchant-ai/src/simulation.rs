//! Demo Simulation
//!
//! A seeded random-walk market, an executor that settles each trade against
//! the following tick's price, and a tick loop that ties them to a
//! `MerchantSystem`.

use market_events::{
    Decision, DecisionType, ItemCategory, ItemQuote, MarketSnapshot, Outcome, Season, TemporalContext,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::config::{AiConfig, SimulationConfig};
use crate::influence::Influence;
use crate::learning::TradingPattern;
use crate::network::InformationPacket;
use crate::personality::Archetype;
use crate::setup::{connect_agents, spawn_agents};
use crate::strategy::StrategyKind;
use crate::system::{MerchantSystem, SystemError, TradeExecutor, TradingRoundResult};

/// Prices kept per item
pub const PRICE_HISTORY_LIMIT: usize = 20;

/// Pull of the current price towards its influenced base each tick
const MEAN_REVERSION: f64 = 0.1;

/// Prices never fall below this fraction of base
const PRICE_FLOOR: f64 = 0.1;

const REPUTATION_GAIN: f64 = 1.0;
const REPUTATION_LOSS: f64 = 0.5;

/// Relationship strength change per shared trade result
const BOND_STEP: f64 = 0.02;

/// Seeded random-walk market.
#[derive(Debug, Clone)]
pub struct MarketSimulator {
    quotes: Vec<ItemQuote>,
}

impl MarketSimulator {
    pub fn new(quotes: Vec<ItemQuote>) -> Self {
        Self { quotes }
    }

    /// A small catalog covering every category and season.
    pub fn with_default_goods() -> Self {
        let good = |id: &str, price: f64, category: ItemCategory, volatility: f64, tags: &[&str]| {
            ItemQuote::new(id, price, price)
                .with_supply_demand(40, 40)
                .with_volatility(volatility)
                .with_history(vec![price])
                .with_category(category)
                .with_tags(tags.iter().copied())
        };

        Self::new(vec![
            good("iron_sword", 100.0, ItemCategory::Weapon, 0.08, &[]),
            good("longbow", 70.0, ItemCategory::Weapon, 0.06, &["autumn"]),
            good("fur_cloak", 120.0, ItemCategory::Armor, 0.05, &["winter"]),
            good("straw_hat", 8.0, ItemCategory::Armor, 0.07, &["summer"]),
            good("frost_potion", 45.0, ItemCategory::Potion, 0.1, &["summer", "cooling"]),
            good("healing_potion", 25.0, ItemCategory::Potion, 0.04, &[]),
            good("rye_bread", 4.0, ItemCategory::Food, 0.03, &[]),
            good("flower_seeds", 3.0, ItemCategory::Material, 0.06, &["spring"]),
            good("iron_ore", 15.0, ItemCategory::Material, 0.05, &[]),
            good("lantern", 12.0, ItemCategory::Misc, 0.02, &[]),
        ])
    }

    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot::new(self.quotes.clone())
    }

    /// Advances every price by a volatility-sized shock plus a pull towards
    /// the influenced base price. Supply and demand drift by a few units.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R, influence: &Influence) {
        for quote in &mut self.quotes {
            let target = influence.price_effect(quote.base_price);
            let shock = if quote.volatility > 0.0 {
                rng.gen_range(-quote.volatility..=quote.volatility)
            } else {
                0.0
            };
            let reversion = if quote.current_price > 0.0 {
                (target - quote.current_price) / quote.current_price * MEAN_REVERSION
            } else {
                0.0
            };

            let next = quote.current_price * (1.0 + shock + reversion);
            quote.current_price = next.max(quote.base_price * PRICE_FLOOR);
            quote.price_history.push(quote.current_price);
            if quote.price_history.len() > PRICE_HISTORY_LIMIT {
                let excess = quote.price_history.len() - PRICE_HISTORY_LIMIT;
                quote.price_history.drain(..excess);
            }

            quote.supply = drift(quote.supply, rng);
            quote.demand = drift(quote.demand, rng);
        }
    }
}

fn drift<R: Rng + ?Sized>(value: u32, rng: &mut R) -> u32 {
    let delta: i64 = rng.gen_range(-3..=3);
    u32::try_from((i64::from(value) + delta).max(0)).unwrap_or(u32::MAX)
}

/// Settles trades against the next tick's prices.
///
/// A buy pays the decided price now and is marked at the next price; a sell
/// takes the decided price now and covers at the next price.
#[derive(Debug, Clone)]
pub struct SettlementExecutor {
    next: MarketSnapshot,
}

impl SettlementExecutor {
    pub fn new(next: MarketSnapshot) -> Self {
        Self { next }
    }
}

impl TradeExecutor for SettlementExecutor {
    fn execute(&mut self, agent: &Agent, decision: &Decision, context: &TemporalContext) -> Outcome {
        let failed = || Outcome::new(decision.clone(), 0.0, false).at(context.tick);

        let Some(next_price) = self
            .next
            .get(&decision.item_id)
            .filter(|q| q.is_tradeable())
            .map(|q| q.current_price)
        else {
            return failed();
        };
        let quantity = f64::from(decision.quantity);

        let profit = match decision.decision_type {
            DecisionType::Buy => {
                let cost = to_units(decision.price * quantity);
                if !agent.remove_funds(cost) {
                    debug!(agent = agent.id(), item = decision.item_id.as_str(), cost = cost, "buy not covered");
                    return failed();
                }
                let proceeds = to_units(next_price * quantity);
                agent.add_funds(proceeds);
                proceeds as f64 - cost as f64
            }
            DecisionType::Sell => {
                let profit = (decision.price - next_price) * quantity;
                settle(agent, profit);
                profit
            }
            DecisionType::Hold => return Outcome::new(decision.clone(), 0.0, true).at(context.tick),
        };

        let success = profit > 0.0;
        agent.adjust_reputation(if success { REPUTATION_GAIN } else { -REPUTATION_LOSS });
        Outcome::new(decision.clone(), profit, success).at(context.tick)
    }
}

fn to_units(amount: f64) -> u64 {
    if amount.is_finite() && amount > 0.0 {
        amount.round() as u64
    } else {
        0
    }
}

fn settle(agent: &Agent, profit: f64) {
    let units = to_units(profit.abs());
    if profit >= 0.0 {
        agent.add_funds(units);
    } else if !agent.remove_funds(units) {
        agent.set_funds(0);
    }
}

/// Season at `tick` when starting from `start` and changing every `length` ticks.
pub fn season_at(start: Season, tick: u64, length: u64) -> Season {
    if length == 0 {
        return start;
    }
    (0..(tick / length) % 4).fold(start, |season, _| season.next())
}

/// What happened in one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub season: Season,
    pub results: Vec<TradingRoundResult>,
    pub propagation_events: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub archetype: Archetype,
    pub funds: u64,
    pub reputation: f64,
    pub total_trades: u64,
    pub success_rate: f64,
    pub total_profit: f64,
    pub average_profit: f64,
    pub favoured_strategy: Option<StrategyKind>,
    pub pattern: Option<TradingPattern>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub ticks_run: u64,
    pub final_season: Season,
    pub agents: Vec<AgentSummary>,
    pub market_influence: Influence,
    pub relationships: usize,
    pub clusters: Vec<Vec<String>>,
    pub propagation_events: usize,
    pub final_prices: BTreeMap<String, f64>,
}

/// Seeded tick loop over a `MerchantSystem` and a `MarketSimulator`.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    system: MerchantSystem,
    market: MarketSimulator,
    rng: SmallRng,
    tick: u64,
    propagation_events: usize,
}

impl Simulation {
    /// Builds the system, spawns and connects agents from `config.simulation`.
    pub fn new(config: &AiConfig) -> Result<Self, SystemError> {
        Self::with_market(config, MarketSimulator::with_default_goods())
    }

    pub fn with_market(config: &AiConfig, market: MarketSimulator) -> Result<Self, SystemError> {
        let mut rng = SmallRng::seed_from_u64(config.simulation.seed);
        let mut system = MerchantSystem::new(config);
        let ids = spawn_agents(&mut system, &config.simulation, &mut rng)?;
        let relationships = connect_agents(&system, &mut rng)?;
        info!(agents = ids.len(), relationships = relationships, "simulation ready");

        Ok(Self {
            config: config.simulation.clone(),
            system,
            market,
            rng,
            tick: 0,
            propagation_events: 0,
        })
    }

    pub fn system(&self) -> &MerchantSystem {
        &self.system
    }

    pub fn market(&self) -> &MarketSimulator {
        &self.market
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn context(&self) -> TemporalContext {
        TemporalContext::new()
            .with_season(season_at(self.config.season, self.tick, self.config.season_length))
            .at_tick(self.tick)
    }

    /// Runs one trading round, then shares every executed trade's price move
    /// with the trader's neighbours and nudges those relationships.
    pub fn step(&mut self) -> Result<TickReport, SystemError> {
        let context = self.context();
        let snapshot = self.market.snapshot();

        let influence = self.system.market_influence();
        self.market.step(&mut self.rng, &influence);
        let next = self.market.snapshot();
        let mut executor = SettlementExecutor::new(next.clone());

        let results = self.system.run_trading_round(&snapshot, &context, &mut executor);

        let mut propagated = 0;
        for result in &results {
            let Some(outcome) = &result.outcome else {
                continue;
            };
            let item_id = outcome.item_id();
            let (Some(before), Some(after)) = (snapshot.get(item_id), next.get(item_id)) else {
                continue;
            };

            let packet = InformationPacket::new(
                item_id,
                after.current_price - before.current_price,
                &result.agent_id,
                result.decision.confidence,
                context.tick,
            );
            let events = self.system.network().propagate(&packet);
            propagated += events.len();

            let step = if outcome.success { BOND_STEP } else { -BOND_STEP };
            for event in &events {
                self.system.update_network(&result.agent_id, &event.target_id, step)?;
            }
        }
        self.propagation_events += propagated;

        let report = TickReport {
            tick: context.tick,
            season: context.season(),
            results,
            propagation_events: propagated,
        };
        self.tick += 1;
        Ok(report)
    }

    /// Runs the configured number of ticks.
    pub fn run(&mut self) -> Result<SimulationSummary, SystemError> {
        for _ in 0..self.config.ticks {
            let report = self.step()?;
            if report.tick % 10 == 0 {
                let traded = report.results.iter().filter(|r| r.traded()).count();
                info!(tick = report.tick, season = %report.season, traded = traded, "tick");
            }
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> SimulationSummary {
        let learning = self.system.learning();
        let agents = self
            .system
            .agents()
            .iter()
            .map(|agent| {
                let stats = agent.trading_stats();
                AgentSummary {
                    id: agent.id().to_string(),
                    name: agent.name().to_string(),
                    archetype: agent.personality().archetype(),
                    funds: agent.funds(),
                    reputation: agent.reputation(),
                    total_trades: stats.total_trades,
                    success_rate: stats.success_rate(),
                    total_profit: stats.total_profit,
                    average_profit: learning.average_profit(agent.id()),
                    favoured_strategy: learning
                        .preferences(agent.id())
                        .strategy_for_market(""),
                    pattern: learning.analyze_patterns(agent.id()),
                }
            })
            .collect();

        let final_prices = self
            .market
            .snapshot()
            .iter()
            .map(|q| (q.item_id.clone(), q.current_price))
            .collect();

        SimulationSummary {
            seed: self.config.seed,
            ticks_run: self.tick,
            final_season: self.context().season(),
            agents,
            market_influence: self.system.market_influence(),
            relationships: self.system.network().relationship_count(),
            clusters: self.system.network().clusters(),
            propagation_events: self.propagation_events,
            final_prices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: f64) -> ItemQuote {
        ItemQuote::new("ore", price, 10.0)
    }

    #[test]
    fn test_season_at() {
        assert_eq!(season_at(Season::Spring, 0, 25), Season::Spring);
        assert_eq!(season_at(Season::Spring, 24, 25), Season::Spring);
        assert_eq!(season_at(Season::Spring, 25, 25), Season::Summer);
        assert_eq!(season_at(Season::Winter, 25, 25), Season::Spring);
        assert_eq!(season_at(Season::Spring, 100, 25), Season::Spring);
        assert_eq!(season_at(Season::Autumn, 1000, 0), Season::Autumn);
    }

    #[test]
    fn test_market_step() {
        let mut market = MarketSimulator::with_default_goods();
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..(PRICE_HISTORY_LIMIT + 10) {
            market.step(&mut rng, &Influence::default());
        }
        for quote in market.snapshot().iter() {
            assert!(quote.current_price >= quote.base_price * PRICE_FLOOR);
            assert_eq!(quote.price_history.len(), PRICE_HISTORY_LIMIT);
            assert_eq!(quote.price_history.last().copied(), Some(quote.current_price));
        }
    }

    #[test]
    fn test_market_step_is_seeded() {
        let run = |seed| {
            let mut market = MarketSimulator::with_default_goods();
            let mut rng = SmallRng::seed_from_u64(seed);
            for _ in 0..5 {
                market.step(&mut rng, &Influence::default());
            }
            market.snapshot()
        };
        assert_eq!(run(3), run(3));
        assert_ne!(run(3), run(4));
    }

    #[test]
    fn test_buy_settles_at_next_price() {
        let agent = Agent::with_archetype("m", "M", 100, Archetype::Balanced);
        let mut executor = SettlementExecutor::new(MarketSnapshot::new(vec![quote(12.0)]));
        let outcome = executor.execute(
            &agent,
            &Decision::buy("ore", 5, 10.0, 0.5, ""),
            &TemporalContext::new().at_tick(3),
        );
        assert_eq!(outcome.profit, 10.0);
        assert!(outcome.success);
        assert_eq!(outcome.timestamp, 3);
        assert_eq!(agent.funds(), 110);
        assert_eq!(agent.reputation(), REPUTATION_GAIN);
    }

    #[test]
    fn test_uncovered_buy_fails() {
        let agent = Agent::with_archetype("m", "M", 20, Archetype::Balanced);
        let mut executor = SettlementExecutor::new(MarketSnapshot::new(vec![quote(12.0)]));
        let outcome = executor.execute(&agent, &Decision::buy("ore", 5, 10.0, 0.5, ""), &TemporalContext::new());
        assert!(!outcome.success);
        assert_eq!(outcome.profit, 0.0);
        assert_eq!(agent.funds(), 20);
    }

    #[test]
    fn test_sell_covers_at_next_price() {
        let agent = Agent::with_archetype("m", "M", 10, Archetype::Balanced);
        let mut executor = SettlementExecutor::new(MarketSnapshot::new(vec![quote(14.0)]));
        let outcome = executor.execute(&agent, &Decision::sell("ore", 5, 10.0, 0.5, ""), &TemporalContext::new());
        assert_eq!(outcome.profit, -20.0);
        assert!(!outcome.success);
        // loss exceeds funds
        assert_eq!(agent.funds(), 0);
        assert_eq!(agent.reputation(), -REPUTATION_LOSS);
    }

    #[test]
    fn test_unknown_item_fails() {
        let agent = Agent::with_archetype("m", "M", 100, Archetype::Balanced);
        let mut executor = SettlementExecutor::new(MarketSnapshot::empty());
        let outcome = executor.execute(&agent, &Decision::buy("gold", 1, 1.0, 0.5, ""), &TemporalContext::new());
        assert!(!outcome.success);
        assert_eq!(agent.funds(), 100);
    }

    #[test]
    fn test_simulation_runs() {
        let mut config = AiConfig::default();
        config.simulation.ticks = 30;
        config.simulation.season_length = 10;
        let mut sim = Simulation::new(&config).unwrap();
        let summary = sim.run().unwrap();

        assert_eq!(summary.ticks_run, 30);
        assert_eq!(summary.final_season, Season::Winter);
        assert_eq!(summary.agents.len(), 8);
        assert_eq!(summary.final_prices.len(), 10);
        assert!(summary.market_influence.price_impact <= 0.5);
        for agent in &summary.agents {
            assert!((-100.0..=100.0).contains(&agent.reputation));
        }
    }
}
