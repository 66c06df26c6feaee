//! Merchant System
//!
//! Owns the agents and one instance of each engine, and runs the per-turn
//! loop: decide, hand off to an external executor, learn from the outcome.

use market_events::{Decision, DecisionType, MarketSnapshot, Outcome, TemporalContext};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::{Agent, TradeRecord};
use crate::config::AiConfig;
use crate::decision::{DecisionEngine, MarketCondition};
use crate::influence::{Influence, MarketInfluenceModel};
use crate::learning::LearningEngine;
use crate::network::{NetworkError, RelationshipNetwork};
use crate::strategy::StrategyKind;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("agent '{0}' already exists")]
    DuplicateAgent(String),
    #[error("agent '{0}' not found")]
    UnknownAgent(String),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Settles decisions outside the core.
///
/// Implementations mutate funds (and whatever inventory they keep) and report
/// what happened. Hold decisions are never passed in.
pub trait TradeExecutor {
    fn execute(&mut self, agent: &Agent, decision: &Decision, context: &TemporalContext) -> Outcome;
}

/// What one agent did in a trading round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingRoundResult {
    pub agent_id: String,
    pub condition: MarketCondition,
    pub strategy: StrategyKind,
    pub decision: Decision,
    /// `None` when the agent held
    pub outcome: Option<Outcome>,
}

impl TradingRoundResult {
    pub fn traded(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn profit(&self) -> f64 {
        self.outcome.as_ref().map_or(0.0, |o| o.profit)
    }
}

/// Orchestrator over agents, engines and the relationship graph.
#[derive(Debug)]
pub struct MerchantSystem {
    agents: BTreeMap<String, Arc<Agent>>,
    decision: DecisionEngine,
    learning: LearningEngine,
    influence: MarketInfluenceModel,
    network: RelationshipNetwork,
}

impl Default for MerchantSystem {
    fn default() -> Self {
        Self::new(&AiConfig::default())
    }
}

impl MerchantSystem {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            agents: BTreeMap::new(),
            decision: DecisionEngine::new(config.decision.clone()),
            learning: LearningEngine::new(config.learning.clone()),
            influence: MarketInfluenceModel::new(config.influence.clone()),
            network: RelationshipNetwork::new(),
        }
    }

    pub fn decision_engine(&self) -> &DecisionEngine {
        &self.decision
    }

    pub fn decision_engine_mut(&mut self) -> &mut DecisionEngine {
        &mut self.decision
    }

    pub fn learning(&self) -> &LearningEngine {
        &self.learning
    }

    pub fn influence_model(&self) -> &MarketInfluenceModel {
        &self.influence
    }

    pub fn network(&self) -> &RelationshipNetwork {
        &self.network
    }

    /// Registers an agent with the system and the relationship network.
    pub fn add_agent(&mut self, agent: Agent) -> Result<Arc<Agent>, SystemError> {
        let id = agent.id().to_string();
        if self.agents.contains_key(&id) {
            return Err(SystemError::DuplicateAgent(id));
        }

        let agent = Arc::new(agent);
        self.network.add_agent(&id);
        self.agents.insert(id.clone(), Arc::clone(&agent));
        info!(agent = id.as_str(), personality = %agent.personality().archetype(), "agent added");
        Ok(agent)
    }

    /// Removes an agent along with its relationships and learned state.
    pub fn remove_agent(&mut self, agent_id: &str) -> Result<Arc<Agent>, SystemError> {
        let agent = self
            .agents
            .remove(agent_id)
            .ok_or_else(|| SystemError::UnknownAgent(agent_id.to_string()))?;
        self.network.remove_agent(agent_id);
        self.learning.forget(agent_id);
        info!(agent = agent_id, "agent removed");
        Ok(agent)
    }

    pub fn agent(&self, agent_id: &str) -> Option<Arc<Agent>> {
        self.agents.get(agent_id).cloned()
    }

    /// All agents ordered by id.
    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.agents.values().cloned().collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    fn require(&self, agent_id: &str) -> Result<&Arc<Agent>, SystemError> {
        self.agents
            .get(agent_id)
            .ok_or_else(|| SystemError::UnknownAgent(agent_id.to_string()))
    }

    /// Up to `max_decisions` item-level proposals for one agent.
    pub fn propose_trades<R: Rng + ?Sized>(
        &self,
        agent_id: &str,
        snapshot: &MarketSnapshot,
        rng: &mut R,
    ) -> Result<Vec<Decision>, SystemError> {
        let agent = self.require(agent_id)?;
        let max = self.decision.config().max_decisions;
        Ok(self.decision.decide_many(agent, snapshot, max, rng))
    }

    /// Runs one decision per agent in id order.
    ///
    /// Non-hold decisions go to `executor`; the returned outcome is tagged
    /// with the market condition if it has no state, then fed to the learning
    /// engine and the agent's own statistics.
    pub fn run_trading_round(
        &self,
        snapshot: &MarketSnapshot,
        context: &TemporalContext,
        executor: &mut dyn TradeExecutor,
    ) -> Vec<TradingRoundResult> {
        let mut results = Vec::with_capacity(self.agents.len());

        for agent in self.agents.values() {
            let plan = self.decision.plan(agent, snapshot, context);

            let outcome = if plan.decision.is_hold() || plan.decision.quantity == 0 {
                None
            } else {
                let mut outcome = executor.execute(agent, &plan.decision, context);
                if outcome.market_state.is_empty() {
                    outcome.market_state = plan.condition.as_str().to_string();
                }
                self.learn(agent, plan.strategy, &outcome);
                Some(outcome)
            };

            results.push(TradingRoundResult {
                agent_id: agent.id().to_string(),
                condition: plan.condition,
                strategy: plan.strategy,
                decision: plan.decision,
                outcome,
            });
        }

        let traded = results.iter().filter(|r| r.traded()).count();
        let profit: f64 = results.iter().map(TradingRoundResult::profit).sum();
        info!(tick = context.tick, agents = results.len(), traded = traded, profit = profit, "trading round complete");
        results
    }

    fn learn(&self, agent: &Agent, strategy: StrategyKind, outcome: &Outcome) {
        self.learning.record_outcome(agent.id(), outcome.clone());
        self.learning.reinforce_strategy(agent.id(), strategy, outcome.success);
        agent.record_trade(trade_record(outcome));
        agent.update_preferences(outcome.item_id(), outcome.profit);
        debug!(
            agent = agent.id(),
            item = outcome.item_id(),
            profit = outcome.profit,
            success = outcome.success,
            "outcome recorded"
        );
    }

    /// Adjusts the relationship between two agents.
    pub fn update_network(&self, a: &str, b: &str, delta: f64) -> Result<(), SystemError> {
        self.require(a)?;
        self.require(b)?;
        self.network.update_strength(a, b, delta)?;
        Ok(())
    }

    pub fn agent_influence(&self, agent_id: &str) -> Result<Influence, SystemError> {
        Ok(self.influence.calculate(self.require(agent_id)?))
    }

    /// Combined influence of every agent.
    pub fn market_influence(&self) -> Influence {
        let influences: Vec<Influence> = self
            .agents
            .values()
            .map(|agent| self.influence.calculate(agent))
            .collect();
        self.influence.aggregate(&influences)
    }
}

/// Per-unit prices implied by an executed decision and its profit.
fn trade_record(outcome: &Outcome) -> TradeRecord {
    let decision = &outcome.decision;
    let per_unit = outcome.profit / f64::from(decision.quantity.max(1));
    let (buy_price, sell_price) = match decision.decision_type {
        DecisionType::Sell => (decision.price - per_unit, decision.price),
        _ => (decision.price, decision.price + per_unit),
    };

    TradeRecord {
        item_id: decision.item_id.clone(),
        quantity: decision.quantity,
        buy_price,
        sell_price,
        profit: outcome.profit,
        timestamp: outcome.timestamp,
    }
}
