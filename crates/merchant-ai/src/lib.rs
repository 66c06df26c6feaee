//! Merchant AI
//!
//! Decision making, learning, market influence and relationship networks for
//! autonomous trading agents. The crate never executes trades itself; an
//! external [`TradeExecutor`] settles decisions and reports outcomes back.

pub mod agent;
pub mod config;
pub mod decision;
pub mod influence;
pub mod learning;
pub mod network;
pub mod personality;
pub mod preferences;
pub mod setup;
pub mod simulation;
pub mod strategy;
pub mod system;

pub use agent::{Agent, TradeRecord, TradingStatistics};
pub use config::{AiConfig, ConfigError, DecisionConfig, InfluenceConfig, LearningConfig, SimulationConfig};
pub use decision::{DecisionEngine, MarketCondition, Plan};
pub use influence::{Influence, MarketInfluenceModel};
pub use learning::{LearningEngine, TradingPattern};
pub use network::{
    InformationPacket, NetworkError, PropagationEvent, Relationship, RelationshipNetwork, RelationshipType,
};
pub use personality::{Archetype, Personality, PersonalityProfile};
pub use preferences::Preferences;
pub use simulation::{MarketSimulator, SettlementExecutor, Simulation, SimulationSummary};
pub use strategy::{MomentumStrategy, SeasonalStrategy, StrategyKind, TradingStrategy, ValueStrategy};
pub use system::{MerchantSystem, SystemError, TradeExecutor, TradingRoundResult};
