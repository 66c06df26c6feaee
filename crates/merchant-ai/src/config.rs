//! Tuning Configuration
//!
//! All tunables load from a TOML file. Every section and field has a default,
//! so a partial file (or none at all) is valid.

use market_events::Season;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "merchant_tuning.toml";

/// Complete merchant AI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub influence: InfluenceConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl AiConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Outcome-driven adaptation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Outcomes retained per agent (oldest evicted first)
    pub history_limit: usize,
    /// Minimum outcomes before patterns are mined
    pub min_pattern_outcomes: usize,
    /// Preference gain per successful trade
    pub success_boost: f64,
    /// Preference loss per failed trade
    pub failure_penalty: f64,
    /// Preferred score below which an item becomes avoided
    pub avoid_threshold: f64,
    /// Market-condition and strategy score step per outcome
    pub condition_step: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            min_pattern_outcomes: 10,
            success_boost: 0.1,
            failure_penalty: 0.2,
            avoid_threshold: -1.0,
            condition_step: 0.05,
        }
    }
}

/// Multi-item decision settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Cap on decisions per agent per tick
    pub max_decisions: usize,
    /// Half-width of the confidence jitter
    pub jitter: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            max_decisions: 3,
            jitter: 0.05,
        }
    }
}

/// Market influence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceConfig {
    /// Scale applied to every per-agent channel before capping
    pub base_influence: f64,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            base_influence: 0.01,
        }
    }
}

/// Demo simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub ticks: u64,
    pub season: Season,
    /// Ticks per season
    pub season_length: u64,
    pub agents_per_archetype: usize,
    pub starting_funds: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 100,
            season: Season::Spring,
            season_length: 25,
            agents_per_archetype: 2,
            starting_funds: 2000,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
