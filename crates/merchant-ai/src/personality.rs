//! Merchant Personalities
//!
//! Fixed trait bundles that shape how an agent trades. Profiles never change
//! after creation and are shared between agents by reference.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Personality archetype tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Aggressive,
    Conservative,
    Balanced,
    Opportunistic,
    /// User-defined profile; dispatched like `Balanced`
    Custom,
}

impl Archetype {
    /// The four built-in archetypes.
    pub fn all() -> &'static [Archetype] {
        &[
            Archetype::Aggressive,
            Archetype::Conservative,
            Archetype::Balanced,
            Archetype::Opportunistic,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Aggressive => "Aggressive",
            Archetype::Conservative => "Conservative",
            Archetype::Balanced => "Balanced",
            Archetype::Opportunistic => "Opportunistic",
            Archetype::Custom => "Custom",
        }
    }

    /// The built-in profile for this archetype. `Custom` maps to the balanced values.
    pub fn profile(&self) -> &'static PersonalityProfile {
        match self {
            Archetype::Aggressive => &PersonalityProfile::AGGRESSIVE,
            Archetype::Conservative => &PersonalityProfile::CONSERVATIVE,
            Archetype::Opportunistic => &PersonalityProfile::OPPORTUNISTIC,
            Archetype::Balanced | Archetype::Custom => &PersonalityProfile::BALANCED,
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Capability set every personality exposes.
pub trait Personality: fmt::Debug + Send + Sync {
    fn archetype(&self) -> Archetype;
    /// 0.0 (risk-averse) to 1.0 (risk-seeking)
    fn risk_tolerance(&self) -> f64;
    /// Multiplier on how often and how confidently the agent trades
    fn trading_frequency(&self) -> f64;
    /// Margin over base price at which the agent takes profit
    fn profit_margin_target(&self) -> f64;
    /// How strongly the agent pushes on the market
    fn competitiveness_factor(&self) -> f64;
    /// How long the agent waits for a good deal
    fn patience_factor(&self) -> f64;
}

/// Concrete trait bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    pub archetype: Archetype,
    pub risk_tolerance: f64,
    pub trading_frequency: f64,
    pub profit_margin_target: f64,
    pub competitiveness_factor: f64,
    pub patience_factor: f64,
}

impl PersonalityProfile {
    pub const AGGRESSIVE: PersonalityProfile = PersonalityProfile {
        archetype: Archetype::Aggressive,
        risk_tolerance: 0.8,
        trading_frequency: 1.5,
        profit_margin_target: 0.3,
        competitiveness_factor: 1.2,
        patience_factor: 0.5,
    };

    pub const CONSERVATIVE: PersonalityProfile = PersonalityProfile {
        archetype: Archetype::Conservative,
        risk_tolerance: 0.2,
        trading_frequency: 0.7,
        profit_margin_target: 0.5,
        competitiveness_factor: 0.8,
        patience_factor: 1.5,
    };

    pub const BALANCED: PersonalityProfile = PersonalityProfile {
        archetype: Archetype::Balanced,
        risk_tolerance: 0.5,
        trading_frequency: 1.0,
        profit_margin_target: 0.4,
        competitiveness_factor: 1.0,
        patience_factor: 1.0,
    };

    pub const OPPORTUNISTIC: PersonalityProfile = PersonalityProfile {
        archetype: Archetype::Opportunistic,
        risk_tolerance: 0.6,
        trading_frequency: 1.3,
        profit_margin_target: 0.35,
        competitiveness_factor: 1.1,
        patience_factor: 0.8,
    };

    /// Builds a custom profile. Risk tolerance is clamped to [0, 1], the
    /// remaining factors to be non-negative.
    pub fn custom(
        risk_tolerance: f64,
        trading_frequency: f64,
        profit_margin_target: f64,
        competitiveness_factor: f64,
        patience_factor: f64,
    ) -> Self {
        Self {
            archetype: Archetype::Custom,
            risk_tolerance: risk_tolerance.clamp(0.0, 1.0),
            trading_frequency: trading_frequency.max(0.0),
            profit_margin_target: profit_margin_target.max(0.0),
            competitiveness_factor: competitiveness_factor.max(0.0),
            patience_factor: patience_factor.max(0.0),
        }
    }
}

impl Personality for PersonalityProfile {
    fn archetype(&self) -> Archetype {
        self.archetype
    }

    fn risk_tolerance(&self) -> f64 {
        self.risk_tolerance
    }

    fn trading_frequency(&self) -> f64 {
        self.trading_frequency
    }

    fn profit_margin_target(&self) -> f64 {
        self.profit_margin_target
    }

    fn competitiveness_factor(&self) -> f64 {
        self.competitiveness_factor
    }

    fn patience_factor(&self) -> f64 {
        self.patience_factor
    }
}
