//! Shared market data types for the merchant simulation.
//!
//! This crate contains pure data structures with no decision logic.
//! It is a dependency for every other crate in the workspace.

pub mod decision;
pub mod market;
pub mod season;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// Re-export market types
pub use market::{ItemCategory, ItemQuote, MarketSnapshot};

// Re-export season types
pub use season::{ParseSeasonError, Season, TemporalContext};

// Re-export decision types
pub use decision::{clamp_unit, Decision, DecisionType, Outcome};
