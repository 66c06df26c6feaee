//! Sample data fixtures for testing.
//!
//! Enable the `test-fixtures` feature to access these helpers from other crates.
//!
//! ```ignore
//! // [dev-dependencies]
//! // market-events = { path = "../market-events", features = ["test-fixtures"] }
//!
//! let snapshot = market_events::fixtures::sample_snapshot();
//! ```

use crate::{ItemQuote, MarketSnapshot};

/// Returns the sample market from the fixtures file.
///
/// Contains 4 items:
/// - `iron_sword`: 20% under base price, falling
/// - `silk_cloak`: 20% over base price, rising fast, tagged winter
/// - `frost_potion`: slightly cheap, rising, tagged summer
/// - `rye_bread`: at base price, flat
pub fn sample_snapshot() -> MarketSnapshot {
    let json = include_str!("../tests/fixtures/sample_market.json");
    MarketSnapshot::from_json(json).expect("Failed to parse sample_market.json")
}

/// Returns a single quote from the sample market.
pub fn sample_quote(item_id: &str) -> Option<ItemQuote> {
    sample_snapshot().get(item_id).cloned()
}
