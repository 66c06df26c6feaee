//! Market Snapshot Types
//!
//! Read-only quotes handed to the decision layer once per tick.
//!
//! # Example
//!
//! ```
//! use market_events::{ItemCategory, ItemQuote, MarketSnapshot};
//!
//! let snapshot = MarketSnapshot::new(vec![
//!     ItemQuote::new("iron_sword", 80.0, 100.0)
//!         .with_supply_demand(30, 50)
//!         .with_category(ItemCategory::Weapon),
//! ]);
//! assert_eq!(snapshot.len(), 1);
//! assert!((snapshot.items[0].value_ratio() - 1.25).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad item category used by seasonal heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Weapon,
    Armor,
    Potion,
    Food,
    Material,
    #[default]
    Misc,
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemCategory::Weapon => "Weapon",
            ItemCategory::Armor => "Armor",
            ItemCategory::Potion => "Potion",
            ItemCategory::Food => "Food",
            ItemCategory::Material => "Material",
            ItemCategory::Misc => "Misc",
        };
        write!(f, "{}", name)
    }
}

/// A single item's market quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemQuote {
    pub item_id: String,
    pub current_price: f64,
    pub base_price: f64,
    #[serde(default)]
    pub supply: u32,
    #[serde(default)]
    pub demand: u32,
    #[serde(default)]
    pub volatility: f64,
    /// Oldest first, newest last
    #[serde(default)]
    pub price_history: Vec<f64>,
    #[serde(default)]
    pub category: ItemCategory,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ItemQuote {
    pub fn new(item_id: impl Into<String>, current_price: f64, base_price: f64) -> Self {
        Self {
            item_id: item_id.into(),
            current_price,
            base_price,
            supply: 0,
            demand: 0,
            volatility: 0.0,
            price_history: Vec::new(),
            category: ItemCategory::default(),
            tags: Vec::new(),
        }
    }

    pub fn with_supply_demand(mut self, supply: u32, demand: u32) -> Self {
        self.supply = supply;
        self.demand = demand;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_history(mut self, history: Vec<f64>) -> Self {
        self.price_history = history;
        self
    }

    pub fn with_category(mut self, category: ItemCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// True when the quote carries a usable positive price.
    pub fn is_tradeable(&self) -> bool {
        self.current_price.is_finite() && self.current_price > 0.0
    }

    /// current / base. Returns 1.0 when the base price is not positive.
    pub fn price_ratio(&self) -> f64 {
        if self.base_price > 0.0 {
            self.current_price / self.base_price
        } else {
            1.0
        }
    }

    /// base / current. Returns 1.0 when the current price is not positive.
    pub fn value_ratio(&self) -> f64 {
        if self.is_tradeable() {
            self.base_price / self.current_price
        } else {
            1.0
        }
    }

    /// demand / (supply + 1)
    pub fn demand_pressure(&self) -> f64 {
        self.demand as f64 / (self.supply as f64 + 1.0)
    }

    /// Whole units purchasable with `funds`, truncated.
    pub fn affordable_units(&self, funds: u64) -> u64 {
        if !self.is_tradeable() {
            return 0;
        }
        (funds as f64 / self.current_price) as u64
    }

    /// Relative change between the two newest history entries.
    ///
    /// `None` with fewer than two entries, `Some(0.0)` if the previous price is zero.
    pub fn momentum(&self) -> Option<f64> {
        let n = self.price_history.len();
        if n < 2 {
            return None;
        }
        let last = self.price_history[n - 1];
        let prev = self.price_history[n - 2];
        if prev == 0.0 {
            return Some(0.0);
        }
        Some((last - prev) / prev)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Ordered list of quotes for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub items: Vec<ItemQuote>,
}

impl MarketSnapshot {
    pub fn new(items: Vec<ItemQuote>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemQuote> {
        self.items.iter()
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemQuote> {
        self.items.iter().find(|q| q.item_id == item_id)
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
