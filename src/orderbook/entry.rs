//! Book entries and the feed events that carry them

use pricelevel::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single price level as published by the exchange feed.
///
/// The `id` is the exchange's composite level identifier. It is stable across
/// updates to the same level and is the key every diff is applied by; the
/// price is carried for ordering only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    /// Instrument the level belongs to
    pub symbol: String,

    /// Composite level id issued by the exchange
    pub id: u64,

    /// `Side::Buy` for bids, `Side::Sell` for asks
    pub side: Side,

    /// Level price
    pub price: Decimal,

    /// Resting size at the level, in contracts
    #[serde(default)]
    pub size: u64,
}

impl OrderBookEntry {
    /// Create a new entry
    pub fn new(symbol: &str, id: u64, side: Side, price: Decimal, size: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            id,
            side,
            price,
            size,
        }
    }

    /// Create a bid entry
    pub fn bid(symbol: &str, id: u64, price: Decimal, size: u64) -> Self {
        Self::new(symbol, id, Side::Buy, price, size)
    }

    /// Create an ask entry
    pub fn ask(symbol: &str, id: u64, price: Decimal, size: u64) -> Self {
        Self::new(symbol, id, Side::Sell, price, size)
    }

    /// True for bid levels
    pub fn is_bid(&self) -> bool {
        self.side == Side::Buy
    }
}

impl fmt::Display for OrderBookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {} (id {})",
            self.symbol, self.side, self.size, self.price, self.id
        )
    }
}

/// Action carried by a feed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookAction {
    /// Full snapshot replacing all book content
    Partial,

    /// New levels
    Insert,

    /// Size changes on existing levels
    Update,

    /// Removed levels
    Delete,

    /// Unrecognised or missing action
    #[default]
    #[serde(other)]
    Undefined,
}

impl BookAction {
    /// Insert, Update and Delete are incremental diffs
    pub fn is_diff(&self) -> bool {
        matches!(
            self,
            BookAction::Insert | BookAction::Update | BookAction::Delete
        )
    }
}

impl fmt::Display for BookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookAction::Undefined => "undefined",
            BookAction::Partial => "partial",
            BookAction::Insert => "insert",
            BookAction::Update => "update",
            BookAction::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A decoded order book message from the feed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BookEvent {
    /// What to do with the entries
    #[serde(default)]
    pub action: BookAction,

    /// Affected levels; a missing payload decodes as empty
    #[serde(default)]
    pub data: Vec<OrderBookEntry>,
}

impl BookEvent {
    /// Create a new event
    pub fn new(action: BookAction, data: Vec<OrderBookEntry>) -> Self {
        Self { action, data }
    }

    /// Full snapshot event
    pub fn partial(data: Vec<OrderBookEntry>) -> Self {
        Self::new(BookAction::Partial, data)
    }

    /// Insert diff
    pub fn insert(data: Vec<OrderBookEntry>) -> Self {
        Self::new(BookAction::Insert, data)
    }

    /// Update diff
    pub fn update(data: Vec<OrderBookEntry>) -> Self {
        Self::new(BookAction::Update, data)
    }

    /// Delete diff
    pub fn delete(data: Vec<OrderBookEntry>) -> Self {
        Self::new(BookAction::Delete, data)
    }

    /// Whether any entry belongs to `symbol`
    pub fn references(&self, symbol: &str) -> bool {
        self.data.iter().any(|entry| entry.symbol == symbol)
    }
}

/// Split entries into bid and ask lists, keeping only those for `symbol`.
pub fn partition_by_side(
    symbol: &str,
    entries: Vec<OrderBookEntry>,
) -> (Vec<OrderBookEntry>, Vec<OrderBookEntry>) {
    entries
        .into_iter()
        .filter(|entry| entry.symbol == symbol)
        .partition(OrderBookEntry::is_bid)
}
