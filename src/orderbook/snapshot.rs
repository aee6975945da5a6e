//! Order book snapshot for market data

use super::entry::OrderBookEntry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// A snapshot of the order book state at a specific point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// The symbol or identifier for this order book
    pub symbol: String,

    /// Last transaction applied when the snapshot was taken
    pub transaction_id: u64,

    /// Timestamp when the snapshot was created (milliseconds since epoch)
    pub timestamp: u64,

    /// Bid levels, best first
    pub bids: Vec<OrderBookEntry>,

    /// Ask levels, best first
    pub asks: Vec<OrderBookEntry>,
}

impl BookSnapshot {
    /// Get the best bid price and size
    pub fn best_bid(&self) -> Option<(Decimal, u64)> {
        let bid = self.bids.first().map(|level| (level.price, level.size));
        trace!("best_bid: {:?}", bid);
        bid
    }

    /// Get the best ask price and size
    pub fn best_ask(&self) -> Option<(Decimal, u64)> {
        let ask = self.asks.first().map(|level| (level.price, level.size));
        trace!("best_ask: {:?}", ask);
        ask
    }

    /// Get the mid price (average of best bid and best ask)
    pub fn mid_price(&self) -> Option<Decimal> {
        let mid_price = match (self.best_bid(), self.best_ask()) {
            (Some((bid_price, _)), Some((ask_price, _))) => {
                Some((bid_price + ask_price) / Decimal::TWO)
            }
            _ => None,
        };
        trace!("mid_price: {:?}", mid_price);
        mid_price
    }

    /// Get the spread (best ask - best bid)
    pub fn spread(&self) -> Option<Decimal> {
        let spread = match (self.best_bid(), self.best_ask()) {
            (Some((bid_price, _)), Some((ask_price, _))) => Some(ask_price - bid_price),
            _ => None,
        };
        trace!("spread: {:?}", spread);
        spread
    }

    /// Calculate the total size on the bid side
    pub fn total_bid_size(&self) -> u64 {
        let size = self.bids.iter().map(|level| level.size).sum();
        trace!("total_bid_size: {:?}", size);
        size
    }

    /// Calculate the total size on the ask side
    pub fn total_ask_size(&self) -> u64 {
        let size = self.asks.iter().map(|level| level.size).sum();
        trace!("total_ask_size: {:?}", size);
        size
    }

    /// Calculate the notional on the bid side (price * size)
    pub fn total_bid_value(&self) -> Decimal {
        self.bids
            .iter()
            .map(|level| level.price * Decimal::from(level.size))
            .sum()
    }

    /// Calculate the notional on the ask side (price * size)
    pub fn total_ask_value(&self) -> Decimal {
        self.asks
            .iter()
            .map(|level| level.price * Decimal::from(level.size))
            .sum()
    }

    /// Serialize the snapshot as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for BookSnapshot {
    /// Renders asks above bids, best levels nearest the middle.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} @ tx {}", self.symbol, self.transaction_id)?;
        writeln!(f, "  asks:")?;
        for level in self.asks.iter().rev() {
            writeln!(f, "    {:>14} x {}", level.price, level.size)?;
        }
        writeln!(f, "  bids:")?;
        for level in &self.bids {
            writeln!(f, "    {:>14} x {}", level.price, level.size)?;
        }
        Ok(())
    }
}
