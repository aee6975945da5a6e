//! Sequenced order book keyed by composite level id

use super::entry::{BookAction, OrderBookEntry};
use super::error::OrderBookError;
use super::snapshot::BookSnapshot;
use crate::utils::current_time_millis;
use dashmap::DashMap;
use pricelevel::Side;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Counts of what a single diff did to the book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Levels that did not exist before
    pub inserted: usize,
    /// Existing levels whose size or price changed
    pub updated: usize,
    /// Levels removed by a delete or a zero size
    pub removed: usize,
    /// Deletes that targeted an unknown level
    pub ignored: usize,
}

/// The SequencedBook stores the price levels of one instrument, keyed by the
/// exchange's composite level id rather than by price.
///
/// Every mutation carries a transaction id. The book refuses ids that do not
/// advance past the last one it applied, so a consumer holding the last id
/// can detect gaps. Mutations take `&self`; callers are expected to serialize
/// writers while readers may query concurrently.
pub struct SequencedBook {
    /// The symbol or identifier for this order book
    pub(super) symbol: String,

    /// Bid levels keyed by composite id
    pub(super) bids: DashMap<u64, OrderBookEntry>,

    /// Ask levels keyed by composite id
    pub(super) asks: DashMap<u64, OrderBookEntry>,

    /// Side each known level currently rests on
    pub(super) level_sides: DashMap<u64, Side>,

    /// Last transaction id applied, 0 before the first snapshot
    last_transaction_id: AtomicU64,

    /// Timestamp of the last mutation (milliseconds since epoch)
    last_update_time: AtomicU64,
}

impl SequencedBook {
    /// Create a new empty book for the given symbol
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: DashMap::new(),
            asks: DashMap::new(),
            level_sides: DashMap::new(),
            last_transaction_id: AtomicU64::new(0),
            last_update_time: AtomicU64::new(0),
        }
    }

    /// Get the symbol of this order book
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Last transaction id applied to the book
    pub fn last_transaction_id(&self) -> u64 {
        self.last_transaction_id.load(Ordering::Acquire)
    }

    /// Time of the last mutation in milliseconds, if any
    pub fn last_update_time(&self) -> Option<u64> {
        match self.last_update_time.load(Ordering::Relaxed) {
            0 => None,
            millis => Some(millis),
        }
    }

    /// Replace the whole book with a snapshot.
    ///
    /// Prior content is discarded, not merged. Levels with zero size are
    /// skipped.
    pub fn replace_snapshot(
        &self,
        transaction_id: u64,
        bids: &[OrderBookEntry],
        asks: &[OrderBookEntry],
    ) -> Result<(), OrderBookError> {
        self.check_advances(transaction_id)?;
        self.validate_entries(bids, Side::Buy)?;
        self.validate_entries(asks, Side::Sell)?;

        self.bids.clear();
        self.asks.clear();
        self.level_sides.clear();

        for entry in bids.iter().chain(asks.iter()) {
            if entry.size == 0 {
                continue;
            }
            self.book_side(entry.side).insert(entry.id, entry.clone());
            self.level_sides.insert(entry.id, entry.side);
        }

        self.commit(transaction_id);
        trace!(
            "Order book {}: snapshot {} with {} bids and {} asks",
            self.symbol,
            transaction_id,
            self.bids.len(),
            self.asks.len()
        );
        Ok(())
    }

    /// Apply an incremental diff.
    ///
    /// `previous_transaction_id` must be the last id the book applied and
    /// `transaction_id` must be greater. Insert and Update upsert by id (an
    /// unknown id is inserted) and a zero size removes the level. Delete
    /// removes by id whatever the size and ignores unknown ids.
    pub fn apply_diff(
        &self,
        previous_transaction_id: u64,
        transaction_id: u64,
        action: BookAction,
        bids: &[OrderBookEntry],
        asks: &[OrderBookEntry],
    ) -> Result<DiffSummary, OrderBookError> {
        if !action.is_diff() {
            return Err(OrderBookError::InvalidAction(action));
        }

        let last = self.last_transaction_id();
        if previous_transaction_id != last {
            return Err(OrderBookError::OutOfSequence {
                expected: last,
                received: previous_transaction_id,
            });
        }
        self.check_advances(transaction_id)?;
        self.validate_entries(bids, Side::Buy)?;
        self.validate_entries(asks, Side::Sell)?;

        let mut summary = DiffSummary::default();
        for entry in bids.iter().chain(asks.iter()) {
            if action == BookAction::Delete || entry.size == 0 {
                if self.remove_level(entry.id) {
                    summary.removed += 1;
                } else {
                    summary.ignored += 1;
                }
            } else if self.upsert_level(entry) {
                summary.updated += 1;
            } else {
                summary.inserted += 1;
            }
        }

        self.commit(transaction_id);
        trace!(
            "Order book {}: {} {} -> {} {:?}",
            self.symbol, action, previous_transaction_id, transaction_id, summary
        );
        Ok(summary)
    }

    /// Get a level by composite id
    pub fn level(&self, id: u64) -> Option<OrderBookEntry> {
        let side = *self.level_sides.get(&id)?;
        self.book_side(side).get(&id).map(|entry| entry.value().clone())
    }

    /// Get the best bid price and size, if any
    pub fn best_bid(&self) -> Option<(Decimal, u64)> {
        self.bids
            .iter()
            .map(|item| (item.price, item.size))
            .max_by(|a, b| a.0.cmp(&b.0))
    }

    /// Get the best ask price and size, if any
    pub fn best_ask(&self) -> Option<(Decimal, u64)> {
        self.asks
            .iter()
            .map(|item| (item.price, item.size))
            .min_by(|a, b| a.0.cmp(&b.0))
    }

    /// Get the spread (best ask - best bid)
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    /// Get the mid price (average of best bid and best ask)
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Number of bid levels
    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    /// Number of ask levels
    pub fn ask_count(&self) -> usize {
        self.asks.len()
    }

    /// Total number of levels on both sides
    pub fn level_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    /// True when the book holds no levels
    pub fn is_empty(&self) -> bool {
        self.level_count() == 0
    }

    /// All bid levels, best (highest price) first
    pub fn bids(&self) -> Vec<OrderBookEntry> {
        let mut levels: Vec<OrderBookEntry> =
            self.bids.iter().map(|item| item.value().clone()).collect();
        levels.sort_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id)));
        levels
    }

    /// All ask levels, best (lowest price) first
    pub fn asks(&self) -> Vec<OrderBookEntry> {
        let mut levels: Vec<OrderBookEntry> =
            self.asks.iter().map(|item| item.value().clone()).collect();
        levels.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id)));
        levels
    }

    /// Create a snapshot of the current book, `depth` levels per side.
    /// A depth of 0 means every level.
    pub fn create_snapshot(&self, depth: usize) -> BookSnapshot {
        let mut bids = self.bids();
        let mut asks = self.asks();
        if depth > 0 {
            bids.truncate(depth);
            asks.truncate(depth);
        }

        BookSnapshot {
            symbol: self.symbol.clone(),
            transaction_id: self.last_transaction_id(),
            timestamp: current_time_millis(),
            bids,
            asks,
        }
    }

    /// Drop every level. The transaction id is kept so later changes still
    /// have to advance past it.
    pub fn clear(&self) {
        self.bids.clear();
        self.asks.clear();
        self.level_sides.clear();
        trace!("Order book {}: cleared", self.symbol);
    }

    fn book_side(&self, side: Side) -> &DashMap<u64, OrderBookEntry> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn check_advances(&self, transaction_id: u64) -> Result<(), OrderBookError> {
        let last = self.last_transaction_id();
        if transaction_id <= last {
            return Err(OrderBookError::StaleTransaction {
                last,
                received: transaction_id,
            });
        }
        Ok(())
    }

    fn validate_entries(
        &self,
        entries: &[OrderBookEntry],
        expected: Side,
    ) -> Result<(), OrderBookError> {
        for entry in entries {
            if entry.side != expected {
                return Err(OrderBookError::SideMismatch {
                    id: entry.id,
                    expected,
                    found: entry.side,
                });
            }
            if entry.symbol != self.symbol {
                return Err(OrderBookError::SymbolMismatch {
                    expected: self.symbol.clone(),
                    found: entry.symbol.clone(),
                });
            }
            if entry.price < Decimal::ZERO {
                return Err(OrderBookError::InvalidPrice {
                    id: entry.id,
                    price: entry.price,
                });
            }
        }
        Ok(())
    }

    /// Returns true when the level already existed
    fn upsert_level(&self, entry: &OrderBookEntry) -> bool {
        // A level that flipped side is moved, not duplicated
        let previous_side = self.level_sides.insert(entry.id, entry.side);
        if let Some(previous) = previous_side {
            if previous != entry.side {
                self.book_side(previous).remove(&entry.id);
            }
        }
        self.book_side(entry.side).insert(entry.id, entry.clone());
        previous_side.is_some()
    }

    /// Returns true when a level was removed
    fn remove_level(&self, id: u64) -> bool {
        match self.level_sides.remove(&id) {
            Some((_, side)) => self.book_side(side).remove(&id).is_some(),
            None => false,
        }
    }

    fn commit(&self, transaction_id: u64) {
        self.last_transaction_id
            .store(transaction_id, Ordering::Release);
        self.last_update_time
            .store(current_time_millis(), Ordering::Relaxed);
    }
}
