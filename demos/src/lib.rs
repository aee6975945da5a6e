//! In-process exchange used by the demo binaries.
//!
//! Frames are produced as JSON text and decoded the way a WebSocket
//! transport would before handing them to the synchronizer.

use dashmap::DashMap;
use orderbook_sync::sync::EventHandler;
use orderbook_sync::{
    BookAction, BookEvent, BookFeed, FeedError, FeedSubscription, OrderBookEntry, SnapshotSource,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Levels kept by the simulated exchange for one symbol
struct Venue {
    levels: DashMap<u64, OrderBookEntry>,
}

/// A toy exchange that publishes book frames and serves REST snapshots
#[derive(Default)]
pub struct SimulatedExchange {
    venues: DashMap<String, Arc<Venue>>,
    handlers: Arc<DashMap<String, EventHandler>>,
    rest_requests: AtomicU64,
}

struct Subscription {
    symbol: String,
    handlers: Arc<DashMap<String, EventHandler>>,
}

impl FeedSubscription for Subscription {
    fn unsubscribe(&self) {
        self.handlers.remove(&self.symbol);
        debug!("Unsubscribed from {}", self.symbol);
    }
}

impl SimulatedExchange {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// List `symbol` with `depth` levels per side around `mid`
    pub fn list(&self, symbol: &str, mid: Decimal, depth: u64) {
        let venue = Venue {
            levels: DashMap::new(),
        };
        for i in 0..depth {
            let offset = Decimal::from(i + 1) / Decimal::TWO;
            let bid = OrderBookEntry::bid(symbol, 1_000 + i, mid - offset, 100 + i);
            let ask = OrderBookEntry::ask(symbol, 2_000 + i, mid + offset, 100 + i);
            venue.levels.insert(bid.id, bid);
            venue.levels.insert(ask.id, ask);
        }
        self.venues.insert(symbol.to_string(), Arc::new(venue));
    }

    /// Publish the full book as a partial frame
    pub fn publish_partial(&self, symbol: &str) {
        let Some(venue) = self.venue(symbol) else {
            return;
        };
        let data = venue
            .levels
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.publish(symbol, BookEvent::partial(data));
    }

    /// Apply a change on the venue and publish it as a diff frame
    pub fn publish_diff(&self, action: BookAction, entry: OrderBookEntry) {
        let Some(venue) = self.venue(&entry.symbol) else {
            return;
        };
        match action {
            BookAction::Delete => {
                venue.levels.remove(&entry.id);
            }
            _ => {
                venue.levels.insert(entry.id, entry.clone());
            }
        }
        let symbol = entry.symbol.clone();
        self.publish(&symbol, BookEvent::new(action, vec![entry]));
    }

    /// Number of REST snapshots served
    pub fn rest_requests(&self) -> u64 {
        self.rest_requests.load(Ordering::Relaxed)
    }

    fn venue(&self, symbol: &str) -> Option<Arc<Venue>> {
        self.venues.get(symbol).map(|venue| Arc::clone(venue.value()))
    }

    fn publish(&self, symbol: &str, event: BookEvent) {
        let frame = match serde_json::to_string(&event) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("Failed to encode frame: {}", err);
                return;
            }
        };
        let handler = self.handlers.get(symbol).map(|h| Arc::clone(h.value()));
        if let Some(handler) = handler {
            match serde_json::from_str::<BookEvent>(&frame) {
                Ok(event) => handler(event),
                Err(err) => warn!("Dropping undecodable frame: {}", err),
            }
        }
    }
}

impl BookFeed for SimulatedExchange {
    fn subscribe(
        &self,
        symbol: &str,
        handler: EventHandler,
    ) -> Result<Box<dyn FeedSubscription>, FeedError> {
        if self.venue(symbol).is_none() {
            return Err(FeedError::Rejected(format!("unknown symbol {}", symbol)));
        }
        self.handlers.insert(symbol.to_string(), handler);
        Ok(Box::new(Subscription {
            symbol: symbol.to_string(),
            handlers: Arc::clone(&self.handlers),
        }))
    }

    fn close(&self) {
        self.handlers.clear();
        debug!("Exchange connection closed");
    }
}

impl SnapshotSource for SimulatedExchange {
    fn get_order_book(&self, symbol: &str, depth: u32) -> Result<Vec<OrderBookEntry>, FeedError> {
        self.rest_requests.fetch_add(1, Ordering::Relaxed);
        let venue = self
            .venue(symbol)
            .ok_or_else(|| FeedError::Rejected(format!("unknown symbol {}", symbol)))?;
        let (mut bids, mut asks): (Vec<OrderBookEntry>, Vec<OrderBookEntry>) = venue
            .levels
            .iter()
            .map(|entry| entry.value().clone())
            .partition(OrderBookEntry::is_bid);
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        if depth > 0 {
            bids.truncate(depth as usize);
            asks.truncate(depth as usize);
        }
        let mut levels = bids;
        levels.extend(asks);
        Ok(levels)
    }
}
