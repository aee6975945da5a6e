//! Scripted exchange used by the integration tests

use dashmap::DashMap;
use orderbook_sync::{
    BookEvent, BookFeed, FeedError, FeedSubscription, OrderBookEntry, SnapshotSource,
};
use orderbook_sync::sync::EventHandler;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Feed that routes events to the handler subscribed for each symbol
#[derive(Default)]
pub struct ScriptedFeed {
    handlers: Arc<DashMap<String, EventHandler>>,
    pub unsubscribes: Arc<AtomicUsize>,
    pub closes: AtomicUsize,
}

struct ScriptedSubscription {
    symbol: String,
    handlers: Arc<DashMap<String, EventHandler>>,
    unsubscribes: Arc<AtomicUsize>,
}

impl FeedSubscription for ScriptedSubscription {
    fn unsubscribe(&self) {
        self.handlers.remove(&self.symbol);
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScriptedFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver `event` to the handler for `symbol`, if subscribed
    pub fn push(&self, symbol: &str, event: BookEvent) -> bool {
        let handler = self.handlers.get(symbol).map(|entry| Arc::clone(entry.value()));
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.handlers.contains_key(symbol)
    }
}

impl BookFeed for ScriptedFeed {
    fn subscribe(
        &self,
        symbol: &str,
        handler: EventHandler,
    ) -> Result<Box<dyn FeedSubscription>, FeedError> {
        self.handlers.insert(symbol.to_string(), handler);
        Ok(Box::new(ScriptedSubscription {
            symbol: symbol.to_string(),
            handlers: Arc::clone(&self.handlers),
            unsubscribes: Arc::clone(&self.unsubscribes),
        }))
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Owned wrapper so a test can keep observing a feed it hands over
pub struct SharedFeed(pub Arc<ScriptedFeed>);

impl BookFeed for SharedFeed {
    fn subscribe(
        &self,
        symbol: &str,
        handler: EventHandler,
    ) -> Result<Box<dyn FeedSubscription>, FeedError> {
        self.0.subscribe(symbol, handler)
    }

    fn close(&self) {
        self.0.close()
    }
}

/// REST endpoint serving a fixed ladder, or failing on demand
pub struct RestSnapshots {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    levels: u64,
}

impl RestSnapshots {
    pub fn new(levels: u64) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            levels,
        })
    }

    pub fn failing() -> Arc<Self> {
        let source = Self::new(0);
        source.fail.store(true, Ordering::SeqCst);
        source
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for RestSnapshots {
    fn get_order_book(&self, symbol: &str, _depth: u32) -> Result<Vec<OrderBookEntry>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedError::Transport("503 Service Unavailable".to_string()));
        }
        Ok(ladder(symbol, self.levels, Decimal::from(100)))
    }
}

/// `levels` bids and asks spaced one tick around `mid`. Bid ids start at
/// 100, ask ids at 200.
pub fn ladder(symbol: &str, levels: u64, mid: Decimal) -> Vec<OrderBookEntry> {
    let mut entries = Vec::new();
    for i in 0..levels {
        let offset = Decimal::from(i + 1);
        entries.push(OrderBookEntry::bid(symbol, 100 + i, mid - offset, 10 * (i + 1)));
        entries.push(OrderBookEntry::ask(symbol, 200 + i, mid + offset, 10 * (i + 1)));
    }
    entries
}
