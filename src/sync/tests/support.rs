#[cfg(test)]
pub(crate) mod helpers {
    use crate::orderbook::{BookEvent, OrderBookEntry};
    use crate::sync::{BookFeed, EventHandler, FeedError, FeedSubscription, SnapshotSource};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    pub(crate) const SYMBOL: &str = "XBTUSD";

    /// Feed that hands its handler back to the test
    #[derive(Default)]
    pub(crate) struct MockFeed {
        pub handler: Mutex<Option<EventHandler>>,
        pub subscribes: AtomicUsize,
        pub unsubscribes: Arc<AtomicUsize>,
        pub closes: AtomicUsize,
        pub fail_subscribe: AtomicBool,
        pub partial_on_subscribe: Mutex<Option<BookEvent>>,
    }

    struct MockSubscription {
        unsubscribes: Arc<AtomicUsize>,
    }

    impl FeedSubscription for MockSubscription {
        fn unsubscribe(&self) {
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl MockFeed {
        pub(crate) fn emit(&self, event: BookEvent) {
            let handler = self.handler.lock().unwrap().clone();
            if let Some(handler) = handler {
                handler(event);
            }
        }
    }

    impl BookFeed for MockFeed {
        fn subscribe(
            &self,
            _symbol: &str,
            handler: EventHandler,
        ) -> Result<Box<dyn FeedSubscription>, FeedError> {
            self.subscribes.fetch_add(1, Ordering::SeqCst);
            if self.fail_subscribe.load(Ordering::SeqCst) {
                return Err(FeedError::Transport("connection refused".to_string()));
            }
            let primed = self.partial_on_subscribe.lock().unwrap().take();
            if let Some(event) = primed {
                handler(event);
            }
            *self.handler.lock().unwrap() = Some(handler);
            Ok(Box::new(MockSubscription {
                unsubscribes: Arc::clone(&self.unsubscribes),
            }))
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl BookFeed for Arc<MockFeed> {
        fn subscribe(
            &self,
            symbol: &str,
            handler: EventHandler,
        ) -> Result<Box<dyn FeedSubscription>, FeedError> {
            self.as_ref().subscribe(symbol, handler)
        }

        fn close(&self) {
            self.as_ref().close()
        }
    }

    /// REST endpoint returning `levels` bids and `levels` asks
    pub(crate) struct MockSnapshots {
        pub calls: AtomicUsize,
        pub fail: AtomicBool,
        pub levels: u64,
    }

    impl MockSnapshots {
        pub(crate) fn new(levels: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                levels,
            }
        }

        pub(crate) fn failing() -> Self {
            let source = Self::new(0);
            source.fail.store(true, Ordering::SeqCst);
            source
        }
    }

    impl SnapshotSource for MockSnapshots {
        fn get_order_book(
            &self,
            symbol: &str,
            _depth: u32,
        ) -> Result<Vec<OrderBookEntry>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(FeedError::Rejected("rate limited".to_string()));
            }
            Ok(ladder(symbol, self.levels))
        }
    }

    /// `levels` bids below 1000 and `levels` asks above it
    pub(crate) fn ladder(symbol: &str, levels: u64) -> Vec<OrderBookEntry> {
        let mut entries = Vec::new();
        for i in 0..levels {
            let offset = Decimal::from(i + 1);
            entries.push(OrderBookEntry::bid(
                symbol,
                1_000 + i,
                Decimal::from(1_000) - offset,
                10,
            ));
            entries.push(OrderBookEntry::ask(
                symbol,
                2_000 + i,
                Decimal::from(1_000) + offset,
                10,
            ));
        }
        entries
    }
}
