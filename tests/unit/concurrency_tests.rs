//! Several books and several producers sharing one process

#[cfg(test)]
mod concurrency_tests {
    use crate::support::{RestSnapshots, ScriptedFeed, ladder};
    use orderbook_sync::{
        BookEvent, BookFeed, BookSynchronizer, BookUpdate, CancellationToken, FeedHandle,
        OrderBookEntry, SyncOptions, TransactionSequencer,
    };
    use rust_decimal::Decimal;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    const SYMBOLS: [&str; 4] = ["XBTUSD", "ETHUSD", "SOLUSD", "XRPUSD"];
    const EVENTS_PER_BOOK: u64 = 200;

    #[test]
    fn test_transaction_ids_increase_across_books() {
        let feed = ScriptedFeed::new();
        let shared: Arc<dyn BookFeed> = feed.clone();
        let mut books = Vec::new();
        let mut logs = Vec::new();

        for symbol in SYMBOLS {
            let log: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&log);
            let sync = BookSynchronizer::new(
                symbol,
                FeedHandle::borrowed(Arc::clone(&shared)),
                RestSnapshots::new(1),
                SyncOptions::default(),
            )
            .unwrap()
            .with_update_listener(move |update: &BookUpdate| {
                sink.lock().unwrap().push(update.transaction_id);
            });
            let _ = sync.start(Duration::from_millis(1), &CancellationToken::new());
            feed.push(symbol, BookEvent::partial(ladder(symbol, 5, Decimal::from(100))));
            books.push(sync);
            logs.push(log);
        }

        let barrier = Arc::new(Barrier::new(SYMBOLS.len()));
        let handles: Vec<_> = SYMBOLS
            .iter()
            .map(|symbol| {
                let feed = Arc::clone(&feed);
                let barrier = Arc::clone(&barrier);
                let symbol = symbol.to_string();
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..EVENTS_PER_BOOK {
                        let entry = OrderBookEntry::bid(&symbol, 100, Decimal::from(99), i + 1);
                        feed.push(&symbol, BookEvent::update(vec![entry]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut all_ids = Vec::new();
        for (sync, log) in books.iter().zip(&logs) {
            let ids = log.lock().unwrap().clone();
            assert_eq!(ids.len() as u64, EVENTS_PER_BOOK + 1);
            assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
            assert_eq!(sync.last_transaction_id(), *ids.last().unwrap());
            assert_eq!(sync.book().level(100).unwrap().size, EVENTS_PER_BOOK);
            all_ids.extend(ids);
        }

        // Ids are unique process-wide
        let total = all_ids.len();
        all_ids.sort_unstable();
        all_ids.dedup();
        assert_eq!(all_ids.len(), total);
        assert!(TransactionSequencer::global().last() >= *all_ids.last().unwrap());
    }

    #[test]
    fn test_concurrent_producers_on_one_book() {
        let feed = ScriptedFeed::new();
        let shared: Arc<dyn BookFeed> = feed.clone();
        let sync = Arc::new(
            BookSynchronizer::new(
                "XBTUSD",
                FeedHandle::borrowed(shared),
                RestSnapshots::new(1),
                SyncOptions::default(),
            )
            .unwrap(),
        );
        let _ = sync.start(Duration::from_millis(1), &CancellationToken::new());
        sync.on_event(BookEvent::partial(ladder("XBTUSD", 1, Decimal::from(100))));

        let producers = 4u64;
        let handles: Vec<_> = (0..producers)
            .map(|producer| {
                let sync = Arc::clone(&sync);
                thread::spawn(move || {
                    for i in 0..100u64 {
                        let id = 10_000 + producer * 1_000 + i;
                        let entry = OrderBookEntry::ask("XBTUSD", id, Decimal::from(200 + i), 1);
                        sync.on_event(BookEvent::insert(vec![entry]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Every insert landed and no change was rejected
        assert_eq!(sync.book().ask_count(), 1 + 400);
        let health = sync.health();
        assert_eq!(health.apply_failures, 0);
        assert_eq!(health.applied_events, 401);
        assert_eq!(sync.book().last_transaction_id(), sync.last_transaction_id());
    }
}
