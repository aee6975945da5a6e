//! Start, timeout, cancellation and disposal

#[cfg(test)]
mod lifecycle_tests {
    use crate::support::{RestSnapshots, ScriptedFeed, SharedFeed, ladder};
    use orderbook_sync::{
        BookEvent, BookFeed, BookSynchronizer, CancellationToken, FeedHandle, SyncError,
        SyncOptions, SyncStatus,
    };
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::{Duration, Instant};

    const SYMBOL: &str = "XBTUSD";

    fn owned(feed: &Arc<ScriptedFeed>) -> BookSynchronizer {
        BookSynchronizer::new(
            SYMBOL,
            FeedHandle::owned(SharedFeed(Arc::clone(feed))),
            RestSnapshots::new(1),
            SyncOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_start_returns_promptly_on_partial() {
        let feed = ScriptedFeed::new();
        let sync = Arc::new(owned(&feed));

        let pusher = Arc::clone(&feed);
        let handle = thread::spawn(move || {
            while !pusher.push(SYMBOL, BookEvent::partial(ladder(SYMBOL, 3, Decimal::from(100)))) {
                thread::sleep(Duration::from_millis(2));
            }
        });

        let started = Instant::now();
        let result = sync.start(Duration::from_secs(10), &CancellationToken::new());
        handle.join().unwrap();

        assert!(result.is_ok());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(sync.status(), SyncStatus::Synced);
        assert!(sync.status().is_ready());
    }

    #[test]
    fn test_start_times_out_after_configured_delay() {
        let feed = ScriptedFeed::new();
        let sync = BookSynchronizer::new(
            SYMBOL,
            FeedHandle::owned(SharedFeed(Arc::clone(&feed))),
            RestSnapshots::new(1),
            SyncOptions::default().with_snapshot_timeout(Duration::from_millis(100)),
        )
        .unwrap();

        let started = Instant::now();
        let result = sync.start_default(&CancellationToken::new());

        match result {
            Err(SyncError::Timeout { symbol, waited }) => {
                assert_eq!(symbol, SYMBOL);
                assert_eq!(waited, Duration::from_millis(100));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(!sync.is_initialized());
    }

    #[test]
    fn test_cancelled_token_returns_immediately() {
        let feed = ScriptedFeed::new();
        let sync = owned(&feed);
        let token = CancellationToken::new();
        token.cancel();

        let started = Instant::now();
        let result = sync.start(Duration::from_secs(30), &token);

        assert_eq!(result, Err(SyncError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        // The subscription was still made
        assert!(feed.is_subscribed(SYMBOL));
    }

    #[test]
    fn test_cancel_interrupts_resync() {
        let feed = ScriptedFeed::new();
        let sync = owned(&feed);
        let _ = sync.start(Duration::from_millis(1), &CancellationToken::new());
        feed.push(SYMBOL, BookEvent::partial(ladder(SYMBOL, 1, Decimal::from(100))));

        let token = CancellationToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            canceller.cancel();
        });
        let result = sync.resync(Duration::from_secs(30), &token);
        handle.join().unwrap();

        assert_eq!(result, Err(SyncError::Cancelled));
        assert!(!sync.is_initialized());
    }

    #[test]
    fn test_owned_feed_closed_once_on_drop() {
        let feed = ScriptedFeed::new();
        {
            let sync = owned(&feed);
            let _ = sync.start(Duration::from_millis(1), &CancellationToken::new());
            sync.dispose();
            sync.dispose();
        }

        assert_eq!(feed.unsubscribes.load(Ordering::SeqCst), 1);
        assert_eq!(feed.closes.load(Ordering::SeqCst), 1);
        assert!(!feed.is_subscribed(SYMBOL));
    }

    #[test]
    fn test_borrowed_feed_survives_disposal() {
        let feed = ScriptedFeed::new();
        let shared: Arc<dyn BookFeed> = feed.clone();
        let first = BookSynchronizer::new(
            SYMBOL,
            FeedHandle::borrowed(Arc::clone(&shared)),
            RestSnapshots::new(1),
            SyncOptions::default(),
        )
        .unwrap();
        let second = BookSynchronizer::new(
            "ETHUSD",
            FeedHandle::borrowed(shared),
            RestSnapshots::new(1),
            SyncOptions::default(),
        )
        .unwrap();
        let _ = first.start(Duration::from_millis(1), &CancellationToken::new());
        let _ = second.start(Duration::from_millis(1), &CancellationToken::new());

        drop(first);

        assert_eq!(feed.closes.load(Ordering::SeqCst), 0);
        assert!(!feed.is_subscribed(SYMBOL));
        assert!(feed.push("ETHUSD", BookEvent::partial(ladder("ETHUSD", 2, Decimal::from(3000)))));
        assert!(second.is_initialized());
    }

    #[test]
    fn test_events_after_dispose_are_dropped() {
        let feed = ScriptedFeed::new();
        let sync = owned(&feed);
        let _ = sync.start(Duration::from_millis(1), &CancellationToken::new());
        sync.dispose();

        // Unsubscribed, so the feed no longer routes anything
        assert!(!feed.push(SYMBOL, BookEvent::partial(ladder(SYMBOL, 1, Decimal::from(100)))));
        assert!(sync.book().is_empty());
        assert_eq!(sync.subscription_id(), None);
        assert_eq!(
            sync.start(Duration::from_millis(1), &CancellationToken::new()),
            Err(SyncError::Disposed)
        );
    }

    #[test]
    fn test_health_reports_staleness() {
        let feed = ScriptedFeed::new();
        let sync = BookSynchronizer::new(
            SYMBOL,
            FeedHandle::owned(SharedFeed(Arc::clone(&feed))),
            RestSnapshots::new(1),
            SyncOptions::default().with_stale_after(Duration::from_millis(20)),
        )
        .unwrap();
        assert!(sync.is_stale());

        let _ = sync.start(Duration::from_millis(1), &CancellationToken::new());
        feed.push(SYMBOL, BookEvent::partial(ladder(SYMBOL, 1, Decimal::from(100))));
        let received = sync.last_message_timestamp().unwrap();
        assert!(sync.last_successful_apply_timestamp().unwrap() >= received);

        thread::sleep(Duration::from_millis(60));
        assert!(sync.is_stale());
    }
}
