use demos::SimulatedExchange;
use orderbook_sync::{
    BookAction, BookSynchronizer, BookUpdate, CancellationToken, FeedHandle, OrderBookEntry,
    SyncOptions,
};
use pricelevel::setup_logger;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

fn main() {
    setup_logger();
    info!("Order book synchronization demo");

    let exchange = SimulatedExchange::new();
    exchange.list("XBTUSD", Decimal::from(50_000), 5);

    let sync = match BookSynchronizer::new(
        "XBTUSD",
        FeedHandle::borrowed(exchange.clone()),
        exchange.clone(),
        SyncOptions::default(),
    ) {
        Ok(sync) => Arc::new(sync.with_update_listener(|update: &BookUpdate| {
            info!(
                "tx {} {:?}: {} bids / {} asks",
                update.transaction_id, update.kind, update.bid_count, update.ask_count
            );
        })),
        Err(err) => {
            error!("Failed to create synchronizer: {}", err);
            return;
        }
    };

    // The exchange sends its partial shortly after the subscription
    let publisher = Arc::clone(&exchange);
    let partial = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        publisher.publish_partial("XBTUSD");
    });
    match sync.start(Duration::from_secs(10), &CancellationToken::new()) {
        Ok(id) => info!("Subscribed with {}", id),
        Err(err) => {
            error!("Start failed: {}", err);
            return;
        }
    }
    let _ = partial.join();

    exchange.publish_diff(
        BookAction::Update,
        OrderBookEntry::bid("XBTUSD", 1_000, Decimal::new(499_995, 1), 250),
    );
    exchange.publish_diff(
        BookAction::Delete,
        OrderBookEntry::ask("XBTUSD", 2_004, Decimal::new(500_025, 1), 0),
    );
    exchange.publish_diff(
        BookAction::Insert,
        OrderBookEntry::ask("XBTUSD", 2_100, Decimal::new(500_002, 1), 7),
    );

    info!("Book after diffs:\n{}", sync.snapshot(5));

    // Force a resync; the next diff finds the book uninitialized and the
    // REST fallback reseeds it
    let publisher = Arc::clone(&exchange);
    let diff = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        publisher.publish_diff(
            BookAction::Update,
            OrderBookEntry::bid("XBTUSD", 1_001, Decimal::from(49_999), 1),
        );
    });
    match sync.resync(Duration::from_secs(10), &CancellationToken::new()) {
        Ok(_) => info!(
            "Resynced from REST ({} requests served)",
            exchange.rest_requests()
        ),
        Err(err) => error!("Resync failed: {}", err),
    }
    let _ = diff.join();

    let health = sync.health();
    info!(
        "Health: applied={} ignored={} fallback_attempts={} stale={}",
        health.applied_events,
        health.ignored_events,
        health.fallback_attempts,
        sync.is_stale()
    );
    info!("Final book:\n{}", sync.snapshot(3));

    sync.dispose();
}
