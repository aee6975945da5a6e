use demos::SimulatedExchange;
use orderbook_sync::{
    BookAction, BookFeed, BookSynchronizer, CancellationToken, FeedHandle, OrderBookEntry,
    SyncOptions, TransactionSequencer,
};
use pricelevel::setup_logger;
use rust_decimal::Decimal;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

const SYMBOLS: [(&str, i64); 4] = [
    ("XBTUSD", 50_000),
    ("ETHUSD", 3_000),
    ("SOLUSD", 150),
    ("XRPUSD", 1),
];
const DIFFS_PER_SYMBOL: u64 = 20_000;

fn main() {
    setup_logger();
    info!("Multi-book synchronization test");
    info!("Symbols: {}", SYMBOLS.len());
    info!("Diffs per symbol: {}", DIFFS_PER_SYMBOL);

    let exchange = SimulatedExchange::new();
    let feed: Arc<dyn BookFeed> = exchange.clone();
    let mut books = Vec::new();

    for (symbol, mid) in SYMBOLS {
        exchange.list(symbol, Decimal::from(mid), 50);
        let sync = match BookSynchronizer::new(
            symbol,
            FeedHandle::borrowed(Arc::clone(&feed)),
            exchange.clone(),
            SyncOptions::default(),
        ) {
            Ok(sync) => sync,
            Err(err) => {
                error!("Failed to create {}: {}", symbol, err);
                return;
            }
        };
        // No partial is published; the first diff seeds each book from REST
        let _ = sync.start(Duration::from_millis(10), &CancellationToken::new());
        books.push(sync);
    }

    let barrier = Arc::new(Barrier::new(SYMBOLS.len() + 1));
    let handles: Vec<_> = SYMBOLS
        .iter()
        .map(|(symbol, mid)| {
            let exchange = Arc::clone(&exchange);
            let barrier = Arc::clone(&barrier);
            let symbol = symbol.to_string();
            let mid = Decimal::from(*mid);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..DIFFS_PER_SYMBOL {
                    let id = 1_000 + i % 50;
                    let price = mid - Decimal::from(id - 999) / Decimal::TWO;
                    exchange.publish_diff(
                        BookAction::Update,
                        OrderBookEntry::bid(&symbol, id, price, 1 + i % 500),
                    );
                }
            })
        })
        .collect();

    barrier.wait();
    let start = Instant::now();
    for handle in handles {
        let _ = handle.join();
    }
    let elapsed = start.elapsed();

    for sync in &books {
        let health = sync.health();
        info!(
            "{}: status={} tx={} applied={} fallback_attempts={}",
            sync.symbol(),
            sync.status(),
            sync.last_transaction_id(),
            health.applied_events,
            health.fallback_attempts
        );
    }

    let total = DIFFS_PER_SYMBOL * SYMBOLS.len() as u64;
    info!(
        "{} diffs in {:.2?} ({:.0} diffs/s), last transaction id {}",
        total,
        elapsed,
        total as f64 / elapsed.as_secs_f64(),
        TransactionSequencer::global().last()
    );
    info!("REST snapshots served: {}", exchange.rest_requests());
}
