use super::ladder;
use criterion::Criterion;
use orderbook_sync::{BookAction, OrderBookEntry, SequencedBook};
use rust_decimal::Decimal;
use std::hint::black_box;

/// Register benchmarks for incremental diffs on a seeded book
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("SequencedBook - Diffs");
    let (bids, asks) = ladder(500);

    group.bench_function("update_existing_level", |b| {
        let book = SequencedBook::new("XBTUSD");
        let _ = book.replace_snapshot(1, &bids, &asks);
        let mut transaction_id = 1;
        b.iter(|| {
            let entry = OrderBookEntry::bid("XBTUSD", 42, Decimal::from(49_957), transaction_id);
            let _ = black_box(book.apply_diff(
                transaction_id,
                transaction_id + 1,
                BookAction::Update,
                &[entry],
                &[],
            ));
            transaction_id += 1;
        })
    });

    group.bench_function("insert_then_delete", |b| {
        let book = SequencedBook::new("XBTUSD");
        let _ = book.replace_snapshot(1, &bids, &asks);
        let mut transaction_id = 1;
        let entry = OrderBookEntry::ask("XBTUSD", 999_999, Decimal::from(60_000), 5);
        b.iter(|| {
            let _ = book.apply_diff(
                transaction_id,
                transaction_id + 1,
                BookAction::Insert,
                &[],
                std::slice::from_ref(&entry),
            );
            let _ = book.apply_diff(
                transaction_id + 1,
                transaction_id + 2,
                BookAction::Delete,
                &[],
                std::slice::from_ref(&entry),
            );
            transaction_id += 2;
        })
    });

    group.bench_function("best_prices", |b| {
        let book = SequencedBook::new("XBTUSD");
        let _ = book.replace_snapshot(1, &bids, &asks);
        b.iter(|| black_box((book.best_bid(), book.best_ask(), book.spread())))
    });

    group.finish();
}
