//! Sequenced order book: price levels keyed by composite id, mutated by
//! snapshot replace and incremental diffs that each carry a transaction id.

pub mod book;
mod entry;
mod error;
mod snapshot;

pub use book::{DiffSummary, SequencedBook};
pub use entry::{BookAction, BookEvent, OrderBookEntry, partition_by_side};
pub use error::OrderBookError;
pub use snapshot::BookSnapshot;
