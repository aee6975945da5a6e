//! # Order Book Synchronization
//!
//! A local limit order book kept in step with an exchange's incremental
//! WebSocket feed. The exchange publishes a `partial` snapshot followed by
//! `insert`, `update` and `delete` diffs keyed by a composite level id; this
//! crate applies them in receipt order under a single writer and recovers
//! when the stream cannot be trusted.
//!
//! ## Key Features
//!
//! - **Sequenced Book**: [`SequencedBook`] stores levels per side keyed by
//!   composite id. Every snapshot and diff carries a transaction id and the
//!   book rejects ids that do not advance.
//!
//! - **Process-wide Transaction Ids**: [`TransactionSequencer::global`] hands
//!   out strictly increasing ids shared by every book in the process, so
//!   changes across books can be ordered.
//!
//! - **Single-Writer Synchronizer**: [`BookSynchronizer`] filters events by
//!   action, payload and symbol, applies partials and diffs under one lock,
//!   and records lock-free health timestamps for staleness monitoring.
//!
//! - **REST Fallback**: a diff that arrives before any snapshot queues a REST
//!   snapshot fetch on a dedicated worker thread. The transport thread is
//!   never blocked and the writer lock is not held across the network call.
//!
//! - **Blocking Start and Resync**: [`BookSynchronizer::start`] and
//!   [`BookSynchronizer::resync`] wait on a condition variable for the next
//!   snapshot, with a timeout and a [`CancellationToken`].
//!
//! - **Explicit Feed Ownership**: [`FeedHandle`] records whether the feed is
//!   owned or borrowed; disposal unsubscribes exactly once and closes only an
//!   owned feed.
//!
//! ## Example
//!
//! ```rust,ignore
//! use orderbook_sync::{BookSynchronizer, CancellationToken, FeedHandle, SyncOptions};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let sync = BookSynchronizer::new(
//!     "XBTUSD",
//!     FeedHandle::borrowed(feed),
//!     Arc::new(rest_client),
//!     SyncOptions::default(),
//! )?;
//! sync.start(Duration::from_secs(10), &CancellationToken::new())?;
//!
//! let top = sync.snapshot(10);
//! println!("{}", top);
//! ```
//!
//! ## Transport
//!
//! The crate does not open sockets or parse exchange messages. A transport
//! implements [`BookFeed`] (subscribe with a callback, unsubscribe, close) and
//! [`SnapshotSource`] (REST depth snapshot) and hands decoded [`BookEvent`]s
//! to the callback.

pub mod orderbook;
pub mod sync;

mod utils;

pub use orderbook::{
    BookAction, BookEvent, BookSnapshot, DiffSummary, OrderBookEntry, OrderBookError,
    SequencedBook,
};
pub use sync::{
    BookFeed, BookSynchronizer, BookUpdate, CancellationToken, EventOutcome, FeedError,
    FeedHandle, FeedOwnership, FeedSubscription, HealthSnapshot, IgnoreReason, SnapshotSource,
    SubscriptionId, SyncError, SyncOptions, SyncStatus, TransactionSequencer, UpdateKind,
};
pub use utils::current_time_millis;
