//! Book synchronization: subscribe, wait for a snapshot, classify and apply
//! feed events under a single writer, and recover from desync with a REST
//! snapshot fetched off the transport thread.

mod cancel;
mod config;
mod error;
mod fallback;
mod feed;
mod outcome;
mod sequence;
mod state;
mod synchronizer;
mod writer;

pub use cancel::CancellationToken;
pub use config::SyncOptions;
pub use error::SyncError;
pub use feed::{
    BookFeed, EventHandler, FeedError, FeedHandle, FeedOwnership, FeedSubscription,
    SnapshotSource,
};
pub use outcome::{
    BookUpdate, BookUpdateListener, EventOutcome, IgnoreReason, SubscriptionId, UpdateKind,
};
pub use sequence::TransactionSequencer;
pub use state::{HealthSnapshot, SyncHealth, SyncStatus};
pub use synchronizer::BookSynchronizer;
