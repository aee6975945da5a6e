//! What happened to an event, and what listeners are told about it

use crate::orderbook::{BookAction, DiffSummary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier handed out for a feed subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        SubscriptionId(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an event was dropped without touching the book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The action was missing or unknown
    UndefinedAction,
    /// The event carried no entries
    EmptyPayload,
    /// No entry belonged to the synchronized symbol
    OtherSymbol,
    /// The synchronizer has been disposed
    Disposed,
}

/// Result of feeding one event to the synchronizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Filtered out before any state was touched
    Ignored(IgnoreReason),
    /// A partial snapshot replaced the book
    SnapshotApplied {
        /// Transaction id issued for the snapshot
        transaction_id: u64,
    },
    /// A diff was applied to an initialized book
    DiffApplied {
        /// Transaction id issued for the diff
        transaction_id: u64,
        /// What the diff did
        summary: DiffSummary,
    },
    /// A diff arrived before any snapshot; a REST fallback was queued
    FallbackRequested,
    /// A diff arrived before any snapshot and the fallback queue was full
    FallbackDropped,
    /// The change was rejected by the book; state is unchanged
    ApplyFailed,
}

impl EventOutcome {
    /// Whether the book was modified
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            EventOutcome::SnapshotApplied { .. } | EventOutcome::DiffApplied { .. }
        )
    }
}

/// Origin of an applied change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Partial snapshot from the feed
    Snapshot,
    /// Snapshot fetched over REST after a desync
    Fallback,
    /// Incremental diff from the feed
    Diff(BookAction),
}

/// Notification sent to listeners after every applied change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookUpdate {
    /// Symbol of the book
    pub symbol: String,
    /// Transaction id of the change
    pub transaction_id: u64,
    /// Where the change came from
    pub kind: UpdateKind,
    /// Bid levels after the change
    pub bid_count: usize,
    /// Ask levels after the change
    pub ask_count: usize,
}

/// Callback invoked after each applied change, outside the writer lock
pub type BookUpdateListener = Arc<dyn Fn(&BookUpdate) + Send + Sync>;
