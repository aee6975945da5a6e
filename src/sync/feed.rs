//! Transport contracts consumed by the synchronizer

use crate::orderbook::{BookEvent, OrderBookEntry};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Callback the feed invokes for every decoded book event
pub type EventHandler = Arc<dyn Fn(BookEvent) + Send + Sync>;

/// Failure reported by a transport collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The transport could not deliver the request
    Transport(String),
    /// The exchange refused the request
    Rejected(String),
    /// The transport has been closed
    Closed,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Transport(message) => write!(f, "Transport error: {}", message),
            FeedError::Rejected(message) => write!(f, "Request rejected: {}", message),
            FeedError::Closed => write!(f, "Transport closed"),
        }
    }
}

impl std::error::Error for FeedError {}

/// A live feed subscription
pub trait FeedSubscription: Send + Sync {
    /// Stop delivering events for this subscription
    fn unsubscribe(&self);
}

/// Streaming order book feed
pub trait BookFeed: Send + Sync {
    /// Subscribe to full-depth book updates for `symbol`.
    ///
    /// The handler may be called from any transport thread, including
    /// before this method returns.
    fn subscribe(
        &self,
        symbol: &str,
        handler: EventHandler,
    ) -> Result<Box<dyn FeedSubscription>, FeedError>;

    /// Release the underlying connection
    fn close(&self) {}
}

/// REST snapshot endpoint used to reseed a desynchronized book
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current book for `symbol`; a depth of 0 asks for every level.
    fn get_order_book(&self, symbol: &str, depth: u32) -> Result<Vec<OrderBookEntry>, FeedError>;
}

/// Who is responsible for closing the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOwnership {
    /// Created for this synchronizer alone; closed on dispose
    Owned,
    /// Shared with the caller; left open on dispose
    Borrowed,
}

/// A feed together with its provenance
#[derive(Clone)]
pub struct FeedHandle {
    feed: Arc<dyn BookFeed>,
    ownership: FeedOwnership,
}

impl FeedHandle {
    /// Take exclusive ownership of a feed
    pub fn owned<F>(feed: F) -> Self
    where
        F: BookFeed + 'static,
    {
        Self {
            feed: Arc::new(feed),
            ownership: FeedOwnership::Owned,
        }
    }

    /// Use a feed the caller keeps ownership of
    pub fn borrowed(feed: Arc<dyn BookFeed>) -> Self {
        Self {
            feed,
            ownership: FeedOwnership::Borrowed,
        }
    }

    /// Provenance of the feed
    pub fn ownership(&self) -> FeedOwnership {
        self.ownership
    }

    pub(crate) fn feed(&self) -> &dyn BookFeed {
        self.feed.as_ref()
    }

    /// Close the feed if and only if it is owned
    pub(crate) fn release(&self) {
        match self.ownership {
            FeedOwnership::Owned => {
                debug!("Closing owned feed");
                self.feed.close();
            }
            FeedOwnership::Borrowed => {
                debug!("Leaving borrowed feed open");
            }
        }
    }
}

impl fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedHandle")
            .field("ownership", &self.ownership)
            .finish()
    }
}
