//! Synchronizer error types

use super::feed::FeedError;
use crate::orderbook::OrderBookError;
use std::fmt;
use std::time::Duration;

/// Errors surfaced by caller-invoked synchronizer operations.
///
/// Feed-driven failures (fallback fetches, apply errors) are logged and
/// absorbed by the event path; the `FallbackFetch` and `Apply` variants
/// exist for the fallback worker and for callers applying snapshots
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The feed subscribe call failed
    Subscription(FeedError),

    /// No snapshot was applied within the allotted time
    Timeout {
        /// Symbol being synchronized
        symbol: String,
        /// How long the call waited
        waited: Duration,
    },

    /// The wait was cancelled before a snapshot was applied
    Cancelled,

    /// `start` was called on a synchronizer that already subscribed
    AlreadyStarted,

    /// The synchronizer has been disposed
    Disposed,

    /// The REST snapshot used for recovery could not be fetched
    FallbackFetch(FeedError),

    /// A change could not be applied to the book
    Apply(OrderBookError),

    /// The fallback worker thread could not be started
    WorkerSpawn(String),

    /// Options failed validation
    InvalidOptions {
        /// Description of the problem
        message: String,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Subscription(err) => write!(f, "Subscription failed: {}", err),
            SyncError::Timeout { symbol, waited } => {
                write!(
                    f,
                    "No snapshot for {} within {} ms",
                    symbol,
                    waited.as_millis()
                )
            }
            SyncError::Cancelled => write!(f, "Wait for snapshot cancelled"),
            SyncError::AlreadyStarted => write!(f, "Synchronizer already started"),
            SyncError::Disposed => write!(f, "Synchronizer disposed"),
            SyncError::FallbackFetch(err) => write!(f, "Fallback snapshot fetch failed: {}", err),
            SyncError::Apply(err) => write!(f, "Failed to apply book change: {}", err),
            SyncError::WorkerSpawn(message) => {
                write!(f, "Failed to start fallback worker: {}", message)
            }
            SyncError::InvalidOptions { message } => write!(f, "Invalid options: {}", message),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Subscription(err) | SyncError::FallbackFetch(err) => Some(err),
            SyncError::Apply(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OrderBookError> for SyncError {
    fn from(err: OrderBookError) -> Self {
        SyncError::Apply(err)
    }
}
