//! REST snapshot fallback run on a dedicated worker thread

use super::writer::SyncCore;
use super::error::SyncError;
use super::feed::SnapshotSource;
use super::outcome::UpdateKind;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace};

/// Sending half of the bounded fallback queue
pub(crate) struct FallbackQueue {
    sender: SyncSender<()>,
}

impl FallbackQueue {
    /// Create a queue holding at most `capacity` pending requests
    pub(crate) fn bounded(capacity: usize) -> (Self, Receiver<()>) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        (Self { sender }, receiver)
    }

    /// Queue a fallback request without blocking. Returns false when the
    /// queue is full or the worker is gone.
    pub(crate) fn request(&self) -> bool {
        match self.sender.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => false,
            Err(TrySendError::Disconnected(())) => {
                debug!("Fallback worker has stopped");
                false
            }
        }
    }
}

/// How a single fallback request ended
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FallbackOutcome {
    /// The book was already initialized or disposed, or a snapshot or
    /// resync landed while the fetch was in flight
    Skipped,
    /// The book was seeded from the REST snapshot
    Seeded { transaction_id: u64 },
    /// The fetch or the apply failed; the next diff retries
    Failed(SyncError),
}

/// Start the worker that serves fallback requests for `core`.
///
/// The worker holds only a weak reference and exits once the synchronizer
/// is dropped and the queue disconnects.
pub(crate) fn spawn_worker(
    owner: Weak<SyncCore>,
    symbol: &str,
    requests: Receiver<()>,
    source: Arc<dyn SnapshotSource>,
    depth: u32,
) -> Result<JoinHandle<()>, SyncError> {
    thread::Builder::new()
        .name(format!("fallback-{}", symbol))
        .spawn(move || {
            while requests.recv().is_ok() {
                let Some(core) = owner.upgrade() else {
                    break;
                };
                let outcome = core.run_fallback(source.as_ref(), depth);
                trace!("Order book {}: fallback {:?}", core.symbol, outcome);
            }
            debug!("Fallback worker exiting");
        })
        .map_err(|err| SyncError::WorkerSpawn(err.to_string()))
}

impl SyncCore {
    /// Fetch a snapshot over REST and seed the book with it.
    ///
    /// The network call runs without the writer lock; the lock is taken only
    /// to re-check the state and apply. The result is applied only if no
    /// snapshot or resync happened since the fetch started.
    pub(crate) fn run_fallback(&self, source: &dyn SnapshotSource, depth: u32) -> FallbackOutcome {
        let epoch = {
            let state = self.lock_state();
            if state.initialized || state.disposed {
                debug!(
                    "Order book {}: already initialized, skipping fallback",
                    self.symbol
                );
                return FallbackOutcome::Skipped;
            }
            state.epoch
        };

        self.health.mark_fallback_attempt();
        info!(
            "Order book {}: fetching fallback snapshot (depth {})",
            self.symbol, depth
        );
        let entries = match source.get_order_book(&self.symbol, depth) {
            Ok(entries) => entries,
            Err(err) => {
                self.health.mark_fallback_failure();
                error!(
                    "Order book {}: fallback snapshot fetch failed: {}",
                    self.symbol, err
                );
                return FallbackOutcome::Failed(SyncError::FallbackFetch(err));
            }
        };

        let mut state = self.lock_state();
        if state.initialized || state.disposed || state.epoch != epoch {
            debug!(
                "Order book {}: book changed during fallback fetch, discarding {} levels",
                self.symbol,
                entries.len()
            );
            return FallbackOutcome::Skipped;
        }
        let applied = self.apply_snapshot(&mut state, entries, UpdateKind::Fallback);
        drop(state);

        match applied {
            Ok(update) => {
                self.notify_listeners(&update);
                FallbackOutcome::Seeded {
                    transaction_id: update.transaction_id,
                }
            }
            Err(err) => {
                self.health.mark_fallback_failure();
                error!(
                    "Order book {}: failed to seed from fallback snapshot: {}",
                    self.symbol, err
                );
                FallbackOutcome::Failed(SyncError::Apply(err))
            }
        }
    }
}
