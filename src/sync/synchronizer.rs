//! Public synchronizer keeping a local book in step with a feed

use super::cancel::CancellationToken;
use super::config::SyncOptions;
use super::writer::SyncCore;
use super::error::SyncError;
use super::fallback::{FallbackQueue, spawn_worker};
use super::feed::{EventHandler, FeedHandle, FeedOwnership, FeedSubscription, SnapshotSource};
use super::outcome::{BookUpdate, EventOutcome, SubscriptionId};
use super::state::{HealthSnapshot, SyncStatus};
use crate::orderbook::{BookEvent, BookSnapshot, SequencedBook};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

type ActiveSubscription = (SubscriptionId, Box<dyn FeedSubscription>);

/// Keeps a [`SequencedBook`] synchronized with an exchange feed.
///
/// Partial snapshots replace the book, diffs are applied only once a
/// snapshot has been seen, and a diff that arrives first triggers a REST
/// snapshot on a background worker. All writes go through one lock per
/// instance; health timestamps can be read at any time without it.
///
/// Dropping the synchronizer disposes it: the feed subscription is released
/// exactly once, and the feed itself is closed only if it is owned.
pub struct BookSynchronizer {
    core: Arc<SyncCore>,
    feed: FeedHandle,
    subscription: Mutex<Option<ActiveSubscription>>,
    options: SyncOptions,
    _worker: JoinHandle<()>,
}

impl BookSynchronizer {
    /// Create a synchronizer for `symbol`. Nothing is subscribed until
    /// [`start`](Self::start).
    pub fn new(
        symbol: &str,
        feed: FeedHandle,
        snapshots: Arc<dyn SnapshotSource>,
        options: SyncOptions,
    ) -> Result<Self, SyncError> {
        options.validate()?;

        let (queue, requests) = FallbackQueue::bounded(options.fallback_queue_capacity);
        let core = Arc::new(SyncCore::new(symbol, queue));
        let worker = spawn_worker(
            Arc::downgrade(&core),
            symbol,
            requests,
            snapshots,
            options.fallback_depth,
        )?;
        debug!(
            "Order book {}: synchronizer created ({:?} feed)",
            symbol,
            feed.ownership()
        );

        Ok(Self {
            core,
            feed,
            subscription: Mutex::new(None),
            options,
            _worker: worker,
        })
    }

    /// Register a listener for every applied change
    pub fn with_update_listener<F>(self, listener: F) -> Self
    where
        F: Fn(&BookUpdate) + Send + Sync + 'static,
    {
        self.add_update_listener(listener);
        self
    }

    /// Register a listener for every applied change
    pub fn add_update_listener<F>(&self, listener: F)
    where
        F: Fn(&BookUpdate) + Send + Sync + 'static,
    {
        self.core.add_listener(Arc::new(listener));
    }

    /// Subscribe to the feed and block until the first snapshot is applied.
    ///
    /// On timeout or cancellation the subscription stays active; a later
    /// snapshot still initializes the book and [`resync`](Self::resync) can be
    /// used to wait again.
    pub fn start(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<SubscriptionId, SyncError> {
        let baseline = {
            let mut state = self.core.lock_state();
            if state.disposed {
                return Err(SyncError::Disposed);
            }
            if state.started {
                return Err(SyncError::AlreadyStarted);
            }
            state.started = true;
            state.status = SyncStatus::Syncing;
            state.snapshots_applied
        };

        let owner = Arc::downgrade(&self.core);
        let handler: EventHandler = Arc::new(move |event: BookEvent| {
            if let Some(core) = owner.upgrade() {
                core.handle_event(event);
            }
        });

        // No lock is held here: the handler and its listeners may run before
        // subscribe returns
        let subscription = match self.feed.feed().subscribe(&self.core.symbol, handler) {
            Ok(subscription) => subscription,
            Err(err) => {
                let mut state = self.core.lock_state();
                state.started = false;
                if !state.disposed {
                    state.status = SyncStatus::Disconnected;
                }
                error!(
                    "Order book {}: subscription failed: {}",
                    self.core.symbol, err
                );
                return Err(SyncError::Subscription(err));
            }
        };

        let id = SubscriptionId::new();
        {
            let mut slot = self.lock_subscription();
            // Dispose sets the flag before it takes the slot
            if self.core.lock_state().disposed {
                drop(slot);
                subscription.unsubscribe();
                debug!(
                    "Order book {}: disposed during subscribe, released {}",
                    self.core.symbol, id
                );
                return Err(SyncError::Disposed);
            }
            *slot = Some((id, subscription));
        }
        info!("Order book {}: subscribed ({})", self.core.symbol, id);

        match self.core.wait_for_snapshot(baseline, timeout, cancel) {
            Ok(()) => Ok(id),
            Err(err) => {
                warn!("Order book {}: start did not sync: {}", self.core.symbol, err);
                Err(err)
            }
        }
    }

    /// [`start`](Self::start) with the configured snapshot timeout
    pub fn start_default(&self, cancel: &CancellationToken) -> Result<SubscriptionId, SyncError> {
        self.start(self.options.snapshot_timeout(), cancel)
    }

    /// Discard the current sync and block until a fresh snapshot is applied.
    ///
    /// The book is marked uninitialized, so diffs are not applied until a
    /// partial from the feed or a fallback snapshot reseeds it. Returns
    /// `Ok(true)` once reseeded.
    pub fn resync(&self, timeout: Duration, cancel: &CancellationToken) -> Result<bool, SyncError> {
        let baseline = self.core.rearm()?;
        info!("Order book {}: resync requested", self.core.symbol);

        self.core
            .wait_for_snapshot(baseline, timeout, cancel)
            .map(|()| true)
    }

    /// [`resync`](Self::resync) with the configured resync timeout
    pub fn resync_default(&self, cancel: &CancellationToken) -> Result<bool, SyncError> {
        self.resync(self.options.resync_timeout(), cancel)
    }

    /// Block until more snapshots have been applied than at the time of the
    /// call, without re-arming anything
    pub fn wait_for_snapshot(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let baseline = self.core.lock_state().snapshots_applied;
        self.core.wait_for_snapshot(baseline, timeout, cancel)
    }

    /// Block until the book is initialized; returns at once if it already is
    pub fn wait_until_synced(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let state = self.core.state();
        if state.initialized {
            return Ok(());
        }
        self.core
            .wait_for_snapshot(state.snapshots_applied, timeout, cancel)
    }

    /// Feed one decoded event. This is the callback the transport drives; it
    /// never blocks on network I/O.
    pub fn on_event(&self, event: BookEvent) -> EventOutcome {
        self.core.handle_event(event)
    }

    /// Release the subscription and, if owned, the feed. Idempotent.
    pub fn dispose(&self) {
        {
            let mut state = self.core.lock_state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.status = SyncStatus::Disposed;
        }
        self.core.wake_waiters();

        if let Some((id, subscription)) = self.lock_subscription().take() {
            subscription.unsubscribe();
            debug!("Order book {}: unsubscribed ({})", self.core.symbol, id);
        }
        self.feed.release();
        info!("Order book {}: disposed", self.core.symbol);
    }

    /// Symbol being synchronized
    pub fn symbol(&self) -> &str {
        &self.core.symbol
    }

    /// Current lifecycle status
    pub fn status(&self) -> SyncStatus {
        self.core.lock_state().status
    }

    /// Whether a snapshot has been applied since the last resync
    pub fn is_initialized(&self) -> bool {
        self.core.lock_state().initialized
    }

    /// Transaction id of the last applied change
    pub fn last_transaction_id(&self) -> u64 {
        self.core.lock_state().last_transaction_id
    }

    /// The synchronized book, for lock-free reads
    pub fn book(&self) -> &SequencedBook {
        &self.core.book
    }

    /// Snapshot of the top `depth` levels per side (0 for all)
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        self.core.book.create_snapshot(depth)
    }

    /// UTC milliseconds of the last accepted feed message
    pub fn last_message_timestamp(&self) -> Option<u64> {
        self.core.health.last_message_timestamp()
    }

    /// UTC milliseconds of the last change applied to the book
    pub fn last_successful_apply_timestamp(&self) -> Option<u64> {
        self.core.health.last_successful_apply_timestamp()
    }

    /// Timestamps and counters
    pub fn health(&self) -> HealthSnapshot {
        self.core.health.snapshot()
    }

    /// True when no message arrived within the configured silence window
    pub fn is_stale(&self) -> bool {
        self.core.health.is_stale(self.options.stale_after())
    }

    /// Id of the active subscription, if any
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.lock_subscription().as_ref().map(|(id, _)| *id)
    }

    /// Provenance of the feed
    pub fn feed_ownership(&self) -> FeedOwnership {
        self.feed.ownership()
    }

    /// Options in effect
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<ActiveSubscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BookSynchronizer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for BookSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookSynchronizer")
            .field("symbol", &self.core.symbol)
            .field("status", &self.status())
            .field("feed", &self.feed)
            .finish()
    }
}
