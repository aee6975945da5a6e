//! Single-writer event path shared by the synchronizer, the feed callback and
//! the fallback worker

use super::cancel::CancellationToken;
use super::error::SyncError;
use super::fallback::FallbackQueue;
use super::outcome::{BookUpdate, BookUpdateListener, EventOutcome, IgnoreReason, UpdateKind};
use super::sequence::TransactionSequencer;
use super::state::{SyncHealth, SyncState, SyncStatus};
use crate::orderbook::{
    BookAction, BookEvent, OrderBookEntry, OrderBookError, SequencedBook, partition_by_side,
};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{error, info, trace, warn};

pub(crate) struct SyncCore {
    pub(crate) symbol: String,
    pub(crate) book: SequencedBook,
    state: Mutex<SyncState>,
    snapshot_ready: Condvar,
    pub(crate) health: SyncHealth,
    sequencer: &'static TransactionSequencer,
    fallback: FallbackQueue,
    listeners: Mutex<Vec<BookUpdateListener>>,
}

impl SyncCore {
    pub(crate) fn new(symbol: &str, fallback: FallbackQueue) -> Self {
        Self {
            symbol: symbol.to_string(),
            book: SequencedBook::new(symbol),
            state: Mutex::new(SyncState::new()),
            snapshot_ready: Condvar::new(),
            health: SyncHealth::default(),
            sequencer: TransactionSequencer::global(),
            fallback,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Acquire the writer lock. A panic on another writer poisons the mutex;
    /// the state it guards is still consistent because every mutation is
    /// validated before it is committed, so the guard is recovered.
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> SyncState {
        self.lock_state().clone()
    }

    pub(crate) fn add_listener(&self, listener: BookUpdateListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Classify one feed event and apply it if it is usable
    pub(crate) fn handle_event(&self, event: BookEvent) -> EventOutcome {
        if event.action == BookAction::Undefined {
            return self.ignore(IgnoreReason::UndefinedAction);
        }
        if event.data.is_empty() {
            return self.ignore(IgnoreReason::EmptyPayload);
        }
        if !event.references(&self.symbol) {
            return self.ignore(IgnoreReason::OtherSymbol);
        }

        let BookEvent { action, data } = event;
        let mut state = self.lock_state();
        if state.disposed {
            drop(state);
            return self.ignore(IgnoreReason::Disposed);
        }
        self.health.mark_message();

        if action == BookAction::Partial {
            let applied = self.apply_snapshot(&mut state, data, UpdateKind::Snapshot);
            drop(state);
            return match applied {
                Ok(update) => {
                    self.notify_listeners(&update);
                    EventOutcome::SnapshotApplied {
                        transaction_id: update.transaction_id,
                    }
                }
                Err(err) => self.apply_failed(action, &err),
            };
        }

        if !state.initialized {
            drop(state);
            warn!(
                "Order book {}: {} received before a snapshot, requesting fallback",
                self.symbol, action
            );
            return if self.fallback.request() {
                EventOutcome::FallbackRequested
            } else {
                warn!(
                    "Order book {}: fallback already pending, dropping {}",
                    self.symbol, action
                );
                EventOutcome::FallbackDropped
            };
        }

        let (bids, asks) = partition_by_side(&self.symbol, data);
        let previous = state.last_transaction_id;
        let transaction_id = self.sequencer.next_id();
        match self
            .book
            .apply_diff(previous, transaction_id, action, &bids, &asks)
        {
            Ok(summary) => {
                state.last_transaction_id = transaction_id;
                self.health.mark_applied();
                let update = self.update(transaction_id, UpdateKind::Diff(action));
                drop(state);
                self.notify_listeners(&update);
                EventOutcome::DiffApplied {
                    transaction_id,
                    summary,
                }
            }
            Err(err) => {
                drop(state);
                self.apply_failed(action, &err)
            }
        }
    }

    /// Replace the book with `entries` and mark it initialized. Must be
    /// called with the writer lock held.
    pub(crate) fn apply_snapshot(
        &self,
        state: &mut SyncState,
        entries: Vec<OrderBookEntry>,
        kind: UpdateKind,
    ) -> Result<BookUpdate, OrderBookError> {
        let (bids, asks) = partition_by_side(&self.symbol, entries);
        let transaction_id = self.sequencer.next_id();
        self.book.replace_snapshot(transaction_id, &bids, &asks)?;

        let first = !state.initialized;
        state.initialized = true;
        state.last_transaction_id = transaction_id;
        state.snapshots_applied += 1;
        state.epoch += 1;
        state.status = SyncStatus::Synced;
        self.health.mark_applied();
        self.snapshot_ready.notify_all();

        if first {
            info!(
                "Order book {}: synced from {:?} at transaction {}",
                self.symbol, kind, transaction_id
            );
        }
        Ok(self.update(transaction_id, kind))
    }

    /// Mark the book uninitialized so only a fresh snapshot reseeds it.
    /// Returns the snapshot count to wait past.
    pub(crate) fn rearm(&self) -> Result<u64, SyncError> {
        let mut state = self.lock_state();
        if state.disposed {
            return Err(SyncError::Disposed);
        }
        state.initialized = false;
        state.status = SyncStatus::Syncing;
        state.epoch += 1;
        Ok(state.snapshots_applied)
    }

    /// Block until more than `baseline` snapshots have been applied
    pub(crate) fn wait_for_snapshot(
        self: &Arc<Self>,
        baseline: u64,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let core = Arc::downgrade(self);
        let _registration = cancel.register(move || {
            if let Some(core) = core.upgrade() {
                core.wake_waiters();
            }
        });

        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock_state();
        loop {
            if state.snapshots_applied > baseline {
                return Ok(());
            }
            if state.disposed {
                return Err(SyncError::Disposed);
            }
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(SyncError::Timeout {
                            symbol: self.symbol.clone(),
                            waited: timeout,
                        });
                    }
                    self.snapshot_ready
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .snapshot_ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// Wake every thread blocked in `wait_for_snapshot`
    pub(crate) fn wake_waiters(&self) {
        let _state = self.lock_state();
        self.snapshot_ready.notify_all();
    }

    pub(crate) fn notify_listeners(&self, update: &BookUpdate) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(update))).is_err() {
                error!(
                    "Order book {}: update listener panicked at transaction {}",
                    self.symbol, update.transaction_id
                );
            }
        }
    }

    fn update(&self, transaction_id: u64, kind: UpdateKind) -> BookUpdate {
        BookUpdate {
            symbol: self.symbol.clone(),
            transaction_id,
            kind,
            bid_count: self.book.bid_count(),
            ask_count: self.book.ask_count(),
        }
    }

    fn ignore(&self, reason: IgnoreReason) -> EventOutcome {
        trace!("Order book {}: ignoring event ({:?})", self.symbol, reason);
        self.health.mark_ignored();
        EventOutcome::Ignored(reason)
    }

    fn apply_failed(&self, action: BookAction, err: &OrderBookError) -> EventOutcome {
        self.health.mark_apply_failure();
        error!(
            "Order book {}: failed to apply {}: {}",
            self.symbol, action, err
        );
        EventOutcome::ApplyFailed
    }
}
