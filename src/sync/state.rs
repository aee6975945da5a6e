//! Synchronization state and health telemetry

use crate::utils::{current_time_millis, elapsed_since};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lifecycle of a synchronized book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Not subscribed to the feed
    Disconnected,
    /// Subscribed, waiting for a snapshot
    Syncing,
    /// Seeded from a snapshot and applying diffs
    Synced,
    /// Torn down; no further events are processed
    Disposed,
}

impl SyncStatus {
    /// Whether the book can be read as a faithful copy
    pub fn is_ready(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStatus::Disconnected => "disconnected",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// State guarded by the synchronizer's writer lock
#[derive(Debug, Clone)]
pub(crate) struct SyncState {
    /// Set by the first snapshot, cleared by a resync
    pub(crate) initialized: bool,
    /// Transaction id of the last applied change
    pub(crate) last_transaction_id: u64,
    /// Current lifecycle status
    pub(crate) status: SyncStatus,
    /// Number of snapshots applied, from the feed or the fallback
    pub(crate) snapshots_applied: u64,
    /// Bumped by every snapshot and every resync. A fallback fetch whose
    /// epoch no longer matches is discarded.
    pub(crate) epoch: u64,
    /// Whether the feed subscription has been made
    pub(crate) started: bool,
    /// Set once by dispose
    pub(crate) disposed: bool,
}

impl SyncState {
    pub(crate) fn new() -> Self {
        Self {
            initialized: false,
            last_transaction_id: 0,
            status: SyncStatus::Disconnected,
            snapshots_applied: 0,
            epoch: 0,
            started: false,
            disposed: false,
        }
    }
}

/// Lock-free timestamps and counters, readable at any time
#[derive(Debug, Default)]
pub struct SyncHealth {
    last_message: AtomicU64,
    last_successful_apply: AtomicU64,
    applied_events: AtomicU64,
    ignored_events: AtomicU64,
    apply_failures: AtomicU64,
    fallback_attempts: AtomicU64,
    fallback_failures: AtomicU64,
}

impl SyncHealth {
    pub(crate) fn mark_message(&self) {
        self.last_message
            .store(current_time_millis(), Ordering::Relaxed);
    }

    pub(crate) fn mark_applied(&self) {
        self.last_successful_apply
            .store(current_time_millis(), Ordering::Relaxed);
        self.applied_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_ignored(&self) {
        self.ignored_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_apply_failure(&self) {
        self.apply_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_fallback_attempt(&self) {
        self.fallback_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_fallback_failure(&self) {
        self.fallback_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// UTC milliseconds of the last accepted feed message
    pub fn last_message_timestamp(&self) -> Option<u64> {
        non_zero(self.last_message.load(Ordering::Relaxed))
    }

    /// UTC milliseconds of the last change applied to the book
    pub fn last_successful_apply_timestamp(&self) -> Option<u64> {
        non_zero(self.last_successful_apply.load(Ordering::Relaxed))
    }

    /// Fallback fetches attempted so far
    pub fn fallback_attempts(&self) -> u64 {
        self.fallback_attempts.load(Ordering::Relaxed)
    }

    /// True when no message was accepted within `max_silence`, or ever
    pub fn is_stale(&self, max_silence: Duration) -> bool {
        match self.last_message_timestamp() {
            Some(timestamp) => elapsed_since(timestamp) > max_silence,
            None => true,
        }
    }

    /// Copy every value out
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            last_message_timestamp: self.last_message_timestamp(),
            last_successful_apply_timestamp: self.last_successful_apply_timestamp(),
            applied_events: self.applied_events.load(Ordering::Relaxed),
            ignored_events: self.ignored_events.load(Ordering::Relaxed),
            apply_failures: self.apply_failures.load(Ordering::Relaxed),
            fallback_attempts: self.fallback_attempts.load(Ordering::Relaxed),
            fallback_failures: self.fallback_failures.load(Ordering::Relaxed),
        }
    }
}

fn non_zero(millis: u64) -> Option<u64> {
    if millis == 0 { None } else { Some(millis) }
}

/// Point-in-time copy of [`SyncHealth`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// UTC milliseconds of the last accepted feed message
    pub last_message_timestamp: Option<u64>,
    /// UTC milliseconds of the last applied change
    pub last_successful_apply_timestamp: Option<u64>,
    /// Snapshots and diffs applied
    pub applied_events: u64,
    /// Events filtered out before touching the book
    pub ignored_events: u64,
    /// Events that failed to apply
    pub apply_failures: u64,
    /// Fallback snapshot fetches attempted
    pub fallback_attempts: u64,
    /// Fallback snapshot fetches that failed
    pub fallback_failures: u64,
}
