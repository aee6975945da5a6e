//! Synchronizer options

use super::error::SyncError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_SNAPSHOT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_RESYNC_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_FALLBACK_QUEUE_CAPACITY: usize = 16;
const DEFAULT_STALE_AFTER_MS: u64 = 30_000;

/// Tunables for a [`BookSynchronizer`](super::BookSynchronizer).
///
/// Loadable from JSON; any field left out takes its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// How long `start` waits for the first snapshot
    pub snapshot_timeout_ms: u64,
    /// How long `resync` waits for a fresh snapshot
    pub resync_timeout_ms: u64,
    /// Depth requested from the REST fallback; 0 is the full book
    pub fallback_depth: u32,
    /// Pending fallback requests kept before new ones are dropped
    pub fallback_queue_capacity: usize,
    /// Silence after which the feed is considered stale
    pub stale_after_ms: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            snapshot_timeout_ms: DEFAULT_SNAPSHOT_TIMEOUT_MS,
            resync_timeout_ms: DEFAULT_RESYNC_TIMEOUT_MS,
            fallback_depth: 0,
            fallback_queue_capacity: DEFAULT_FALLBACK_QUEUE_CAPACITY,
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
        }
    }
}

impl SyncOptions {
    /// Parse options from JSON and validate them
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let options: SyncOptions =
            serde_json::from_str(json).map_err(|err| SyncError::InvalidOptions {
                message: err.to_string(),
            })?;
        options.validate()?;
        Ok(options)
    }

    /// Check that the options can drive a synchronizer
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.fallback_queue_capacity == 0 {
            return Err(SyncError::InvalidOptions {
                message: "fallback_queue_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Set how long `start` waits for the first snapshot
    pub fn with_snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Set how long `resync` waits for a fresh snapshot
    pub fn with_resync_timeout(mut self, timeout: Duration) -> Self {
        self.resync_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Set the depth requested from the REST fallback (0 for the full book)
    pub fn with_fallback_depth(mut self, depth: u32) -> Self {
        self.fallback_depth = depth;
        self
    }

    /// Set how many fallback requests may be pending
    pub fn with_fallback_queue_capacity(mut self, capacity: usize) -> Self {
        self.fallback_queue_capacity = capacity;
        self
    }

    /// Set the silence after which the feed counts as stale
    pub fn with_stale_after(mut self, silence: Duration) -> Self {
        self.stale_after_ms = saturating_millis(silence);
        self
    }

    /// Snapshot timeout as a `Duration`
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }

    /// Resync timeout as a `Duration`
    pub fn resync_timeout(&self) -> Duration {
        Duration::from_millis(self.resync_timeout_ms)
    }

    /// Stale window as a `Duration`
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

/// Whole milliseconds in `duration`, capped at `u64::MAX`
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
