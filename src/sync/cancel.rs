//! Cooperative cancellation for blocking waits

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Waker = Box<dyn Fn() + Send + Sync>;

struct CancelInner {
    cancelled: AtomicBool,
    next_key: AtomicU64,
    wakers: Mutex<Vec<(u64, Waker)>>,
}

impl CancelInner {
    fn lock_wakers(&self) -> MutexGuard<'_, Vec<(u64, Waker)>> {
        self.wakers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A cloneable cancellation signal.
///
/// Waits register a waker so that cancelling wakes them immediately instead
/// of letting them run to their timeout.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancelInner>,
}

/// Keeps a waker registered on a token; dropping it unregisters the waker
pub(crate) struct WakerRegistration {
    inner: Arc<CancelInner>,
    key: Option<u64>,
}

impl Drop for WakerRegistration {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            self.inner.lock_wakers().retain(|(registered, _)| *registered != key);
        }
    }
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                next_key: AtomicU64::new(0),
                wakers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Cancel and wake every registered waiter. Later calls do nothing.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let wakers = std::mem::take(&mut *self.inner.lock_wakers());
        for (_, wake) in wakers {
            wake();
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Run `wake` on cancellation, or right away if already cancelled.
    /// The waker stays registered until the returned guard is dropped.
    pub(crate) fn register<F>(&self, wake: F) -> WakerRegistration
    where
        F: Fn() + Send + Sync + 'static,
    {
        {
            let mut wakers = self.inner.lock_wakers();
            if !self.is_cancelled() {
                let key = self.inner.next_key.fetch_add(1, Ordering::Relaxed);
                wakers.push((key, Box::new(wake)));
                return WakerRegistration {
                    inner: Arc::clone(&self.inner),
                    key: Some(key),
                };
            }
        }
        wake();
        WakerRegistration {
            inner: Arc::clone(&self.inner),
            key: None,
        }
    }

    /// Wakers currently registered
    pub(crate) fn registered_wakers(&self) -> usize {
        self.inner.lock_wakers().len()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
