//! Transaction id generation

use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_SEQUENCER: TransactionSequencer = TransactionSequencer::new();

/// Issues strictly increasing transaction ids.
///
/// Every synchronizer in the process draws from [`TransactionSequencer::global`],
/// so ids are unique across books and give a total order usable for
/// cross-book auditing. Ids start at 1; 0 means "nothing applied yet".
#[derive(Debug)]
pub struct TransactionSequencer {
    last_id: AtomicU64,
}

impl TransactionSequencer {
    /// Create an independent sequencer starting at 1
    pub const fn new() -> Self {
        Self {
            last_id: AtomicU64::new(0),
        }
    }

    /// The process-wide sequencer shared by all books
    pub fn global() -> &'static TransactionSequencer {
        &GLOBAL_SEQUENCER
    }

    /// Issue the next id. No two calls ever observe the same value.
    pub fn next_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Last id issued, 0 if none
    pub fn last(&self) -> u64 {
        self.last_id.load(Ordering::Acquire)
    }
}

impl Default for TransactionSequencer {
    fn default() -> Self {
        Self::new()
    }
}
