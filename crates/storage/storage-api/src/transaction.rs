use buffer::buffer::BufferPool;
use buffer::errors::BufferError;
use page::transaction_id::TransactionId;
use std::sync::Arc;

/// Handle for one transaction's lifetime.
///
/// Obtained from [`Database::begin`](crate::database::Database::begin).
/// Consuming it with [`commit`](Self::commit) or [`abort`](Self::abort)
/// flushes or rolls back the pages it dirtied and releases its locks.
/// Dropping an unfinished handle aborts it, so an early `?` return cannot
/// leak locks.
#[derive(Debug)]
pub struct Transaction {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    finished: bool,
}

impl Transaction {
    pub(crate) fn new(pool: Arc<BufferPool>) -> Self {
        Self {
            pool,
            tid: TransactionId::new(),
            finished: false,
        }
    }

    /// The id to pass into page and tuple operations.
    pub fn id(&self) -> TransactionId {
        self.tid
    }

    /// Commits: every page this transaction dirtied is flushed, then its
    /// locks are released.
    pub fn commit(mut self) -> Result<(), BufferError> {
        self.finished = true;
        self.pool.transaction_complete(self.tid, true)
    }

    /// Aborts: every page this transaction dirtied is rolled back to its
    /// before-image, then its locks are released.
    pub fn abort(mut self) -> Result<(), BufferError> {
        self.finished = true;
        self.pool.transaction_complete(self.tid, false)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(tid = %self.tid, "transaction dropped without commit; aborting");
            let _ = self.pool.transaction_complete(self.tid, false);
        }
    }
}
