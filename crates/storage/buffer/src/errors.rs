use page::errors::page_error::PageError;
use page::page_id::{PageId, TableId};
use page::transaction_id::TransactionId;
use thiserror::Error;

/// Errors surfaced by the buffer pool and the file implementations behind
/// it.
#[derive(Debug, Error)]
pub enum BufferError {
    /// A lock on `pid` was not granted within the bounded retry budget.
    /// The caller is expected to roll the transaction back; retrying the
    /// whole transaction is its decision.
    #[error("transaction {tid} aborted: lock on page {pid} was not granted in time")]
    TransactionAborted { tid: TransactionId, pid: PageId },

    /// The pool is full and every resident page is dirty, so nothing can
    /// be evicted without violating the no-steal rule.
    #[error("buffer pool exhausted: every resident page is dirty")]
    PoolExhausted,

    /// No file is registered for the requested table.
    #[error("no file registered for table {0}")]
    UnknownTable(TableId),

    /// The page id names a table other than the file it was given to.
    #[error("page {requested} does not belong to table {table_id}")]
    TableMismatch { table_id: TableId, requested: PageId },

    /// The page number lies beyond the file's extent (or would grow it by
    /// more than one page).
    #[error("page {pid} is out of range for a file with {num_pages} pages")]
    PageOutOfRange { pid: PageId, num_pages: usize },

    /// The tuple was never stored on a page, so it cannot be deleted.
    #[error("tuple carries no record id")]
    MissingRecordId,

    /// A page-level failure (decode, insert, delete).
    #[error(transparent)]
    Page(#[from] PageError),

    /// An I/O failure on the backing extent. The in-memory cache is left
    /// as-is.
    #[error("i/o failure on the backing extent")]
    Io(#[from] std::io::Error),
}
