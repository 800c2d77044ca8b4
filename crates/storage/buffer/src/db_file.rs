//! The capability seams the buffer pool depends on.
//!
//! The pool never names a concrete file type: it resolves tables through
//! [`Catalog`] and drives pages through [`DbFile`]. File implementations in
//! turn receive the pool as an explicit argument when an operation (tuple
//! insert/delete) has to fetch pages with the proper locking — there is no
//! process-wide registry to reach for.

use crate::buffer::BufferPool;
use crate::errors::BufferError;
use page::heap_page::HeapPage;
use page::page_id::{PageId, TableId};
use page::transaction_id::TransactionId;
use page::tuple::{Tuple, TupleDesc};
use std::sync::{Arc, RwLock};

/// A resident page as handed out by the pool. The `RwLock` guards against
/// data races; transaction-level isolation comes from the lock table.
pub type SharedPage = Arc<RwLock<HeapPage>>;

/// One table's backing file: a page-addressed byte extent plus the
/// tuple-level operations that run through the buffer pool.
pub trait DbFile: Send + Sync {
    /// The table this file backs.
    fn table_id(&self) -> TableId;

    /// Schema of the tuples stored in this file.
    fn tuple_desc(&self) -> &TupleDesc;

    /// Number of pages currently in the extent.
    fn num_pages(&self) -> usize;

    /// Reads and decodes the page `pid` from the extent. Fails if `pid`
    /// names another table or lies beyond the extent.
    fn read_page(&self, pid: PageId) -> Result<HeapPage, BufferError>;

    /// Writes the page's serialized bytes at its offset, growing the
    /// extent when the page is the first one past the current end.
    fn write_page(&self, page: &HeapPage) -> Result<(), BufferError>;

    /// Places `tuple` on a page with a free slot, appending a fresh page
    /// when every existing page is full. Pages are obtained through `pool`
    /// with write permission. Returns the pages touched; the caller marks
    /// them dirty.
    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PageId>, BufferError>;

    /// Removes `tuple` from the page its record id names, obtained through
    /// `pool` with write permission. Returns the pages touched.
    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PageId>, BufferError>;
}

/// Resolves table ids to their backing files. The pool consumes this to
/// load pages on a cache miss and to flush on commit; it never parses
/// schema definitions itself.
pub trait Catalog: Send + Sync {
    /// The file backing `table_id`, if registered.
    fn file(&self, table_id: TableId) -> Option<Arc<dyn DbFile>>;

    /// Schema of `table_id`, if registered.
    fn tuple_desc(&self, table_id: TableId) -> Option<TupleDesc> {
        self.file(table_id).map(|f| f.tuple_desc().clone())
    }
}
