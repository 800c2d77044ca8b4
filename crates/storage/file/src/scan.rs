//! Lazy sequential scan over every occupied tuple of a heap file.

use crate::heap_file::HeapFile;
use buffer::buffer::BufferPool;
use buffer::db_file::DbFile;
use buffer::errors::BufferError;
use buffer::permissions::Permissions;
use page::page_id::PageId;
use page::transaction_id::TransactionId;
use page::tuple::Tuple;

/// Iterates over a heap file's tuples in page-number then slot-number
/// order.
///
/// Pages are materialized one at a time: the iterator fetches the next
/// page through the buffer pool with read permission only when the current
/// page's tuples are exhausted, so scanning participates in normal locking
/// and never loads the whole file. A pool failure (lock timeout, I/O)
/// surfaces as an `Err` item and ends the scan.
#[derive(Debug)]
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tid: TransactionId,
    next_page: u32,
    current: std::vec::IntoIter<Tuple>,
    closed: bool,
}

impl<'a> HeapFileIterator<'a> {
    pub(crate) fn new(file: &'a HeapFile, tid: TransactionId, pool: &'a BufferPool) -> Self {
        Self {
            file,
            pool,
            tid,
            next_page: 0,
            current: Vec::new().into_iter(),
            closed: false,
        }
    }

    /// Restarts the scan from page 0 (close + reopen).
    pub fn rewind(&mut self) {
        self.close();
        self.closed = false;
    }

    /// Ends the scan; subsequent `next` calls yield nothing until
    /// [`rewind`](Self::rewind).
    pub fn close(&mut self) {
        self.closed = true;
        self.next_page = 0;
        self.current = Vec::new().into_iter();
    }
}

impl Iterator for HeapFileIterator<'_> {
    type Item = Result<Tuple, BufferError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        loop {
            if let Some(tuple) = self.current.next() {
                return Some(Ok(tuple));
            }
            if self.next_page as usize >= self.file.num_pages() {
                return None;
            }

            let pid = PageId::new(self.file.table_id(), self.next_page);
            self.next_page += 1;

            match self.pool.get_page(self.tid, pid, Permissions::ReadOnly) {
                Ok(shared) => {
                    let heap_page = shared.read().unwrap();
                    let tuples: Vec<Tuple> = heap_page.iter().cloned().collect();
                    self.current = tuples.into_iter();
                }
                Err(err) => {
                    self.closed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
