//! A heap file: one table's tuples stored in an unordered collection of
//! fixed-size pages.
//!
//! The backing extent is a flat file with no header of its own — page 0
//! starts at byte 0, page n at byte `n * PAGE_SIZE`. The file owns the
//! authoritative on-disk bytes; cached pages in the buffer pool may run
//! ahead of it until their transaction commits.
//!
//! Tuple-level operations never touch the extent directly: they fetch the
//! affected pages through the buffer pool with write permission, so they
//! participate in normal locking, and leave the mutated pages resident for
//! the pool's commit/abort handling. Only page growth (appending a fresh,
//! empty page) writes the extent immediately, so that `num_pages` reflects
//! the structural change at once.

use buffer::buffer::BufferPool;
use buffer::db_file::DbFile;
use buffer::errors::BufferError;
use buffer::permissions::Permissions;
use page::PAGE_SIZE;
use page::heap_page::HeapPage;
use page::page_id::{PageId, TableId};
use page::transaction_id::TransactionId;
use page::tuple::{Tuple, TupleDesc};
use std::fs::{self, File, OpenOptions};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

use crate::scan::HeapFileIterator;

/// One table's on-disk extent plus its schema.
#[derive(Debug)]
pub struct HeapFile {
    table_id: TableId,
    desc: TupleDesc,
    file: File,
    path: PathBuf,
    num_pages: AtomicUsize,
}

impl HeapFile {
    /// Opens (creating if absent) the extent at `path` for tuples of
    /// schema `desc`. The table id is derived from the absolute path, so
    /// reopening the same file yields the same id.
    pub fn open(path: impl Into<PathBuf>, desc: TupleDesc) -> io::Result<Self> {
        let path = path.into();
        Self::ensure_parent_dir(&path)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let absolute = std::path::absolute(&path)?;
        let num_pages = file.metadata()?.len() as usize / PAGE_SIZE;

        Ok(Self {
            table_id: table_id_for_path(&absolute),
            desc,
            file,
            path,
            num_pages: AtomicUsize::new(num_pages),
        })
    }

    /// The path of the backing extent.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily scans every occupied tuple, in page-number then slot-number
    /// order. Pages are fetched through `pool` with read permission, so the
    /// scan participates in normal locking.
    pub fn iterator<'a>(&'a self, tid: TransactionId, pool: &'a BufferPool) -> HeapFileIterator<'a> {
        HeapFileIterator::new(self, tid, pool)
    }

    fn ensure_parent_dir(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn page_offset(page_number: u32) -> u64 {
        page_number as u64 * PAGE_SIZE as u64
    }

    fn read_full_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let mut read = 0;
        while read < buf.len() {
            let n = Self::read_at(&self.file, &mut buf[read..], offset + read as u64)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "unexpected end of extent",
                ));
            }
            read += n;
        }
        Ok(())
    }

    fn write_full_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = Self::write_at(&self.file, &buf[written..], offset + written as u64)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "disk write made no progress",
                ));
            }
            written += n;
        }
        Ok(())
    }

    #[inline]
    fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        #[cfg(unix)]
        {
            file.read_at(buf, offset)
        }

        #[cfg(windows)]
        {
            file.seek_read(buf, offset)
        }
    }

    #[inline]
    fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
        #[cfg(unix)]
        {
            file.write_at(buf, offset)
        }

        #[cfg(windows)]
        {
            file.seek_write(buf, offset)
        }
    }
}

impl DbFile for HeapFile {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn num_pages(&self) -> usize {
        self.num_pages.load(Ordering::Acquire)
    }

    fn read_page(&self, pid: PageId) -> Result<HeapPage, BufferError> {
        if pid.table_id != self.table_id {
            return Err(BufferError::TableMismatch {
                table_id: self.table_id,
                requested: pid,
            });
        }
        let num_pages = self.num_pages();
        if pid.page_number as usize >= num_pages {
            return Err(BufferError::PageOutOfRange { pid, num_pages });
        }

        let mut data = vec![0u8; PAGE_SIZE];
        self.read_full_at(&mut data, Self::page_offset(pid.page_number))?;
        Ok(HeapPage::new(pid, self.desc.clone(), &data)?)
    }

    fn write_page(&self, heap_page: &HeapPage) -> Result<(), BufferError> {
        let pid = heap_page.id();
        if pid.table_id != self.table_id {
            return Err(BufferError::TableMismatch {
                table_id: self.table_id,
                requested: pid,
            });
        }
        let num_pages = self.num_pages();
        let page_number = pid.page_number as usize;
        // the extent grows one page at a time, never with holes
        if page_number > num_pages {
            return Err(BufferError::PageOutOfRange { pid, num_pages });
        }

        self.write_full_at(&heap_page.serialize(), Self::page_offset(pid.page_number))?;
        self.file.sync_data()?;

        if page_number == num_pages {
            self.num_pages.store(num_pages + 1, Ordering::Release);
            tracing::debug!(%pid, "heap file grew by one page");
        }
        Ok(())
    }

    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PageId>, BufferError> {
        // first fit: the lowest-numbered page with a free slot wins
        for n in 0..self.num_pages() {
            let pid = PageId::new(self.table_id, n as u32);
            let shared = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            {
                let mut heap_page = shared.write().unwrap();
                if heap_page.num_empty_slots() > 0 {
                    heap_page.insert_tuple(tuple)?;
                    return Ok(vec![pid]);
                }
            }
            // the page was only inspected; holding its lock until commit
            // would serialize every insert behind it
            pool.release_page(tid, pid);
        }

        // every page is full: grow the extent by one empty page, then
        // insert through the pool so the new tuple lives in the cache
        let pid = PageId::new(self.table_id, self.num_pages() as u32);
        let empty = HeapPage::empty(pid, self.desc.clone());
        self.write_page(&empty)?;

        let shared = pool.get_page(tid, pid, Permissions::ReadWrite)?;
        shared.write().unwrap().insert_tuple(tuple)?;
        Ok(vec![pid])
    }

    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PageId>, BufferError> {
        let record_id = tuple.record_id().ok_or(BufferError::MissingRecordId)?;
        if record_id.page_id.table_id != self.table_id {
            return Err(BufferError::TableMismatch {
                table_id: self.table_id,
                requested: record_id.page_id,
            });
        }

        let shared = pool.get_page(tid, record_id.page_id, Permissions::ReadWrite)?;
        shared.write().unwrap().delete_tuple(tuple)?;
        Ok(vec![record_id.page_id])
    }
}

/// Stable logical table identifier derived from the table's storage
/// location.
fn table_id_for_path(absolute: &Path) -> TableId {
    let mut hasher = DefaultHasher::new();
    absolute.hash(&mut hasher);
    hasher.finish() as TableId
}
