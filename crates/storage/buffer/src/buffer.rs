//! Provides the implementation for the page cache shared by all
//! transactions.
//!
//! The pool is the single gatekeeper for page access: every fetch acquires
//! the matching page lock first (shared for reads, exclusive for writes),
//! then serves the page from cache or loads it from the owning file. The
//! check-cache → evict → load → insert sequence runs under one internal
//! mutex so two transactions racing on the same missing page cannot both
//! load and double-insert it.
//!
//! Lock acquisition never blocks inside the lock table. On denial the pool
//! waits on a condition variable that release paths signal, retrying a
//! bounded number of times before failing with a transaction-aborted
//! error. This is timeout-based deadlock avoidance, not cycle detection:
//! it can abort transactions that would have succeeded with a slightly
//! longer wait, and adversarial scheduling can livelock it.
//!
//! Eviction follows no-steal: a dirty page is never evicted. If the pool
//! is full and every resident page is dirty, the miss fails instead.

use crate::db_file::{Catalog, SharedPage};
use crate::errors::BufferError;
use crate::permissions::Permissions;
use hashlink::LinkedHashMap;
use lock::lock_table::LockTable;
use page::page_id::{PageId, TableId};
use page::transaction_id::TransactionId;
use page::tuple::Tuple;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Duration;

/// Default number of pages the pool caches.
pub const DEFAULT_PAGES: usize = 50;

/// How long one denied acquisition waits for a release signal before
/// re-checking the lock table.
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Attempt budget for exclusive acquisition before the transaction is
/// aborted.
const EXCLUSIVE_ACQUIRE_ATTEMPTS: u32 = 3;

/// Attempt budget for shared acquisition. Readers give up sooner: a denied
/// read means a writer holds the page, and writers hold on until commit.
const SHARED_ACQUIRE_ATTEMPTS: u32 = 2;

/// The buffer pool: a fixed-capacity cache of pages keyed by page id.
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<dyn Catalog>,
    lock_table: LockTable,
    /// Resident pages in insertion order; eviction scans this linearly.
    cache: Mutex<LinkedHashMap<PageId, SharedPage>>,
    /// Pair backing the bounded lock-retry wait. Signaled by every path
    /// that releases locks.
    waiters: Mutex<()>,
    released: Condvar,
}

impl BufferPool {
    /// Creates a pool that caches up to `capacity` pages, resolving table
    /// files through `catalog`.
    pub fn new(capacity: usize, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            capacity,
            catalog,
            lock_table: LockTable::new(),
            cache: Mutex::new(LinkedHashMap::new()),
            waiters: Mutex::new(()),
            released: Condvar::new(),
        }
    }

    /// Maximum number of resident pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retrieves the page `pid` on behalf of `tid` with the requested
    /// permission.
    ///
    /// Acquires the matching page lock first, waiting (bounded) if another
    /// transaction holds a conflicting lock; exhausting the budget fails
    /// with [`BufferError::TransactionAborted`]. Once the lock is granted
    /// the page is served from cache, or loaded from its owning file —
    /// evicting a clean resident page if the pool is at capacity.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<SharedPage, BufferError> {
        self.acquire_lock(tid, pid, perm)?;

        let mut cache = self.cache.lock().unwrap();
        if let Some(page) = cache.get(&pid) {
            return Ok(Arc::clone(page));
        }

        if cache.len() >= self.capacity {
            self.evict_one(&mut cache)?;
        }

        let file = self
            .catalog
            .file(pid.table_id)
            .ok_or(BufferError::UnknownTable(pid.table_id))?;
        let page = file.read_page(pid)?;
        tracing::debug!(%pid, "page loaded into buffer pool");

        let shared: SharedPage = Arc::new(RwLock::new(page));
        cache.insert(pid, Arc::clone(&shared));
        Ok(shared)
    }

    /// Adds `tuple` to `table_id` on behalf of `tid`.
    ///
    /// The owning file locates (or appends) the page through this pool
    /// with write permission; every touched page is then marked dirty with
    /// `tid` as the dirtier and stays resident — there is no flush on
    /// mutate.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: Tuple,
    ) -> Result<(), BufferError> {
        let file = self
            .catalog
            .file(table_id)
            .ok_or(BufferError::UnknownTable(table_id))?;
        let touched = file.insert_tuple(tid, tuple, self)?;
        self.mark_dirty(tid, &touched);
        Ok(())
    }

    /// Removes `tuple` from its page on behalf of `tid`. The touched page
    /// is marked dirty and stays resident.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<(), BufferError> {
        let record_id = tuple.record_id().ok_or(BufferError::MissingRecordId)?;
        let table_id = record_id.page_id.table_id;
        let file = self
            .catalog
            .file(table_id)
            .ok_or(BufferError::UnknownTable(table_id))?;
        let touched = file.delete_tuple(tid, tuple, self)?;
        self.mark_dirty(tid, &touched);
        Ok(())
    }

    /// Commits or aborts `tid`.
    ///
    /// On commit every resident page dirtied by `tid` is flushed to its
    /// file and its before-image refreshed; on abort each such page is
    /// rolled back to its recorded before-image, discarding the
    /// uncommitted changes. Either way, all of the transaction's locks are
    /// released afterwards.
    pub fn transaction_complete(
        &self,
        tid: TransactionId,
        commit: bool,
    ) -> Result<(), BufferError> {
        {
            let cache = self.cache.lock().unwrap();
            for (pid, shared) in cache.iter() {
                let mut page = shared.write().unwrap();
                if page.dirtier() != Some(tid) {
                    continue;
                }
                if commit {
                    let file = self
                        .catalog
                        .file(pid.table_id)
                        .ok_or(BufferError::UnknownTable(pid.table_id))?;
                    file.write_page(&page)?;
                    page.mark_dirty(None);
                    page.set_before_image();
                    tracing::debug!(%tid, %pid, "dirty page flushed on commit");
                } else {
                    page.restore_before_image()?;
                    tracing::debug!(%tid, %pid, "dirty page rolled back on abort");
                }
            }
        }

        self.lock_table.release_all(tid);
        self.notify_released();
        Ok(())
    }

    /// Writes every dirty resident page to disk.
    ///
    /// Test and debug use only: flushing another transaction's uncommitted
    /// pages breaks the no-steal discipline the commit path relies on.
    pub fn flush_all_pages(&self) -> Result<(), BufferError> {
        let cache = self.cache.lock().unwrap();
        for (pid, shared) in cache.iter() {
            self.flush_resident(*pid, shared)?;
        }
        Ok(())
    }

    /// Writes every resident page dirtied by `tid` to disk without ending
    /// the transaction or touching its locks.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<(), BufferError> {
        let cache = self.cache.lock().unwrap();
        for (pid, shared) in cache.iter() {
            if shared.read().unwrap().dirtier() == Some(tid) {
                self.flush_resident(*pid, shared)?;
            }
        }
        Ok(())
    }

    /// Forcibly drops `pid` from the cache without flushing it. Used when
    /// a rolled-back page must never be read from the cache again.
    pub fn discard_page(&self, pid: PageId) {
        let mut cache = self.cache.lock().unwrap();
        if cache.remove(&pid).is_some() {
            tracing::debug!(%pid, "page discarded from buffer pool");
        }
    }

    /// Releases the lock `tid` holds on `pid`.
    ///
    /// Escape hatch: dropping a lock before transaction end violates
    /// two-phase locking, so callers must know the page was left
    /// unmodified (the insert scan uses it for full pages it only
    /// inspected).
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_table.release(pid, tid);
        self.notify_released();
    }

    /// Whether `tid` currently holds a lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_table.holds(pid, tid)
    }
}

/// Internals.
impl BufferPool {
    /// Bounded lock acquisition: re-checks the lock table after each
    /// release signal (or interval), failing with a transaction abort once
    /// the mode's attempt budget is spent.
    fn acquire_lock(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<(), BufferError> {
        let attempts = match perm {
            Permissions::ReadWrite => EXCLUSIVE_ACQUIRE_ATTEMPTS,
            Permissions::ReadOnly => SHARED_ACQUIRE_ATTEMPTS,
        };

        for attempt in 0..attempts {
            let granted = match perm {
                Permissions::ReadOnly => self.lock_table.acquire_shared(pid, tid),
                Permissions::ReadWrite => self.lock_table.acquire_exclusive(pid, tid),
            };
            if granted {
                return Ok(());
            }
            if attempt + 1 < attempts {
                let guard = self.waiters.lock().unwrap();
                let _ = self
                    .released
                    .wait_timeout(guard, LOCK_RETRY_INTERVAL)
                    .unwrap();
            }
        }

        tracing::warn!(%tid, %pid, "lock retry budget exhausted; aborting transaction");
        Err(BufferError::TransactionAborted { tid, pid })
    }

    /// Evicts the first resident page, in insertion order, that is not
    /// dirty. Fails with pool exhaustion when every resident page is dirty:
    /// under no-steal a dirty page must never be evicted.
    fn evict_one(
        &self,
        cache: &mut LinkedHashMap<PageId, SharedPage>,
    ) -> Result<(), BufferError> {
        let victim = cache
            .iter()
            .find(|(_, shared)| shared.read().unwrap().dirtier().is_none())
            .map(|(pid, _)| *pid);

        match victim {
            Some(pid) => {
                cache.remove(&pid);
                tracing::debug!(%pid, "clean page evicted");
                Ok(())
            }
            None => Err(BufferError::PoolExhausted),
        }
    }

    fn mark_dirty(&self, tid: TransactionId, touched: &[PageId]) {
        let cache = self.cache.lock().unwrap();
        for pid in touched {
            if let Some(shared) = cache.get(pid) {
                shared.write().unwrap().mark_dirty(Some(tid));
            }
        }
    }

    /// Flushes one resident page if dirty: write through its file, clear
    /// the dirty marker, refresh the before-image.
    fn flush_resident(&self, pid: PageId, shared: &SharedPage) -> Result<(), BufferError> {
        let mut page = shared.write().unwrap();
        if page.dirtier().is_none() {
            return Ok(());
        }
        let file = self
            .catalog
            .file(pid.table_id)
            .ok_or(BufferError::UnknownTable(pid.table_id))?;
        file.write_page(&page)?;
        page.mark_dirty(None);
        page.set_before_image();
        Ok(())
    }

    fn notify_released(&self) {
        let _guard = self.waiters.lock().unwrap();
        self.released.notify_all();
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

// ------------------------------------------------------------------------------------------------
