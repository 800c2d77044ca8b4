//! The lock table: shared/exclusive page locks held by transactions.
//!
//! Every call returns immediately with a grant/deny answer; the table never
//! blocks. Retry, backoff and timeout policy belong to the caller (the
//! buffer pool), which also means the table maintains no wait-for graph —
//! deadlock avoidance is delegated to the caller's bounded-retry policy.
//! That is a deliberate simplification: it can abort transactions that
//! would have succeeded with a longer wait, and it detects no cycles.
//!
//! Invariants:
//! - If any transaction holds an exclusive lock on a page, it is the only
//!   transaction holding any lock on that page.
//! - A transaction holds at most one lock record per page; an upgrade
//!   replaces the shared record in place, it never appends.

use page::page_id::PageId;
use page::transaction_id::TransactionId;
use std::collections::HashMap;
use std::sync::RwLock;

const POISON_MSG: &str = "LockTable poisoned: another thread panicked while holding the lock";

/// Access mode of one lock record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Read access; any number of transactions may share it.
    Shared,
    /// Read-write access; excludes every other transaction.
    Exclusive,
}

/// One granted lock: which transaction holds the page, and how.
#[derive(Debug, Clone, Copy)]
pub struct LockRecord {
    pub tid: TransactionId,
    pub mode: LockMode,
}

/// Table of lock records, keyed by page.
#[derive(Debug, Default)]
pub struct LockTable {
    pages: RwLock<HashMap<PageId, Vec<LockRecord>>>,
}

impl LockTable {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
        }
    }

    /// Requests a shared lock on `pid` for `tid`.
    ///
    /// Denied if any other transaction holds the page exclusively. A
    /// transaction that already holds the page (in either mode) succeeds
    /// without a new record being added.
    pub fn acquire_shared(&self, pid: PageId, tid: TransactionId) -> bool {
        let mut pages = self.pages.write().expect(POISON_MSG);
        let records = pages.entry(pid).or_default();

        if records
            .iter()
            .any(|r| r.tid != tid && r.mode == LockMode::Exclusive)
        {
            return false;
        }
        if records.iter().any(|r| r.tid == tid) {
            return true;
        }

        records.push(LockRecord {
            tid,
            mode: LockMode::Shared,
        });
        true
    }

    /// Requests an exclusive lock on `pid` for `tid`.
    ///
    /// Denied if any *other* transaction holds any lock on the page. A
    /// shared lock already held by `tid` is upgraded in place; an exclusive
    /// lock already held is a no-op success.
    pub fn acquire_exclusive(&self, pid: PageId, tid: TransactionId) -> bool {
        let mut pages = self.pages.write().expect(POISON_MSG);
        let records = pages.entry(pid).or_default();

        if records.iter().any(|r| r.tid != tid) {
            return false;
        }

        match records.iter_mut().find(|r| r.tid == tid) {
            Some(record) => record.mode = LockMode::Exclusive,
            None => records.push(LockRecord {
                tid,
                mode: LockMode::Exclusive,
            }),
        }
        true
    }

    /// Drops every lock `tid` holds on `pid`. Idempotent: releasing a page
    /// the transaction does not hold is a no-op.
    pub fn release(&self, pid: PageId, tid: TransactionId) {
        let mut pages = self.pages.write().expect(POISON_MSG);
        if let Some(records) = pages.get_mut(&pid) {
            records.retain(|r| r.tid != tid);
            if records.is_empty() {
                pages.remove(&pid);
            }
        }
    }

    /// Drops every lock `tid` holds, on any page.
    pub fn release_all(&self, tid: TransactionId) {
        let mut pages = self.pages.write().expect(POISON_MSG);
        pages.retain(|_, records| {
            records.retain(|r| r.tid != tid);
            !records.is_empty()
        });
    }

    /// Whether `tid` holds a lock (in either mode) on `pid`.
    pub fn holds(&self, pid: PageId, tid: TransactionId) -> bool {
        let pages = self.pages.read().expect(POISON_MSG);
        pages
            .get(&pid)
            .is_some_and(|records| records.iter().any(|r| r.tid == tid))
    }
}
