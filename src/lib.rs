//! # heapdb
//!
//! A single-node relational storage engine kernel: a fixed-size page cache
//! backed by flat heap files, with per-page, per-transaction locking and
//! page-level dirty tracking sufficient to support commit and abort.
//!
//! The engine is composed of internal crates organized under the
//! `/crates/storage` directory of this workspace:
//!
//! - `page`: identifiers, tuples, and the heap page format.
//! - `lock`: the shared/exclusive page lock table.
//! - `buffer`: the buffer pool and the `DbFile`/`Catalog` seams.
//! - `file`: heap files mapping tables onto on-disk extents.
//! - `storage-api`: the engine context (catalog registry, database handle,
//!   transactions, configuration, logging).
//!
//! This crate re-exports them for embedders.

pub use buffer;
pub use file;
pub use lock;
pub use page;
pub use storage_api;
