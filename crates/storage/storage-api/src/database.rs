//! The engine context object.
//!
//! One `Database` owns the catalog and the buffer pool and hands both to
//! whoever needs them — components receive the context explicitly instead
//! of reaching for process-wide globals.

use crate::catalog::TableCatalog;
use crate::config::EngineConfig;
use crate::transaction::Transaction;
use buffer::buffer::BufferPool;
use file::heap_file::HeapFile;
use page::tuple::TupleDesc;
use std::io;
use std::sync::Arc;

/// Owner of the engine-lifetime instances: catalog, buffer pool, config.
#[derive(Debug)]
pub struct Database {
    config: EngineConfig,
    catalog: Arc<TableCatalog>,
    pool: Arc<BufferPool>,
}

impl Database {
    /// Builds the engine from `config`: an empty catalog and a buffer pool
    /// sized to `storage.buffer_pages`.
    pub fn open(config: EngineConfig) -> Self {
        let catalog = Arc::new(TableCatalog::new());
        let pool = Arc::new(BufferPool::new(
            config.storage.buffer_pages.get(),
            catalog.clone(),
        ));
        tracing::info!(
            data_dir = %config.storage.data_dir.display(),
            buffer_pages = config.storage.buffer_pages.get(),
            "database opened"
        );
        Self {
            config,
            catalog,
            pool,
        }
    }

    /// The table registry.
    pub fn catalog(&self) -> &Arc<TableCatalog> {
        &self.catalog
    }

    /// The shared page cache.
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Opens (creating if absent) the heap file for table `name` under the
    /// configured data directory and registers it in the catalog.
    pub fn open_table(&self, name: &str, desc: TupleDesc) -> io::Result<Arc<HeapFile>> {
        let path = self.config.storage.data_dir.join(format!("{name}.tbl"));
        let heap_file = Arc::new(HeapFile::open(path, desc)?);
        self.catalog.add_table(heap_file.clone());
        Ok(heap_file)
    }

    /// Starts a new transaction against this engine's pool.
    pub fn begin(&self) -> Transaction {
        Transaction::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use buffer::db_file::DbFile;
    use buffer::errors::BufferError;
    use buffer::permissions::Permissions;
    use page::heap_page::HeapPage;
    use page::page_id::PageId;
    use page::tuple::{Field, FieldType, Tuple};
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn int_text_desc() -> TupleDesc {
        TupleDesc::new(vec![FieldType::Int, FieldType::Text])
    }

    fn temp_data_dir(name: &str) -> std::path::PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let dir = std::env::temp_dir().join(format!(
            "heapdb-db-{}-{}-{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn test_database(name: &str) -> Database {
        let config = EngineConfig {
            storage: StorageConfig {
                data_dir: temp_data_dir(name),
                buffer_pages: NonZeroUsize::new(8).unwrap(),
            },
        };
        Database::open(config)
    }

    fn sample_tuple(n: i32, s: &str) -> Tuple {
        Tuple::new(
            int_text_desc(),
            vec![Field::Int(n), Field::Text(s.into())],
        )
        .unwrap()
    }

    #[test]
    fn insert_three_tuples_then_scan_them_back() {
        let db = test_database("insert-scan");
        let table = db.open_table("people", int_text_desc()).unwrap();
        let tx = db.begin();

        for (n, s) in [(1, "a"), (2, "b"), (3, "c")] {
            db.pool()
                .insert_tuple(tx.id(), table.table_id(), sample_tuple(n, s))
                .unwrap();
        }

        let rows: Vec<(i32, String)> = table
            .iterator(tx.id(), db.pool())
            .map(|t| {
                let t = t.unwrap();
                match (t.field(0).unwrap(), t.field(1).unwrap()) {
                    (Field::Int(n), Field::Text(s)) => (*n, s.clone()),
                    other => panic!("unexpected fields {other:?}"),
                }
            })
            .collect();
        assert_eq!(
            rows,
            vec![(1, "a".into()), (2, "b".into()), (3, "c".into())]
        );

        let shared = db
            .pool()
            .get_page(
                tx.id(),
                PageId::new(table.table_id(), 0),
                Permissions::ReadOnly,
            )
            .unwrap();
        let heap_page = shared.read().unwrap();
        assert_eq!(
            heap_page.num_empty_slots(),
            heap_page.num_slots() - 3
        );
        drop(heap_page);
        drop(shared);

        tx.commit().unwrap();
    }

    #[test]
    fn committed_data_survives_a_reopen() {
        let dir = temp_data_dir("reopen");
        let config = EngineConfig {
            storage: StorageConfig {
                data_dir: dir.clone(),
                buffer_pages: NonZeroUsize::new(8).unwrap(),
            },
        };

        {
            let db = Database::open(config.clone());
            let table = db.open_table("events", int_text_desc()).unwrap();
            let tx = db.begin();
            db.pool()
                .insert_tuple(tx.id(), table.table_id(), sample_tuple(42, "persisted"))
                .unwrap();
            tx.commit().unwrap();
        }

        let db = Database::open(config);
        let table = db.open_table("events", int_text_desc()).unwrap();
        let tx = db.begin();
        let count = table.iterator(tx.id(), db.pool()).count();
        assert_eq!(count, 1);
        tx.commit().unwrap();
    }

    #[test]
    fn aborted_delete_leaves_the_tuple_in_place() {
        let db = test_database("abort-delete");
        let table = db.open_table("t", int_text_desc()).unwrap();

        let writer = db.begin();
        db.pool()
            .insert_tuple(writer.id(), table.table_id(), sample_tuple(7, "keep"))
            .unwrap();
        writer.commit().unwrap();

        let deleter = db.begin();
        let stored = table
            .iterator(deleter.id(), db.pool())
            .next()
            .unwrap()
            .unwrap();
        db.pool().delete_tuple(deleter.id(), &stored).unwrap();
        deleter.abort().unwrap();

        let reader = db.begin();
        assert_eq!(table.iterator(reader.id(), db.pool()).count(), 1);
        reader.commit().unwrap();
    }

    #[test]
    fn dropping_a_transaction_aborts_it() {
        let db = test_database("drop-aborts");
        let table = db.open_table("t", int_text_desc()).unwrap();

        {
            let tx = db.begin();
            db.pool()
                .insert_tuple(tx.id(), table.table_id(), sample_tuple(1, "gone"))
                .unwrap();
            // dropped without commit
        }

        let reader = db.begin();
        assert_eq!(table.iterator(reader.id(), db.pool()).count(), 0);
        reader.commit().unwrap();
    }

    #[test]
    fn concurrent_writer_gets_aborted_on_lock_timeout() {
        let db = test_database("lock-timeout");
        let table = db.open_table("t", int_text_desc()).unwrap();

        let holder = db.begin();
        db.pool()
            .insert_tuple(holder.id(), table.table_id(), sample_tuple(1, "held"))
            .unwrap();

        let contender = db.begin();
        let result =
            db.pool()
                .insert_tuple(contender.id(), table.table_id(), sample_tuple(2, "blocked"));
        assert!(matches!(
            result,
            Err(BufferError::TransactionAborted { .. })
        ));
        contender.abort().unwrap();

        holder.commit().unwrap();
    }

    #[test]
    fn filling_a_page_overflows_onto_a_new_one() {
        let db = test_database("overflow");
        let table = db.open_table("t", int_text_desc()).unwrap();
        let tx = db.begin();
        let slots = HeapPage::num_slots_for(&int_text_desc()) as i32;

        for n in 0..slots {
            db.pool()
                .insert_tuple(tx.id(), table.table_id(), sample_tuple(n, "fill"))
                .unwrap();
        }
        assert_eq!(table.num_pages(), 1);

        db.pool()
            .insert_tuple(tx.id(), table.table_id(), sample_tuple(999, "spill"))
            .unwrap();
        assert_eq!(table.num_pages(), 2);

        let last = table
            .iterator(tx.id(), db.pool())
            .last()
            .unwrap()
            .unwrap();
        let rid = last.record_id().unwrap();
        assert_eq!(rid.page_id.page_number, 1);
        assert_eq!(rid.slot, 0);

        tx.commit().unwrap();
    }
}
