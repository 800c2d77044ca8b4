//! The table catalog: maps table ids to their backing heap files.

use buffer::db_file::{Catalog, DbFile};
use file::heap_file::HeapFile;
use page::page_id::TableId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const POISON_MSG: &str = "TableCatalog poisoned: another thread panicked while holding the lock";

/// Registry of the tables known to the engine.
///
/// The buffer pool consumes this through the [`Catalog`] trait to resolve
/// a page's owning file on cache misses and flushes; it never sees the
/// concrete [`HeapFile`] type.
#[derive(Debug, Default)]
pub struct TableCatalog {
    tables: RwLock<HashMap<TableId, Arc<HeapFile>>>,
}

impl TableCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `file` under its own table id, replacing any previous
    /// registration, and returns that id.
    pub fn add_table(&self, heap_file: Arc<HeapFile>) -> TableId {
        let table_id = heap_file.table_id();
        let mut tables = self.tables.write().expect(POISON_MSG);
        tables.insert(table_id, heap_file);
        table_id
    }

    /// The heap file backing `table_id`, if registered.
    pub fn heap_file(&self, table_id: TableId) -> Option<Arc<HeapFile>> {
        let tables = self.tables.read().expect(POISON_MSG);
        tables.get(&table_id).cloned()
    }

    /// Ids of every registered table.
    pub fn table_ids(&self) -> Vec<TableId> {
        let tables = self.tables.read().expect(POISON_MSG);
        tables.keys().copied().collect()
    }
}

impl Catalog for TableCatalog {
    fn file(&self, table_id: TableId) -> Option<Arc<dyn DbFile>> {
        self.heap_file(table_id).map(|f| f as Arc<dyn DbFile>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page::tuple::{FieldType, TupleDesc};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn temp_table_path(name: &str) -> std::path::PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let path = std::env::temp_dir().join(format!(
            "heapdb-catalog-{}-{}-{}.tbl",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn registered_table_resolves_by_id() {
        let catalog = TableCatalog::new();
        let desc = TupleDesc::new(vec![FieldType::Int]);
        let heap_file = Arc::new(HeapFile::open(temp_table_path("resolve"), desc).unwrap());

        let table_id = catalog.add_table(heap_file.clone());

        assert!(catalog.heap_file(table_id).is_some());
        assert!(catalog.file(table_id).is_some());
        assert_eq!(catalog.table_ids(), vec![table_id]);
    }

    #[test]
    fn unknown_table_resolves_to_none() {
        let catalog = TableCatalog::new();
        assert!(catalog.heap_file(12345).is_none());
        assert!(catalog.file(12345).is_none());
    }

    #[test]
    fn tuple_desc_comes_from_the_file() {
        let catalog = TableCatalog::new();
        let desc = TupleDesc::new(vec![FieldType::Int, FieldType::Text]);
        let heap_file =
            Arc::new(HeapFile::open(temp_table_path("desc"), desc.clone()).unwrap());
        let table_id = catalog.add_table(heap_file);

        assert_eq!(catalog.tuple_desc(table_id), Some(desc));
    }
}
