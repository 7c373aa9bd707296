// crates/cadence-store/src/rocks.rs
//
// RocksDB-backed persistent key-value storage.
//
// Keys are stored verbatim; RocksDB's default bytewise comparator gives the
// ascending key order that `KvStore::scan_prefix` promises. Epoch records use
// the `epoch:{identifier}` layout defined in `records.rs`. `write_batch` goes
// through a single RocksDB `WriteBatch`, so a committed block lands on disk
// entirely or not at all.

use rocksdb::{DBWithThreadMode, MultiThreaded, Options, WriteBatch};

use cadence_core::error::CadenceError;
use cadence_core::traits::{KvStore, KvWrite};

/// RocksDB wrapper implementing the `KvStore` trait.
#[derive(Debug)]
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, CadenceError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path)
            .map_err(|e| CadenceError::Storage(format!("Failed to open RocksDB at {}: {}", path, e)))?;

        Ok(Self { db })
    }
}

impl KvStore for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CadenceError> {
        self.db
            .get(key)
            .map_err(|e| CadenceError::Storage(format!("RocksDB get failed: {}", e)))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), CadenceError> {
        self.db
            .put(key, value)
            .map_err(|e| CadenceError::Storage(format!("RocksDB put failed: {}", e)))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), CadenceError> {
        self.db
            .delete(key)
            .map_err(|e| CadenceError::Storage(format!("RocksDB delete failed: {}", e)))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CadenceError> {
        let mut entries = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item
                .map_err(|e| CadenceError::Storage(format!("RocksDB iteration error: {}", e)))?;

            // Without a prefix extractor the iterator runs past the prefix.
            if !key.starts_with(prefix) {
                break;
            }

            entries.push((key.to_vec(), value.to_vec()));
        }

        Ok(entries)
    }

    fn write_batch(&mut self, writes: Vec<KvWrite>) -> Result<(), CadenceError> {
        let mut batch = WriteBatch::default();
        for (key, value) in &writes {
            match value {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }

        self.db
            .write(batch)
            .map_err(|e| CadenceError::Storage(format!("RocksDB batch write failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path(label: &str) -> String {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("cadence_test_{}_{}", label, uuid::Uuid::now_v7()));
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_rocks_set_get_delete() {
        let path = temp_db_path("rocks_basic");
        let mut store = RocksStore::open(&path).unwrap();

        store.set(b"epoch:day", b"{}").unwrap();
        assert_eq!(store.get(b"epoch:day").unwrap(), Some(b"{}".to_vec()));

        store.delete(b"epoch:day").unwrap();
        assert_eq!(store.get(b"epoch:day").unwrap(), None);

        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_rocks_scan_prefix_stops_at_prefix_end() {
        let path = temp_db_path("rocks_scan");
        let mut store = RocksStore::open(&path).unwrap();

        store.set(b"epoch:week", b"w").unwrap();
        store.set(b"epoch:day", b"d").unwrap();
        store.set(b"ledger:day", b"l").unwrap();

        let entries = store.scan_prefix(b"epoch:").unwrap();
        assert_eq!(
            entries,
            vec![
                (b"epoch:day".to_vec(), b"d".to_vec()),
                (b"epoch:week".to_vec(), b"w".to_vec()),
            ]
        );

        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_rocks_reopen_preserves_data() {
        let path = temp_db_path("rocks_reopen");
        {
            let mut store = RocksStore::open(&path).unwrap();
            store.set(b"k", b"v").unwrap();
        }
        let store = RocksStore::open(&path).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));

        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_rocks_write_batch_applies_sets_and_deletes() {
        let path = temp_db_path("rocks_batch");
        let mut store = RocksStore::open(&path).unwrap();
        store.set(b"harness:last_block", b"old").unwrap();

        store
            .write_batch(vec![
                (b"epoch:day".to_vec(), Some(b"d".to_vec())),
                (b"epoch:week".to_vec(), Some(b"w".to_vec())),
                (b"harness:last_block".to_vec(), None),
            ])
            .unwrap();

        assert_eq!(store.scan_prefix(b"epoch:").unwrap().len(), 2);
        assert_eq!(store.get(b"harness:last_block").unwrap(), None);

        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }
}
