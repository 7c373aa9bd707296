// crates/cadence-store/src/cache.rs
//
// Cache branch over a parent key-value store.
//
// Reads check the buffered writes first, then fall through to the parent.
// Writes (including deletes) only go to the buffer. `commit` hands them to
// the parent as a single `write_batch` in key order; dropping the branch
// discards them. Branches nest: committing an inner branch only fills the
// outer branch's buffer.

use std::collections::BTreeMap;

use cadence_core::error::CadenceError;
use cadence_core::traits::{KvStore, KvWrite};

/// A write-buffering branch of another `KvStore`.
pub struct CacheStore<'a> {
    parent: &'a mut dyn KvStore,
    /// Pending writes. `None` marks a delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    /// Open a branch over `parent`. Nothing is written to `parent` until `commit`.
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Whether the branch holds no pending writes.
    pub fn is_clean(&self) -> bool {
        self.writes.is_empty()
    }

    /// Keys touched by pending writes, in ascending order.
    pub fn dirty_keys(&self) -> impl Iterator<Item = &[u8]> {
        self.writes.keys().map(|k| k.as_slice())
    }

    /// Flush all pending writes to the parent store in one batch.
    pub fn commit(self) -> Result<(), CadenceError> {
        let CacheStore { parent, writes } = self;
        if writes.is_empty() {
            return Ok(());
        }
        parent.write_batch(writes.into_iter().collect())
    }

    /// Drop all pending writes.
    pub fn discard(self) {}
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CadenceError> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), CadenceError> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), CadenceError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CadenceError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.scan_prefix(prefix)?.into_iter().collect();

        let pending = self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix));
        for (key, value) in pending {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }

    fn write_batch(&mut self, writes: Vec<KvWrite>) -> Result<(), CadenceError> {
        self.writes.extend(writes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_reads_see_pending_writes() {
        let mut parent = MemoryStore::new();
        parent.set(b"a", b"1").unwrap();

        let mut branch = CacheStore::new(&mut parent);
        assert_eq!(branch.get(b"a").unwrap(), Some(b"1".to_vec()));
        branch.set(b"a", b"2").unwrap();
        branch.delete(b"b").unwrap();
        assert_eq!(branch.get(b"a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(branch.get(b"b").unwrap(), None);
    }

    #[test]
    fn test_discard_leaves_parent_untouched() {
        let mut parent = MemoryStore::new();
        parent.set(b"a", b"1").unwrap();

        {
            let mut branch = CacheStore::new(&mut parent);
            branch.set(b"a", b"2").unwrap();
            branch.set(b"c", b"3").unwrap();
            branch.discard();
        }

        assert_eq!(parent.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(parent.get(b"c").unwrap(), None);
    }

    #[test]
    fn test_commit_applies_sets_and_deletes() {
        let mut parent = MemoryStore::new();
        parent.set(b"a", b"1").unwrap();
        parent.set(b"b", b"1").unwrap();

        let mut branch = CacheStore::new(&mut parent);
        branch.set(b"a", b"2").unwrap();
        branch.delete(b"b").unwrap();
        assert!(!branch.is_clean());
        branch.commit().unwrap();

        assert_eq!(parent.get(b"a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(parent.get(b"b").unwrap(), None);
    }

    #[test]
    fn test_scan_prefix_merges_branch_over_parent() {
        let mut parent = MemoryStore::new();
        parent.set(b"p:1", b"old").unwrap();
        parent.set(b"p:2", b"keep").unwrap();
        parent.set(b"q:1", b"other").unwrap();

        let mut branch = CacheStore::new(&mut parent);
        branch.set(b"p:1", b"new").unwrap();
        branch.set(b"p:3", b"added").unwrap();
        branch.delete(b"p:2").unwrap();

        let entries = branch.scan_prefix(b"p:").unwrap();
        assert_eq!(
            entries,
            vec![
                (b"p:1".to_vec(), b"new".to_vec()),
                (b"p:3".to_vec(), b"added".to_vec()),
            ]
        );
    }

    #[test]
    fn test_nested_branches() {
        let mut parent = MemoryStore::new();
        {
            let mut outer = CacheStore::new(&mut parent);
            {
                let mut inner = CacheStore::new(&mut outer);
                inner.set(b"k", b"v").unwrap();
                inner.commit().unwrap();
            }
            assert_eq!(outer.get(b"k").unwrap(), Some(b"v".to_vec()));
            let keys: Vec<&[u8]> = outer.dirty_keys().collect();
            assert_eq!(keys, vec![b"k".as_slice()]);
            outer.commit().unwrap();
        }
        assert_eq!(parent.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    /// Records how writes reach it.
    #[derive(Default)]
    struct BatchLog {
        inner: MemoryStore,
        batches: Vec<usize>,
        single_writes: usize,
    }

    impl KvStore for BatchLog {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CadenceError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), CadenceError> {
            self.single_writes += 1;
            self.inner.set(key, value)
        }

        fn delete(&mut self, key: &[u8]) -> Result<(), CadenceError> {
            self.single_writes += 1;
            self.inner.delete(key)
        }

        fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CadenceError> {
            self.inner.scan_prefix(prefix)
        }

        fn write_batch(&mut self, writes: Vec<KvWrite>) -> Result<(), CadenceError> {
            self.batches.push(writes.len());
            self.inner.write_batch(writes)
        }
    }

    #[test]
    fn test_commit_is_a_single_batch() {
        let mut parent = BatchLog::default();

        let mut branch = CacheStore::new(&mut parent);
        branch.set(b"a", b"1").unwrap();
        branch.set(b"b", b"2").unwrap();
        branch.delete(b"c").unwrap();
        branch.commit().unwrap();

        assert_eq!(parent.batches, vec![3]);
        assert_eq!(parent.single_writes, 0);
        assert_eq!(parent.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_clean_commit_writes_nothing() {
        let mut parent = BatchLog::default();
        CacheStore::new(&mut parent).commit().unwrap();
        assert!(parent.batches.is_empty());
    }
}
