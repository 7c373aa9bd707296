// crates/cadence-core/src/traits.rs

use chrono::{DateTime, Utc};

use crate::error::{CadenceError, HookError};

/// Trait for the key-value state that epoch records and hook state live in.
///
/// Implemented by cadence-store (in-memory, RocksDB, and cache branch backends).
/// Iteration through `scan_prefix` must be in ascending byte order of the key
/// so that every node sees the same ordering.
pub trait KvStore {
    /// Read the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CadenceError>;

    /// Write `value` under `key`, overwriting any existing value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), CadenceError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), CadenceError>;

    /// All `(key, value)` pairs whose key starts with `prefix`, sorted by key.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CadenceError>;

    /// Apply a group of writes. `None` deletes the key.
    ///
    /// Backends that can apply the whole group atomically override this; the
    /// default applies the writes one at a time.
    fn write_batch(&mut self, writes: Vec<KvWrite>) -> Result<(), CadenceError> {
        for (key, value) in writes {
            match value {
                Some(value) => self.set(&key, &value)?,
                None => self.delete(&key)?,
            }
        }
        Ok(())
    }
}

/// One pending write: the key and its new value, or `None` for a delete.
pub type KvWrite = (Vec<u8>, Option<Vec<u8>>);

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CadenceError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), CadenceError> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), CadenceError> {
        (**self).delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CadenceError> {
        (**self).scan_prefix(prefix)
    }

    fn write_batch(&mut self, writes: Vec<KvWrite>) -> Result<(), CadenceError> {
        (**self).write_batch(writes)
    }
}

/// Execution context handed to a hook for a single notification.
///
/// The store is an isolated branch: writes become visible to the rest of the
/// chain only if the hook returns `Ok(())`.
pub struct HookContext<'a> {
    block_height: u64,
    block_time: DateTime<Utc>,
    store: &'a mut dyn KvStore,
}

impl<'a> HookContext<'a> {
    pub fn new(block_height: u64, block_time: DateTime<Utc>, store: &'a mut dyn KvStore) -> Self {
        Self {
            block_height,
            block_time,
            store,
        }
    }

    /// Height of the block being processed.
    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    /// Timestamp of the block being processed.
    pub fn block_time(&self) -> DateTime<Utc> {
        self.block_time
    }

    /// Mutable access to the hook's isolated view of chain state.
    pub fn store(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }
}

/// Capability set of a subsystem that wants epoch boundary notifications.
///
/// Implemented by downstream modules (reward minting, incentives, ...).
/// Hooks must not write epoch records; they own their own key prefix.
pub trait EpochHooks: Send + Sync {
    /// Stable name identifying the hook in logs, metrics, and fault reports.
    fn name(&self) -> &str;

    /// Called at the start of every epoch, after any `after_epoch_end` of the
    /// epoch it replaces.
    fn before_epoch_start(
        &self,
        ctx: &mut HookContext<'_>,
        identifier: &str,
        epoch_number: u64,
    ) -> Result<(), HookError>;

    /// Called when an epoch finishes.
    fn after_epoch_end(
        &self,
        ctx: &mut HookContext<'_>,
        identifier: &str,
        epoch_number: u64,
    ) -> Result<(), HookError>;
}
