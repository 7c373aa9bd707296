// crates/cadence-store/src/lib.rs
//
// cadence-store: Storage layer for the Cadence epoch scheduler.
//
// Provides an in-memory key-value backend for tests and simulation, a
// RocksDB-backed persistent backend, a cache branch that buffers writes
// until explicitly committed (used to isolate hook side effects), and typed
// accessors for persisted epoch records.

pub mod cache;
pub mod memory;
pub mod records;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use cache::CacheStore;
pub use memory::MemoryStore;
pub use records::{epoch_key, is_epoch_key, EpochRecordStore, EPOCH_KEY_PREFIX};
pub use rocks::RocksStore;
