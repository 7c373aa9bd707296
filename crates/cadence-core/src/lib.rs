// crates/cadence-core/src/lib.rs
//
// cadence-core: Core types, traits, and errors for the Cadence epoch scheduler.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the persisted epoch record schema, the events emitted at epoch
// boundaries, the key-value storage seam, and the hook capability set that
// downstream subsystems implement to be notified of epoch starts and ends.

pub mod epoch;
pub mod error;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use cadence_core::EpochRecord;`

// Epoch types
pub use epoch::{EpochEvent, EpochIdentifier, EpochRecord, HookPhase};

// Error types
pub use error::{CadenceError, HookError};

// Traits
pub use traits::{EpochHooks, HookContext, KvStore, KvWrite};
