// crates/cadence-epochs/src/lib.rs
//
// cadence-epochs: Epoch lifecycle state machine and hook dispatch for Cadence.
//
// Once per block the dispatcher walks every tracked epoch record in
// identifier order, asks the scheduler whether the record's epoch has
// elapsed, fires the registered hooks in registration order with each call
// isolated in its own cache branch, and persists the advanced record.

pub mod dispatcher;
pub mod genesis;
pub mod query;
pub mod registry;
pub mod scheduler;

pub use dispatcher::{BlockReport, EpochDispatcher};
pub use genesis::{export_genesis, init_genesis, GenesisEpoch, GenesisState};
pub use registry::{FaultKind, HookFault, HookRegistry, HookRegistryBuilder};
pub use scheduler::{evaluate, transition, Evaluation, Transition};
