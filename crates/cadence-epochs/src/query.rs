// crates/cadence-epochs/src/query.rs
//
// Read-only epoch queries for external inspection and administration.

use cadence_core::epoch::EpochRecord;
use cadence_core::error::CadenceError;
use cadence_core::traits::KvStore;
use cadence_store::EpochRecordStore;

/// Record for `identifier`, or `NotFound` if the identifier is not tracked.
pub fn get_epoch_info<S: KvStore + ?Sized>(store: &S, identifier: &str) -> Result<EpochRecord, CadenceError> {
    store
        .get_epoch_record(identifier)?
        .ok_or_else(|| CadenceError::NotFound(format!("epoch identifier '{}'", identifier)))
}

/// All tracked records in identifier order.
pub fn list_epoch_infos<S: KvStore + ?Sized>(store: &S) -> Result<Vec<EpochRecord>, CadenceError> {
    store.list_epoch_records()
}

/// Current epoch number of `identifier`.
pub fn current_epoch<S: KvStore + ?Sized>(store: &S, identifier: &str) -> Result<u64, CadenceError> {
    Ok(get_epoch_info(store, identifier)?.current_epoch)
}

/// Blocks processed since the current epoch of `identifier` began.
///
/// Saturates at zero if `block_height` precedes the epoch start height.
pub fn num_blocks_since_epoch_start<S: KvStore + ?Sized>(
    store: &S,
    identifier: &str,
    block_height: u64,
) -> Result<u64, CadenceError> {
    let record = get_epoch_info(store, identifier)?;
    Ok(block_height.saturating_sub(record.current_epoch_start_height))
}
