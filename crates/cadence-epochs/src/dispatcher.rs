// crates/cadence-epochs/src/dispatcher.rs
//
// Per-block epoch dispatch.
//
// `EpochDispatcher::on_block` is the single entry point the block harness
// calls, once per block, with strictly increasing height and non-decreasing
// time. For each tracked record (identifier order):
//   1. evaluate the record with the scheduler
//   2. fire `after_epoch_end` on every hook for an `Ended` event
//   3. persist the advanced record
//   4. fire `before_epoch_start` on every hook for a `Started` event
//
// The record is written between the two hook phases so that start hooks
// querying the store observe the new epoch number. The persisted end state is
// the same as writing after both phases, and hook failures never affect it:
// the counter always advances and only the failing hook's writes are dropped.
//
// The whole block runs against one `CacheStore` branch of the backing store,
// and each hook call gets a nested branch of that. The block branch is
// committed as a single batch once every record is processed. A storage error
// anywhere aborts the block and drops the branch, so nothing from a failed
// block is ever persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_core::epoch::{EpochEvent, EpochRecord};
use cadence_core::error::CadenceError;
use cadence_core::traits::KvStore;
use cadence_store::{CacheStore, EpochRecordStore};

use crate::query;
use crate::registry::{HookFault, HookRegistry};
use crate::scheduler;

/// Everything that happened while processing one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReport {
    pub height: u64,
    pub time: DateTime<Utc>,
    /// Events in firing order across all identifiers.
    pub events: Vec<EpochEvent>,
    /// Hook calls that were rolled back.
    pub hook_faults: Vec<HookFault>,
}

impl BlockReport {
    fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self {
            height,
            time,
            events: Vec::new(),
            hook_faults: Vec::new(),
        }
    }

    /// Whether no epoch started or ended in this block.
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty()
    }
}

/// Drives every tracked epoch record forward, one block at a time.
///
/// Owns the state store and the hook registry; both are injected at
/// construction and the registry can never change afterwards.
#[derive(Debug)]
pub struct EpochDispatcher<S: KvStore> {
    store: S,
    hooks: HookRegistry,
}

impl<S: KvStore> EpochDispatcher<S> {
    pub fn new(store: S, hooks: HookRegistry) -> Self {
        tracing::info!(
            "Epoch dispatcher ready with {} hook(s): {:?}",
            hooks.len(),
            hooks.names()
        );
        Self { store, hooks }
    }

    /// Read access to the underlying state.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Give the store back, e.g. to reopen it after shutdown.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Process one block.
    pub fn on_block(&mut self, block_height: u64, block_time: DateTime<Utc>) -> Result<BlockReport, CadenceError> {
        self.on_block_with(block_height, block_time, |_, _| Ok(()))
    }

    /// Process one block and let `finalize` add its own writes to the same
    /// commit. If processing or `finalize` fails, nothing is written.
    pub fn on_block_with<F>(
        &mut self,
        block_height: u64,
        block_time: DateTime<Utc>,
        finalize: F,
    ) -> Result<BlockReport, CadenceError>
    where
        F: FnOnce(&mut dyn KvStore, &BlockReport) -> Result<(), CadenceError>,
    {
        let mut report = BlockReport::new(block_height, block_time);

        let mut block = CacheStore::new(&mut self.store);
        for record in block.list_epoch_records()? {
            advance(&mut block, &self.hooks, record, block_height, block_time, &mut report)?;
        }
        finalize(&mut block, &report)?;
        block.commit()?;

        for event in &report.events {
            log_event(event, block_height);
        }
        if report.is_quiet() {
            tracing::trace!("Block {}: no epoch boundaries", block_height);
        }

        Ok(report)
    }

    /// Record for `identifier`, or `NotFound`.
    pub fn get_epoch_info(&self, identifier: &str) -> Result<EpochRecord, CadenceError> {
        query::get_epoch_info(&self.store, identifier)
    }

    /// All tracked records in identifier order.
    pub fn list_epoch_infos(&self) -> Result<Vec<EpochRecord>, CadenceError> {
        query::list_epoch_infos(&self.store)
    }

    pub fn current_epoch(&self, identifier: &str) -> Result<u64, CadenceError> {
        query::current_epoch(&self.store, identifier)
    }

    pub fn num_blocks_since_epoch_start(&self, identifier: &str, block_height: u64) -> Result<u64, CadenceError> {
        query::num_blocks_since_epoch_start(&self.store, identifier, block_height)
    }
}

fn advance(
    store: &mut dyn KvStore,
    hooks: &HookRegistry,
    record: EpochRecord,
    block_height: u64,
    block_time: DateTime<Utc>,
    report: &mut BlockReport,
) -> Result<(), CadenceError> {
    let evaluation = scheduler::evaluate(&record, block_time, block_height);
    if evaluation.is_unchanged() {
        return Ok(());
    }

    let mut persisted = false;
    for event in &evaluation.events {
        if let EpochEvent::Started { .. } = event {
            store.set_epoch_record(&evaluation.record)?;
            persisted = true;
        }
        let faults = hooks.dispatch(&mut *store, block_height, block_time, event)?;
        report.hook_faults.extend(faults);
        report.events.push(event.clone());
    }

    if !persisted {
        store.set_epoch_record(&evaluation.record)?;
    }

    Ok(())
}

fn log_event(event: &EpochEvent, block_height: u64) {
    match event {
        EpochEvent::Ended { identifier, epoch_number } => {
            tracing::info!(
                "Epoch '{}' #{} ended at block {}",
                identifier,
                epoch_number,
                block_height
            );
            metrics::counter!("cadence_epoch_ended_total", "identifier" => identifier.clone()).increment(1);
        }
        EpochEvent::Started { identifier, epoch_number } => {
            tracing::info!(
                "Epoch '{}' #{} started at block {}",
                identifier,
                epoch_number,
                block_height
            );
            metrics::counter!("cadence_epoch_started_total", "identifier" => identifier.clone()).increment(1);
        }
    }
}
