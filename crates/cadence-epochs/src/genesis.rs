// crates/cadence-epochs/src/genesis.rs
//
// Genesis import/export for epoch tracks.
//
// Genesis is where the set of tracked identifiers is fixed. Every
// configuration problem (empty identifier, zero duration, duplicate
// identifier, identifier already in the store) is rejected here, before any
// block is processed.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_core::epoch::EpochRecord;
use cadence_core::error::CadenceError;
use cadence_core::traits::KvStore;
use cadence_store::EpochRecordStore;

/// One epoch track as it appears in genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisEpoch {
    pub identifier: String,
    pub duration: Duration,
    /// Defaults to the genesis block time.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_epoch: u64,
    /// Defaults to `start_time`.
    #[serde(default)]
    pub current_epoch_start_time: Option<DateTime<Utc>>,
    /// Defaults to the genesis block height.
    #[serde(default)]
    pub current_epoch_start_height: Option<u64>,
    #[serde(default)]
    pub epoch_counting_started: bool,
}

impl GenesisEpoch {
    /// A fresh track that starts counting at the first block.
    pub fn new(identifier: impl Into<String>, duration: Duration) -> Self {
        Self {
            identifier: identifier.into(),
            duration,
            start_time: None,
            current_epoch: 0,
            current_epoch_start_time: None,
            current_epoch_start_height: None,
            epoch_counting_started: false,
        }
    }

    /// Delay counting until `start_time`.
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Number the first epoch `current_epoch` instead of 0.
    pub fn with_current_epoch(mut self, current_epoch: u64) -> Self {
        self.current_epoch = current_epoch;
        self
    }

    fn into_record(self, block_height: u64, block_time: DateTime<Utc>) -> EpochRecord {
        let start_time = self.start_time.unwrap_or(block_time);
        EpochRecord {
            identifier: self.identifier,
            start_time,
            duration: self.duration,
            current_epoch: self.current_epoch,
            current_epoch_start_time: self.current_epoch_start_time.unwrap_or(start_time),
            current_epoch_start_height: self.current_epoch_start_height.unwrap_or(block_height),
            epoch_counting_started: self.epoch_counting_started,
        }
    }
}

impl From<EpochRecord> for GenesisEpoch {
    fn from(record: EpochRecord) -> Self {
        Self {
            identifier: record.identifier,
            duration: record.duration,
            start_time: Some(record.start_time),
            current_epoch: record.current_epoch,
            current_epoch_start_time: Some(record.current_epoch_start_time),
            current_epoch_start_height: Some(record.current_epoch_start_height),
            epoch_counting_started: record.epoch_counting_started,
        }
    }
}

/// Complete set of epoch tracks for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub epochs: Vec<GenesisEpoch>,
}

impl Default for GenesisState {
    /// Tracks "day" and "week".
    fn default() -> Self {
        Self {
            epochs: vec![
                GenesisEpoch::new("day", Duration::from_secs(24 * 60 * 60)),
                GenesisEpoch::new("week", Duration::from_secs(7 * 24 * 60 * 60)),
            ],
        }
    }
}

impl GenesisState {
    pub fn new(epochs: Vec<GenesisEpoch>) -> Self {
        Self { epochs }
    }

    /// Reject configurations that would leave scheduling undefined.
    pub fn validate(&self) -> Result<(), CadenceError> {
        let mut seen = HashSet::new();
        for epoch in &self.epochs {
            if epoch.identifier.trim().is_empty() {
                return Err(CadenceError::Config("epoch identifier must not be empty".to_string()));
            }
            if epoch.duration.is_zero() {
                return Err(CadenceError::Config(format!(
                    "epoch '{}' has a zero duration",
                    epoch.identifier
                )));
            }
            if !seen.insert(epoch.identifier.as_str()) {
                return Err(CadenceError::Config(format!(
                    "epoch identifier '{}' is duplicated",
                    epoch.identifier
                )));
            }
        }
        Ok(())
    }
}

/// Validate `genesis` and write one record per track into `store`.
///
/// Fails without writing anything if validation fails or any identifier is
/// already tracked in `store`.
pub fn init_genesis<S: KvStore + ?Sized>(
    store: &mut S,
    genesis: &GenesisState,
    block_height: u64,
    block_time: DateTime<Utc>,
) -> Result<(), CadenceError> {
    genesis.validate()?;

    for epoch in &genesis.epochs {
        if store.has_epoch_record(&epoch.identifier)? {
            return Err(CadenceError::Config(format!(
                "epoch identifier '{}' already exists",
                epoch.identifier
            )));
        }
    }

    for epoch in &genesis.epochs {
        let record = epoch.clone().into_record(block_height, block_time);
        tracing::info!(
            "Tracking epoch '{}' (duration {:?}, start {})",
            record.identifier,
            record.duration,
            record.start_time
        );
        store.set_epoch_record(&record)?;
    }

    Ok(())
}

/// Snapshot every tracked record as a genesis document.
pub fn export_genesis<S: KvStore + ?Sized>(store: &S) -> Result<GenesisState, CadenceError> {
    let epochs = store
        .list_epoch_records()?
        .into_iter()
        .map(GenesisEpoch::from)
        .collect();
    Ok(GenesisState { epochs })
}
