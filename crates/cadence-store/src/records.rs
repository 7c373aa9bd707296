// crates/cadence-store/src/records.rs
//
// Typed persistence for epoch records.
//
// Key format:
//   - `epoch:{identifier}` -> JSON-serialized EpochRecord
//
// Every record shares the prefix, so listing is a single prefix scan and comes
// back in identifier-lexicographic order on every backend.

use cadence_core::epoch::EpochRecord;
use cadence_core::error::CadenceError;
use cadence_core::traits::KvStore;

/// Key prefix reserved for epoch records.
pub const EPOCH_KEY_PREFIX: &[u8] = b"epoch:";

/// Build the storage key for an identifier: `epoch:{identifier}`.
pub fn epoch_key(identifier: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(EPOCH_KEY_PREFIX.len() + identifier.len());
    key.extend_from_slice(EPOCH_KEY_PREFIX);
    key.extend_from_slice(identifier.as_bytes());
    key
}

/// Whether `key` falls inside the reserved epoch record keyspace.
pub fn is_epoch_key(key: &[u8]) -> bool {
    key.starts_with(EPOCH_KEY_PREFIX)
}

/// Epoch record accessors, available on every `KvStore`.
pub trait EpochRecordStore {
    /// Load the record for `identifier`, if tracked.
    fn get_epoch_record(&self, identifier: &str) -> Result<Option<EpochRecord>, CadenceError>;

    /// Persist `record` under its identifier, overwriting any previous state.
    fn set_epoch_record(&mut self, record: &EpochRecord) -> Result<(), CadenceError>;

    /// All tracked records, ordered by identifier.
    fn list_epoch_records(&self) -> Result<Vec<EpochRecord>, CadenceError>;

    fn has_epoch_record(&self, identifier: &str) -> Result<bool, CadenceError> {
        Ok(self.get_epoch_record(identifier)?.is_some())
    }
}

impl<S: KvStore + ?Sized> EpochRecordStore for S {
    fn get_epoch_record(&self, identifier: &str) -> Result<Option<EpochRecord>, CadenceError> {
        match self.get(&epoch_key(identifier))? {
            Some(bytes) => {
                let record: EpochRecord = serde_json::from_slice(&bytes)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn set_epoch_record(&mut self, record: &EpochRecord) -> Result<(), CadenceError> {
        let json = serde_json::to_vec(record)?;
        self.set(&epoch_key(&record.identifier), &json)
    }

    fn list_epoch_records(&self) -> Result<Vec<EpochRecord>, CadenceError> {
        self.scan_prefix(EPOCH_KEY_PREFIX)?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(CadenceError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::memory::MemoryStore;

    fn record(identifier: &str) -> EpochRecord {
        EpochRecord::new(identifier, Duration::from_secs(60), Utc.timestamp_opt(0, 0).unwrap())
    }

    #[test]
    fn test_epoch_key_format() {
        assert_eq!(epoch_key("day"), b"epoch:day".to_vec());
        assert!(is_epoch_key(b"epoch:week"));
        assert!(!is_epoch_key(b"ledger:day"));
    }

    #[test]
    fn test_get_missing_record() {
        let store = MemoryStore::new();
        assert_eq!(store.get_epoch_record("day").unwrap(), None);
        assert!(!store.has_epoch_record("day").unwrap());
    }

    #[test]
    fn test_set_then_get_record() {
        let mut store = MemoryStore::new();
        let mut rec = record("day");
        rec.current_epoch = 7;
        store.set_epoch_record(&rec).unwrap();

        assert_eq!(store.get_epoch_record("day").unwrap(), Some(rec));
    }

    #[test]
    fn test_list_is_identifier_ordered_and_ignores_other_keys() {
        let mut store = MemoryStore::new();
        store.set_epoch_record(&record("week")).unwrap();
        store.set_epoch_record(&record("day")).unwrap();
        store.set_epoch_record(&record("hour")).unwrap();
        store.set(b"ledger:day", b"5").unwrap();

        let ids: Vec<String> = store
            .list_epoch_records()
            .unwrap()
            .into_iter()
            .map(|r| r.identifier)
            .collect();
        assert_eq!(ids, vec!["day", "hour", "week"]);
    }

    #[test]
    fn test_corrupt_record_is_serialization_error() {
        let mut store = MemoryStore::new();
        store.set(&epoch_key("day"), b"not json").unwrap();

        let err = store.get_epoch_record("day").unwrap_err();
        assert!(matches!(err, CadenceError::Serialization(_)));
        assert!(store.list_epoch_records().is_err());
    }
}
