use thiserror::Error;

/// Error types shared across the Cadence workspace.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Storage layer error (RocksDB, in-memory backend, cache branch).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid genesis, duplicate hook, bad config file).
    /// Always fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<serde_json::Error> for CadenceError {
    fn from(e: serde_json::Error) -> Self {
        CadenceError::Serialization(e.to_string())
    }
}

/// Error returned by an epoch hook.
///
/// Hook errors never abort block processing; the dispatcher records them
/// and discards the hook's writes.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook rejected the notification.
    #[error("Hook failed: {0}")]
    Failed(String),

    /// The hook hit a storage error while touching its own state.
    #[error(transparent)]
    Storage(#[from] CadenceError),
}
