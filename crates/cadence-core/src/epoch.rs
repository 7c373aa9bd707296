// crates/cadence-core/src/epoch.rs
//
// Persisted epoch record schema and the events emitted at epoch boundaries.
//
// Each tracked identifier ("day", "week", ...) owns exactly one EpochRecord.
// Lifecycle per record: Uninitialized -> CountingStarted -> AwaitingElapse,
// with a transient EpochBoundary inside a single scheduler evaluation.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of an independently scheduled epoch track (e.g. "day", "week").
pub type EpochIdentifier = String;

/// Current state of one epoch track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Unique track name. Used as the storage key; never changes.
    pub identifier: EpochIdentifier,
    /// Moment the track becomes eligible to start counting. Set once.
    pub start_time: DateTime<Utc>,
    /// Fixed interval length. Always non-zero.
    pub duration: Duration,
    /// Epoch counter. Incremented by exactly one per elapsed interval.
    pub current_epoch: u64,
    /// Block time at which the current epoch began.
    pub current_epoch_start_time: DateTime<Utc>,
    /// Block height at which the current epoch began.
    pub current_epoch_start_height: u64,
    /// False until the first epoch has actually begun.
    pub epoch_counting_started: bool,
}

impl EpochRecord {
    /// Create a record that has not started counting yet.
    ///
    /// The current epoch window is anchored at `start_time` until the first
    /// block at or after `start_time` activates the track.
    pub fn new(identifier: impl Into<EpochIdentifier>, duration: Duration, start_time: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            start_time,
            duration,
            current_epoch: 0,
            current_epoch_start_time: start_time,
            current_epoch_start_height: 0,
            epoch_counting_started: false,
        }
    }

    /// Whether a full `duration` has passed since the current epoch began.
    ///
    /// A `block_time` earlier than the current epoch start never counts as
    /// elapsed.
    pub fn has_elapsed(&self, block_time: DateTime<Utc>) -> bool {
        block_time
            .signed_duration_since(self.current_epoch_start_time)
            .to_std()
            .map_or(false, |elapsed| elapsed >= self.duration)
    }

    /// Whether the track may begin counting at `block_time`.
    pub fn is_due_to_start(&self, block_time: DateTime<Utc>) -> bool {
        !self.epoch_counting_started && block_time >= self.start_time
    }
}

/// Notification produced by the scheduler for a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpochEvent {
    /// An epoch finished. Always emitted before the matching `Started`.
    Ended {
        identifier: EpochIdentifier,
        epoch_number: u64,
    },
    /// A new epoch began.
    Started {
        identifier: EpochIdentifier,
        epoch_number: u64,
    },
}

impl EpochEvent {
    pub fn identifier(&self) -> &str {
        match self {
            EpochEvent::Ended { identifier, .. } | EpochEvent::Started { identifier, .. } => identifier,
        }
    }

    pub fn epoch_number(&self) -> u64 {
        match self {
            EpochEvent::Ended { epoch_number, .. } | EpochEvent::Started { epoch_number, .. } => *epoch_number,
        }
    }

    /// The hook method that this event is delivered through.
    pub fn phase(&self) -> HookPhase {
        match self {
            EpochEvent::Ended { .. } => HookPhase::AfterEpochEnd,
            EpochEvent::Started { .. } => HookPhase::BeforeEpochStart,
        }
    }
}

impl fmt::Display for EpochEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpochEvent::Ended { identifier, epoch_number } => {
                write!(f, "EpochEnded({}, {})", identifier, epoch_number)
            }
            EpochEvent::Started { identifier, epoch_number } => {
                write!(f, "EpochStarted({}, {})", identifier, epoch_number)
            }
        }
    }
}

/// Which hook method a notification was delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPhase {
    BeforeEpochStart,
    AfterEpochEnd,
}

impl HookPhase {
    /// Stable tag used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::BeforeEpochStart => "before_epoch_start",
            HookPhase::AfterEpochEnd => "after_epoch_end",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
