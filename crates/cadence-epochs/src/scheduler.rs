// crates/cadence-epochs/src/scheduler.rs
//
// Pure epoch scheduling decisions.
//
// Per-record state machine:
//   Uninitialized -> CountingStarted -> { AwaitingElapse <-> EpochBoundary }
//
// `EpochBoundary` is transient: it is entered and left inside one call to
// `evaluate`. A record advances by at most one epoch per call, no matter how
// many durations have passed since the current epoch began.

use chrono::{DateTime, Utc};

use cadence_core::epoch::{EpochEvent, EpochRecord};

/// What a record does at a given block time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to do: either waiting for `start_time` or mid-epoch.
    Hold,
    /// First activation of the track.
    Activate,
    /// The current epoch elapsed; end it and start the next.
    Rollover,
}

/// Decide which transition `record` takes at `block_time`.
pub fn transition(record: &EpochRecord, block_time: DateTime<Utc>) -> Transition {
    if !record.epoch_counting_started {
        if record.is_due_to_start(block_time) {
            Transition::Activate
        } else {
            Transition::Hold
        }
    } else if record.has_elapsed(block_time) {
        Transition::Rollover
    } else {
        Transition::Hold
    }
}

/// Result of evaluating one record against one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The record as it should be persisted after this block.
    pub record: EpochRecord,
    /// Zero or one `Ended` followed by zero or one `Started`.
    pub events: Vec<EpochEvent>,
}

impl Evaluation {
    /// Whether the record is unchanged and no hooks need to run.
    pub fn is_unchanged(&self) -> bool {
        self.events.is_empty()
    }
}

/// Evaluate `record` at the given block.
///
/// Does not touch storage; calling it twice with the same inputs yields the
/// same result.
pub fn evaluate(record: &EpochRecord, block_time: DateTime<Utc>, block_height: u64) -> Evaluation {
    let mut next = record.clone();
    let mut events = Vec::with_capacity(2);

    match transition(record, block_time) {
        Transition::Hold => {}
        Transition::Activate => {
            next.epoch_counting_started = true;
            next.current_epoch_start_time = block_time;
            next.current_epoch_start_height = block_height;
            events.push(EpochEvent::Started {
                identifier: next.identifier.clone(),
                epoch_number: next.current_epoch,
            });
        }
        Transition::Rollover => {
            events.push(EpochEvent::Ended {
                identifier: next.identifier.clone(),
                epoch_number: next.current_epoch,
            });
            next.current_epoch += 1;
            next.current_epoch_start_time = block_time;
            next.current_epoch_start_height = block_height;
            events.push(EpochEvent::Started {
                identifier: next.identifier.clone(),
                epoch_number: next.current_epoch,
            });
        }
    }

    Evaluation { record: next, events }
}
