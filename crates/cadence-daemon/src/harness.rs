// crates/cadence-daemon/src/harness.rs
//
// Simulated block harness for the Cadence daemon.
//
// Produces blocks with strictly increasing height and a fixed simulated time
// step, calls the epoch dispatcher once per block, and checkpoints the last
// processed block so a restart on persistent storage resumes where it left off.
// The checkpoint is written in the same commit as the block itself, so a block
// is either fully applied and checkpointed or not applied at all.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_core::error::CadenceError;
use cadence_core::traits::KvStore;
use cadence_epochs::{BlockReport, EpochDispatcher};

/// Key holding the last processed block.
pub const CHECKPOINT_KEY: &[u8] = b"harness:last_block";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Checkpoint {
    height: u64,
    time: DateTime<Utc>,
}

/// Drives an `EpochDispatcher` with simulated blocks.
pub struct BlockHarness<S: KvStore> {
    dispatcher: EpochDispatcher<S>,
    next_height: u64,
    next_time: DateTime<Utc>,
    time_step: chrono::Duration,
}

impl<S: KvStore> BlockHarness<S> {
    /// Continue from the stored checkpoint, or start at height 1 and
    /// `genesis_time` if there is none.
    pub fn resume(
        dispatcher: EpochDispatcher<S>,
        genesis_time: DateTime<Utc>,
        time_step: Duration,
    ) -> Result<Self, CadenceError> {
        let time_step = chrono::Duration::from_std(time_step)
            .map_err(|e| CadenceError::Config(format!("block time step out of range: {}", e)))?;

        let (next_height, next_time) = match dispatcher.store().get(CHECKPOINT_KEY)? {
            Some(bytes) => {
                let checkpoint: Checkpoint = serde_json::from_slice(&bytes)?;
                tracing::info!(
                    "Resuming after block {} ({})",
                    checkpoint.height,
                    checkpoint.time
                );
                (checkpoint.height + 1, checkpoint.time + time_step)
            }
            None => (1, genesis_time),
        };

        Ok(Self {
            dispatcher,
            next_height,
            next_time,
            time_step,
        })
    }

    pub fn dispatcher(&self) -> &EpochDispatcher<S> {
        &self.dispatcher
    }

    pub fn into_dispatcher(self) -> EpochDispatcher<S> {
        self.dispatcher
    }

    /// Height the next call to `step` will process.
    pub fn next_height(&self) -> u64 {
        self.next_height
    }

    /// Process exactly one block.
    pub fn step(&mut self) -> Result<BlockReport, CadenceError> {
        let height = self.next_height;
        let time = self.next_time;

        let report = self.dispatcher.on_block_with(height, time, |store, _| {
            let checkpoint = serde_json::to_vec(&Checkpoint { height, time })?;
            store.set(CHECKPOINT_KEY, &checkpoint)
        })?;
        for fault in &report.hook_faults {
            tracing::warn!(
                "Block {}: hook '{}' rolled back during {} of '{}' #{}",
                height,
                fault.hook,
                fault.phase,
                fault.identifier,
                fault.epoch_number
            );
        }

        self.next_height += 1;
        self.next_time = time + self.time_step;
        Ok(report)
    }

    /// Run the block loop until ctrl-c or until `max_blocks` blocks were produced.
    pub async fn run(&mut self, interval: Duration, max_blocks: Option<u64>) -> Result<(), CadenceError> {
        tracing::info!(
            "Block harness started (interval={:?}, time step={}s, max_blocks={:?})",
            interval,
            self.time_step.num_seconds(),
            max_blocks
        );

        let mut produced = 0u64;
        loop {
            if max_blocks.is_some_and(|max| produced >= max) {
                tracing::info!("Reached max_blocks={}, stopping", produced);
                break;
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Block harness received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    self.step()?;
                    produced += 1;
                }
            }
        }

        Ok(())
    }
}
