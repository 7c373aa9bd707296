// crates/cadence-daemon/src/hooks.rs
//
// Built-in epoch hooks wired into the daemon.
//
// LoggingHook reports every notification. EpochLedgerHook keeps a durable
// per-identifier count of completed epochs under its own `ledger:` prefix,
// which doubles as a check that hook writes survive across restarts.

use cadence_core::error::{CadenceError, HookError};
use cadence_core::traits::{EpochHooks, HookContext, KvStore};

/// Logs each epoch boundary it is notified about.
pub struct LoggingHook;

impl EpochHooks for LoggingHook {
    fn name(&self) -> &str {
        "logging"
    }

    fn before_epoch_start(&self, ctx: &mut HookContext<'_>, identifier: &str, epoch_number: u64) -> Result<(), HookError> {
        tracing::info!(
            "[hook] epoch '{}' #{} starting (block {}, time {})",
            identifier,
            epoch_number,
            ctx.block_height(),
            ctx.block_time()
        );
        Ok(())
    }

    fn after_epoch_end(&self, ctx: &mut HookContext<'_>, identifier: &str, epoch_number: u64) -> Result<(), HookError> {
        tracing::info!(
            "[hook] epoch '{}' #{} finished (block {}, time {})",
            identifier,
            epoch_number,
            ctx.block_height(),
            ctx.block_time()
        );
        Ok(())
    }
}

/// Counts completed epochs per identifier.
///
/// Key format: `ledger:{identifier}` -> JSON u64.
pub struct EpochLedgerHook;

impl EpochLedgerHook {
    fn key(identifier: &str) -> Vec<u8> {
        format!("ledger:{}", identifier).into_bytes()
    }

    /// Completed epochs recorded for `identifier` (0 if none).
    pub fn completed<S: KvStore + ?Sized>(store: &S, identifier: &str) -> Result<u64, CadenceError> {
        match store.get(&Self::key(identifier))? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(0),
        }
    }
}

impl EpochHooks for EpochLedgerHook {
    fn name(&self) -> &str {
        "ledger"
    }

    fn before_epoch_start(&self, _ctx: &mut HookContext<'_>, _identifier: &str, _epoch_number: u64) -> Result<(), HookError> {
        Ok(())
    }

    fn after_epoch_end(&self, ctx: &mut HookContext<'_>, identifier: &str, epoch_number: u64) -> Result<(), HookError> {
        let store = ctx.store();
        let completed = Self::completed(&*store, identifier)? + 1;
        let value = serde_json::to_vec(&completed).map_err(CadenceError::from)?;
        store.set(&Self::key(identifier), &value)?;
        tracing::debug!(
            "[ledger] '{}' epoch #{} closed, {} completed in total",
            identifier,
            epoch_number,
            completed
        );
        Ok(())
    }
}
