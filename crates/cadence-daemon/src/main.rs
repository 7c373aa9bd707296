// crates/cadence-daemon/src/main.rs
//
// Binary entrypoint for the Cadence daemon.
//
// Initializes tracing, parses CLI arguments, loads configuration, opens the
// state store, writes genesis epoch records on first start, wires the hook
// registry into the epoch dispatcher, and runs the simulated block harness.

mod config;
mod harness;
mod hooks;

use std::path::Path;

use clap::Parser;
use config::DaemonConfig;
use harness::BlockHarness;
use hooks::{EpochLedgerHook, LoggingHook};

use cadence_core::error::CadenceError;
use cadence_core::traits::KvStore;
use cadence_epochs::{init_genesis, EpochDispatcher, HookRegistry};
use cadence_store::{EpochRecordStore, MemoryStore, RocksStore};

/// Cadence daemon: drives epoch scheduling from a simulated block stream.
#[derive(Parser, Debug)]
#[command(name = "cadence-daemon", version = "0.1.0", about = "Cadence epoch scheduling daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.cadence/config.toml")]
    config: String,

    /// Storage backend override: rocksdb or memory.
    #[arg(long)]
    storage: Option<String>,

    /// Stop after producing this many blocks.
    #[arg(long)]
    max_blocks: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration errors are fatal: refuse to run with undefined scheduling.
    let config_path = expand_tilde(&args.config);
    let mut daemon_config = DaemonConfig::load(&config_path)?;
    if let Some(storage) = args.storage.clone() {
        daemon_config.storage = storage;
        daemon_config.validate()?;
    }

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    install_panic_logging();

    tracing::info!("Cadence Daemon v0.1.0");
    if Path::new(&config_path).exists() {
        tracing::info!("Loaded configuration from {}", config_path);
    } else {
        tracing::warn!("No config file at {}. Using defaults.", config_path);
    }
    tracing::info!("Storage: {}", daemon_config.storage);
    tracing::info!("Data directory: {}", daemon_config.data_dir);
    tracing::info!(
        "Block interval: {}ms, block time step: {}s",
        daemon_config.block_interval_ms,
        daemon_config.block_time_step_secs
    );

    let mut store = open_store(&daemon_config)?;

    let genesis_time = daemon_config.genesis_time.unwrap_or_else(chrono::Utc::now);
    if store.list_epoch_records()?.is_empty() {
        init_genesis(&mut store, &daemon_config.genesis(), 1, genesis_time)?;
    } else {
        tracing::info!("Epoch records found in store, skipping genesis");
    }

    // Registration order is dispatch order; it must match on every node.
    let hooks = HookRegistry::builder()
        .register(LoggingHook)?
        .register(EpochLedgerHook)?
        .build();

    let dispatcher = EpochDispatcher::new(store, hooks);
    let mut harness = BlockHarness::resume(dispatcher, genesis_time, daemon_config.block_time_step())?;
    tracing::info!(
        "Next block height: {}, tracking {} epoch(s)",
        harness.next_height(),
        harness.dispatcher().list_epoch_infos()?.len()
    );

    harness
        .run(daemon_config.block_interval(), args.max_blocks)
        .await?;

    let dispatcher = harness.into_dispatcher();
    for record in dispatcher.list_epoch_infos()? {
        tracing::info!(
            "Epoch '{}' at #{} (started block {}, {})",
            record.identifier,
            record.current_epoch,
            record.current_epoch_start_height,
            record.current_epoch_start_time
        );
    }

    tracing::info!("Cadence daemon shut down gracefully");
    Ok(())
}

/// Open the configured storage backend.
fn open_store(config: &DaemonConfig) -> Result<Box<dyn KvStore>, CadenceError> {
    match config.storage.as_str() {
        "rocksdb" => {
            let data_dir = expand_tilde(&config.data_dir);
            std::fs::create_dir_all(&data_dir)
                .map_err(|e| CadenceError::Storage(format!("Failed to create {}: {}", data_dir, e)))?;
            let path = format!("{}/epochs_rocksdb", data_dir);
            let store = RocksStore::open(&path)?;
            tracing::info!("RocksDB store opened at {}", path);
            Ok(Box::new(store))
        }
        "memory" => {
            tracing::warn!("Using in-memory store; state is lost on shutdown");
            Ok(Box::new(MemoryStore::new()))
        }
        other => Err(CadenceError::Config(format!(
            "Unknown storage backend '{}'",
            other
        ))),
    }
}

/// Route panic messages through `tracing`.
///
/// Hook panics are caught and reported as faults; this keeps their messages
/// in the structured log instead of raw stderr.
fn install_panic_logging() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {}", info);
    }));
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
