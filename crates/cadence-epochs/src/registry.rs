// crates/cadence-epochs/src/registry.rs
//
// Ordered hook registry and isolated hook invocation.
//
// The registry is assembled once during process wiring through
// `HookRegistryBuilder` and then moved into the dispatcher. It has no
// mutating methods, so hooks cannot be added after block processing begins.
// Registration order is dispatch order and is part of the chain's
// deterministic configuration.
//
// Every hook call runs against its own `CacheStore` branch. The branch is
// committed only when the hook returns `Ok(())` without touching the epoch
// record keyspace; errors and panics drop the branch and are reported as
// `HookFault`s instead of aborting the block.
//
// A caught panic still passes through the process panic hook first. The
// daemon installs one that forwards the message to `tracing`; embedders that
// keep the default hook will also see the message on stderr.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_core::epoch::{EpochEvent, HookPhase};
use cadence_core::error::CadenceError;
use cadence_core::traits::{EpochHooks, HookContext, KvStore};
use cadence_store::{is_epoch_key, CacheStore};

/// Why a hook call was rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// The hook returned an error.
    Error,
    /// The hook panicked.
    Panic,
    /// The hook wrote into the epoch record keyspace.
    ReservedWrite,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Error => write!(f, "error"),
            FaultKind::Panic => write!(f, "panic"),
            FaultKind::ReservedWrite => write!(f, "reserved_write"),
        }
    }
}

/// A contained hook failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookFault {
    /// Name of the failing hook.
    pub hook: String,
    pub identifier: String,
    pub epoch_number: u64,
    pub phase: HookPhase,
    pub kind: FaultKind,
    pub message: String,
}

/// Immutable, ordered set of epoch hooks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn EpochHooks>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.names())
            .finish()
    }
}

impl HookRegistry {
    /// Start assembling a registry.
    pub fn builder() -> HookRegistryBuilder {
        HookRegistryBuilder::default()
    }

    /// A registry with no hooks. Epochs still advance; nothing is notified.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Hook names in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Deliver `event` to every hook in registration order.
    ///
    /// Each hook sees its own branch of `store`. Returns the faults of the
    /// hooks whose writes were discarded. Only a failure to commit a
    /// successful hook's writes to `store` is returned as an error.
    pub fn dispatch(
        &self,
        store: &mut dyn KvStore,
        block_height: u64,
        block_time: DateTime<Utc>,
        event: &EpochEvent,
    ) -> Result<Vec<HookFault>, CadenceError> {
        let mut faults = Vec::new();
        for hook in &self.hooks {
            if let Some(fault) = invoke_isolated(hook.as_ref(), store, block_height, block_time, event)? {
                tracing::error!(
                    hook = %fault.hook,
                    identifier = %fault.identifier,
                    epoch = fault.epoch_number,
                    phase = %fault.phase,
                    kind = %fault.kind,
                    "Epoch hook failed, changes rolled back: {}",
                    fault.message
                );
                metrics::counter!(
                    "cadence_hook_failures_total",
                    "hook" => fault.hook.clone(),
                    "phase" => fault.phase.as_str()
                )
                .increment(1);
                faults.push(fault);
            }
        }
        Ok(faults)
    }
}

/// Builder for a `HookRegistry`. Consumed by `build`.
#[derive(Default)]
pub struct HookRegistryBuilder {
    hooks: Vec<Arc<dyn EpochHooks>>,
    names: HashSet<String>,
}

impl HookRegistryBuilder {
    /// Append a hook. Fails if a hook with the same name is already registered.
    pub fn register<H: EpochHooks + 'static>(self, hook: H) -> Result<Self, CadenceError> {
        self.register_shared(Arc::new(hook))
    }

    /// Append a hook the caller keeps a handle to.
    pub fn register_shared(mut self, hook: Arc<dyn EpochHooks>) -> Result<Self, CadenceError> {
        let name = hook.name().to_string();
        if name.is_empty() {
            return Err(CadenceError::Config("epoch hook name must not be empty".to_string()));
        }
        if !self.names.insert(name.clone()) {
            return Err(CadenceError::Config(format!(
                "epoch hook '{}' is registered twice",
                name
            )));
        }
        self.hooks.push(hook);
        Ok(self)
    }

    pub fn build(self) -> HookRegistry {
        HookRegistry { hooks: self.hooks }
    }
}

/// Run one hook against a fresh branch of `store`.
///
/// `Ok(None)` means the hook succeeded and its writes were committed.
fn invoke_isolated(
    hook: &dyn EpochHooks,
    store: &mut dyn KvStore,
    block_height: u64,
    block_time: DateTime<Utc>,
    event: &EpochEvent,
) -> Result<Option<HookFault>, CadenceError> {
    let mut branch = CacheStore::new(store);

    let outcome = {
        let mut ctx = HookContext::new(block_height, block_time, &mut branch);
        panic::catch_unwind(AssertUnwindSafe(|| match event {
            EpochEvent::Ended { identifier, epoch_number } => {
                hook.after_epoch_end(&mut ctx, identifier, *epoch_number)
            }
            EpochEvent::Started { identifier, epoch_number } => {
                hook.before_epoch_start(&mut ctx, identifier, *epoch_number)
            }
        }))
    };

    let fault = |kind: FaultKind, message: String| HookFault {
        hook: hook.name().to_string(),
        identifier: event.identifier().to_string(),
        epoch_number: event.epoch_number(),
        phase: event.phase(),
        kind,
        message,
    };

    match outcome {
        Ok(Ok(())) => {
            let reserved = branch
                .dirty_keys()
                .find(|key| is_epoch_key(key))
                .map(|key| String::from_utf8_lossy(key).into_owned());
            if let Some(key) = reserved {
                branch.discard();
                return Ok(Some(fault(
                    FaultKind::ReservedWrite,
                    format!("hook wrote reserved key '{}'", key),
                )));
            }
            branch.commit()?;
            Ok(None)
        }
        Ok(Err(e)) => {
            branch.discard();
            Ok(Some(fault(FaultKind::Error, e.to_string())))
        }
        Err(payload) => {
            branch.discard();
            Ok(Some(fault(FaultKind::Panic, panic_message(payload.as_ref()))))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use cadence_core::error::HookError;
    use cadence_store::MemoryStore;

    use super::*;

    /// Writes `{name}:{identifier}` = epoch number, optionally failing afterwards.
    struct WritingHook {
        name: &'static str,
        mode: Mode,
        calls: Mutex<Vec<String>>,
    }

    #[derive(Clone, Copy)]
    enum Mode {
        Ok,
        Fail,
        Panic,
        TouchEpochKey,
    }

    impl WritingHook {
        fn new(name: &'static str, mode: Mode) -> Self {
            Self {
                name,
                mode,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, ctx: &mut HookContext<'_>, tag: &str, identifier: &str, epoch: u64) -> Result<(), HookError> {
            self.calls.lock().unwrap().push(format!("{}:{}:{}", tag, identifier, epoch));
            let key = format!("{}:{}", self.name, identifier);
            ctx.store().set(key.as_bytes(), epoch.to_string().as_bytes())?;
            match self.mode {
                Mode::Ok => Ok(()),
                Mode::Fail => Err(HookError::Failed("boom".to_string())),
                Mode::Panic => panic!("hook exploded"),
                Mode::TouchEpochKey => {
                    ctx.store().set(b"epoch:day", b"{}")?;
                    Ok(())
                }
            }
        }
    }

    impl EpochHooks for WritingHook {
        fn name(&self) -> &str {
            self.name
        }

        fn before_epoch_start(&self, ctx: &mut HookContext<'_>, identifier: &str, epoch_number: u64) -> Result<(), HookError> {
            self.record(ctx, "start", identifier, epoch_number)
        }

        fn after_epoch_end(&self, ctx: &mut HookContext<'_>, identifier: &str, epoch_number: u64) -> Result<(), HookError> {
            self.record(ctx, "end", identifier, epoch_number)
        }
    }

    fn started() -> EpochEvent {
        EpochEvent::Started {
            identifier: "day".to_string(),
            epoch_number: 4,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_000, 0).unwrap()
    }

    #[test]
    fn test_duplicate_hook_name_is_config_error() {
        let result = HookRegistry::builder()
            .register(WritingHook::new("mint", Mode::Ok))
            .unwrap()
            .register(WritingHook::new("mint", Mode::Ok));
        assert!(matches!(result, Err(CadenceError::Config(_))));
    }

    #[test]
    fn test_empty_hook_name_is_config_error() {
        let result = HookRegistry::builder().register(WritingHook::new("", Mode::Ok));
        assert!(matches!(result, Err(CadenceError::Config(_))));
    }

    #[test]
    fn test_names_follow_registration_order() {
        let registry = HookRegistry::builder()
            .register(WritingHook::new("mint", Mode::Ok))
            .unwrap()
            .register(WritingHook::new("incentives", Mode::Ok))
            .unwrap()
            .register(WritingHook::new("pools", Mode::Ok))
            .unwrap()
            .build();
        assert_eq!(registry.names(), vec!["mint", "incentives", "pools"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_successful_hook_writes_are_committed() {
        let registry = HookRegistry::builder()
            .register(WritingHook::new("mint", Mode::Ok))
            .unwrap()
            .build();
        let mut store = MemoryStore::new();

        let faults = registry.dispatch(&mut store, 7, now(), &started()).unwrap();
        assert!(faults.is_empty());
        assert_eq!(store.get(b"mint:day").unwrap(), Some(b"4".to_vec()));
    }

    #[test]
    fn test_failing_hook_is_rolled_back_and_others_still_run() {
        let first = Arc::new(WritingHook::new("first", Mode::Fail));
        let second = Arc::new(WritingHook::new("second", Mode::Ok));
        let registry = HookRegistry::builder()
            .register_shared(first.clone())
            .unwrap()
            .register_shared(second.clone())
            .unwrap()
            .build();
        let mut store = MemoryStore::new();

        let faults = registry.dispatch(&mut store, 7, now(), &started()).unwrap();

        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].hook, "first");
        assert_eq!(faults[0].kind, FaultKind::Error);
        assert_eq!(faults[0].phase, HookPhase::BeforeEpochStart);
        assert_eq!(faults[0].epoch_number, 4);
        assert_eq!(store.get(b"first:day").unwrap(), None);
        assert_eq!(store.get(b"second:day").unwrap(), Some(b"4".to_vec()));
        assert_eq!(second.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_panicking_hook_is_contained() {
        let registry = HookRegistry::builder()
            .register(WritingHook::new("panicky", Mode::Panic))
            .unwrap()
            .register(WritingHook::new("steady", Mode::Ok))
            .unwrap()
            .build();
        let mut store = MemoryStore::new();

        let faults = registry.dispatch(&mut store, 7, now(), &started()).unwrap();

        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind, FaultKind::Panic);
        assert_eq!(faults[0].message, "hook exploded");
        assert_eq!(store.get(b"panicky:day").unwrap(), None);
        assert_eq!(store.get(b"steady:day").unwrap(), Some(b"4".to_vec()));
    }

    #[test]
    fn test_hook_writing_epoch_records_is_rejected() {
        let registry = HookRegistry::builder()
            .register(WritingHook::new("sneaky", Mode::TouchEpochKey))
            .unwrap()
            .build();
        let mut store = MemoryStore::new();

        let faults = registry.dispatch(&mut store, 7, now(), &started()).unwrap();

        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind, FaultKind::ReservedWrite);
        assert!(store.is_empty());
    }

    #[test]
    fn test_failure_is_metered() {
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let registry = HookRegistry::builder()
                .register(WritingHook::new("first", Mode::Fail))
                .unwrap()
                .build();
            let mut store = MemoryStore::new();
            registry.dispatch(&mut store, 7, now(), &started()).unwrap();
        });

        let failures: u64 = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == "cadence_hook_failures_total")
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(v) => v,
                _ => 0,
            })
            .sum();
        assert_eq!(failures, 1);
    }
}
