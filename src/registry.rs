//! Process-wide mapping from device type name to its runtime implementation.
//!
//! Registration happens once per backend at startup and is idempotent with
//! a warning; lookups are best-effort and never fail. There is no teardown
//! API. [`reset`] exists for test isolation only.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{Result, RuntimeError};
use crate::handles::StreamHandle;
use crate::runtime::{DeviceRuntime, Op};
use crate::scope::Scope;

/// The four stream operations exported to external capture systems.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamOp {
    Stream,
    SetStream,
    CurrentStream,
    SetStreamById,
}

impl StreamOp {
    pub const ALL: [StreamOp; 4] = [
        StreamOp::Stream,
        StreamOp::SetStream,
        StreamOp::CurrentStream,
        StreamOp::SetStreamById,
    ];

    fn op(self) -> Op {
        match self {
            StreamOp::Stream => Op::Stream,
            StreamOp::SetStream => Op::SetStream,
            StreamOp::CurrentStream => Op::CurrentStream,
            StreamOp::SetStreamById => Op::SetStreamById,
        }
    }

    pub fn name(self) -> &'static str {
        self.op().name()
    }
}

impl std::str::FromStr for StreamOp {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        StreamOp::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| RuntimeError::UnknownOperation(s.to_string()))
    }
}

/// A stream operation bound to a specific registered runtime.
///
/// External graph-capture systems consume these as direct callable
/// references instead of going through dispatch. The shape of the table
/// (stream operation, then backend name) is a stable export; do not change
/// it without a compatibility note.
#[derive(Clone)]
pub enum StreamFn {
    Stream(Arc<dyn Fn(StreamHandle) -> Result<Box<dyn Scope>> + Send + Sync>),
    SetStream(Arc<dyn Fn(StreamHandle) -> Result<()> + Send + Sync>),
    CurrentStream(Arc<dyn Fn(Option<u32>) -> Result<StreamHandle> + Send + Sync>),
    SetStreamById(Arc<dyn Fn(u64, u32, i32) -> Result<()> + Send + Sync>),
    /// The runtime does not declare this operation.
    Unimplemented(StreamOp),
}

impl std::fmt::Debug for StreamFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamFn::Stream(_) => f.write_str("StreamFn::Stream"),
            StreamFn::SetStream(_) => f.write_str("StreamFn::SetStream"),
            StreamFn::CurrentStream(_) => f.write_str("StreamFn::CurrentStream"),
            StreamFn::SetStreamById(_) => f.write_str("StreamFn::SetStreamById"),
            StreamFn::Unimplemented(op) => write!(f, "StreamFn::Unimplemented({})", op.name()),
        }
    }
}

/// Registry of accelerator runtimes, keyed by device type name.
///
/// Entries are append-mostly: a name, once registered, always resolves to
/// some runtime. Re-registering a name warns and overwrites in place, so
/// interactive and test sessions can re-register freely.
pub struct Registry {
    runtimes: Vec<(String, Arc<dyn DeviceRuntime>)>,
    stream_fns: HashMap<StreamOp, HashMap<String, StreamFn>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            runtimes: Vec::new(),
            stream_fns: HashMap::new(),
        }
    }

    /// Stores `runtime` under `name`.
    ///
    /// A duplicate name emits one non-fatal diagnostic and overwrites the
    /// existing entry, keeping its position. Also derives the stream
    /// function table entries for `name`; operations the runtime does not
    /// declare get an [`StreamFn::Unimplemented`] sentinel rather than
    /// failing registration.
    pub fn register(&mut self, name: &str, runtime: Arc<dyn DeviceRuntime>) {
        match self.runtimes.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => {
                tracing::warn!("device type `{name}` has been registered already");
                entry.1 = runtime.clone();
            }
            None => self.runtimes.push((name.to_string(), runtime.clone())),
        }
        self.register_stream_fns(name, &runtime);
    }

    fn register_stream_fns(&mut self, name: &str, runtime: &Arc<dyn DeviceRuntime>) {
        for stream_op in StreamOp::ALL {
            let func = if runtime.supports(stream_op.op()) {
                match stream_op {
                    StreamOp::Stream => {
                        let rt = runtime.clone();
                        StreamFn::Stream(Arc::new(move |stream| rt.stream(stream)))
                    }
                    StreamOp::SetStream => {
                        let rt = runtime.clone();
                        StreamFn::SetStream(Arc::new(move |stream| rt.set_stream(stream)))
                    }
                    StreamOp::CurrentStream => {
                        let rt = runtime.clone();
                        StreamFn::CurrentStream(Arc::new(move |device| rt.current_stream(device)))
                    }
                    StreamOp::SetStreamById => {
                        let rt = runtime.clone();
                        StreamFn::SetStreamById(Arc::new(move |id, device, tag| {
                            rt.set_stream_by_id(id, device, tag)
                        }))
                    }
                }
            } else {
                StreamFn::Unimplemented(stream_op)
            };
            self.stream_fns
                .entry(stream_op)
                .or_default()
                .insert(name.to_string(), func);
        }
    }

    /// Returns the runtime registered under `name`. Total; never errors.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn DeviceRuntime>> {
        self.runtimes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rt)| rt.clone())
    }

    /// All registered runtimes, in registration order.
    pub fn list(&self) -> Vec<(String, Arc<dyn DeviceRuntime>)> {
        self.runtimes.clone()
    }

    /// Direct callable reference for one stream operation of one backend.
    pub fn stream_fn(&self, op: StreamOp, name: &str) -> Option<StreamFn> {
        self.stream_fns.get(&op).and_then(|m| m.get(name)).cloned()
    }

    /// Number of registered runtimes.
    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    /// Returns `true` if no runtimes are registered.
    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.runtimes.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("runtimes", &self.names())
            .finish()
    }
}

fn global() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Registry::new()))
}

fn read() -> std::sync::RwLockReadGuard<'static, Registry> {
    global().read().unwrap_or_else(|e| e.into_inner())
}

fn write() -> std::sync::RwLockWriteGuard<'static, Registry> {
    global().write().unwrap_or_else(|e| e.into_inner())
}

/// Registers `runtime` under `name` in the process-wide registry.
///
/// Expected to run once per backend during startup, before worker threads
/// fan out. Concurrent registration is safe but not coordinated; last
/// write wins.
pub fn register(name: &str, runtime: Arc<dyn DeviceRuntime>) {
    write().register(name, runtime);
}

/// Looks up a runtime in the process-wide registry.
pub fn lookup(name: &str) -> Option<Arc<dyn DeviceRuntime>> {
    read().lookup(name)
}

/// All runtimes in the process-wide registry, in registration order.
pub fn registered() -> Vec<(String, Arc<dyn DeviceRuntime>)> {
    read().list()
}

/// Direct stream-operation reference from the process-wide table.
pub fn stream_fn(op: StreamOp, name: &str) -> Option<StreamFn> {
    read().stream_fn(op, name)
}

/// Clears the process-wide registry and worker cache.
///
/// Testing-only affordance. Production code never tears the registry
/// down; it lives until process exit.
pub fn reset() {
    *write() = Registry::new();
    crate::worker::worker().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimRuntime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct WarnCounter(Arc<AtomicUsize>);

    impl tracing::Subscriber for WarnCounter {
        fn enabled(&self, metadata: &tracing::Metadata<'_>) -> bool {
            metadata.level() == &tracing::Level::WARN
        }

        fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }

        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}

        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}

        fn event(&self, _: &tracing::Event<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn enter(&self, _: &tracing::span::Id) {}

        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = Registry::new();
        registry.register("sim", Arc::new(SimRuntime::new("sim", 2)));

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("sim").is_some());
        assert!(registry.lookup("nonexistent").is_none());
    }

    #[test]
    fn lookup_is_idempotent() {
        let mut registry = Registry::new();
        registry.register("sim", Arc::new(SimRuntime::new("sim", 1)));

        let first = registry.lookup("sim").unwrap();
        let second = registry.lookup("sim").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn reregistration_overwrites_in_place() {
        let mut registry = Registry::new();
        registry.register("sim", Arc::new(SimRuntime::new("sim", 1)));
        registry.register("other", Arc::new(SimRuntime::new("other", 1)));

        let replacement: Arc<dyn DeviceRuntime> = Arc::new(SimRuntime::new("sim", 4));
        registry.register("sim", replacement.clone());

        assert_eq!(registry.names(), vec!["sim", "other"]);
        let resolved = registry.lookup("sim").unwrap();
        assert!(Arc::ptr_eq(&resolved, &replacement));
        assert_eq!(resolved.device_count(), 4);
    }

    #[test]
    fn duplicate_registration_warns_exactly_once() {
        let warns = Arc::new(AtomicUsize::new(0));
        tracing::subscriber::with_default(WarnCounter(warns.clone()), || {
            let mut registry = Registry::new();
            registry.register("sim", Arc::new(SimRuntime::new("sim", 1)));
            assert_eq!(warns.load(Ordering::SeqCst), 0);

            registry.register("sim", Arc::new(SimRuntime::new("sim", 1)));
            assert_eq!(warns.load(Ordering::SeqCst), 1);

            registry.register("sim", Arc::new(SimRuntime::new("sim", 1)));
            assert_eq!(warns.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut registry = Registry::new();
        registry.register("b", Arc::new(SimRuntime::new("b", 1)));
        registry.register("a", Arc::new(SimRuntime::new("a", 1)));

        let names: Vec<_> = registry.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn stream_fns_are_derived_per_backend() {
        let mut registry = Registry::new();
        registry.register("sim", Arc::new(SimRuntime::new("sim", 2)));
        registry.register("sim2", Arc::new(SimRuntime::new("sim2", 1)));

        // registering a second backend must not evict the first
        for op in StreamOp::ALL {
            assert!(registry.stream_fn(op, "sim").is_some());
            assert!(registry.stream_fn(op, "sim2").is_some());
        }

        match registry.stream_fn(StreamOp::CurrentStream, "sim").unwrap() {
            StreamFn::CurrentStream(f) => {
                let handle = f(Some(1)).unwrap();
                assert_eq!(handle.device_index, 1);
            }
            other => panic!("unexpected table entry: {other:?}"),
        }
    }

    #[test]
    fn partial_runtime_gets_unimplemented_sentinel() {
        struct NoStreams(SimRuntime);

        impl DeviceRuntime for NoStreams {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn supported_ops(&self) -> Vec<Op> {
                Op::ALL
                    .iter()
                    .copied()
                    .filter(|op| *op != Op::SetStreamById)
                    .collect()
            }
            fn device_count(&self) -> u32 {
                self.0.device_count()
            }
            fn current_device(&self) -> Result<u32> {
                self.0.current_device()
            }
            fn set_device(&self, device: &crate::DeviceSpec) -> Result<()> {
                self.0.set_device(device)
            }
            fn stream(&self, stream: StreamHandle) -> Result<Box<dyn Scope>> {
                self.0.stream(stream)
            }
            fn current_stream(&self, device: Option<u32>) -> Result<StreamHandle> {
                self.0.current_stream(device)
            }
            fn set_stream(&self, stream: StreamHandle) -> Result<()> {
                self.0.set_stream(stream)
            }
            fn set_stream_by_id(&self, id: u64, device: u32, tag: i32) -> Result<()> {
                self.0.set_stream_by_id(id, device, tag)
            }
            fn get_raw_stream(&self, device: u32) -> Result<crate::RawStream> {
                self.0.get_raw_stream(device)
            }
            fn synchronize(&self, device: Option<u32>) -> Result<()> {
                self.0.synchronize(device)
            }
            fn get_device_properties(&self, device: Option<u32>) -> Result<crate::DeviceProperties> {
                self.0.get_device_properties(device)
            }
            fn create_stream(&self, options: &crate::StreamOptions) -> Result<StreamHandle> {
                self.0.create_stream(options)
            }
            fn create_event(&self, options: &crate::EventOptions) -> Result<crate::EventHandle> {
                self.0.create_event(options)
            }
            fn device_scope(&self, device: &crate::DeviceSpec) -> Result<Box<dyn Scope>> {
                self.0.device_scope(device)
            }
        }

        let mut registry = Registry::new();
        registry.register("partial", Arc::new(NoStreams(SimRuntime::new("partial", 1))));

        assert!(matches!(
            registry.stream_fn(StreamOp::SetStreamById, "partial"),
            Some(StreamFn::Unimplemented(StreamOp::SetStreamById))
        ));
        assert!(matches!(
            registry.stream_fn(StreamOp::Stream, "partial"),
            Some(StreamFn::Stream(_))
        ));
    }

    #[test]
    fn debug_shows_names() {
        let mut registry = Registry::new();
        registry.register("sim", Arc::new(SimRuntime::new("sim", 1)));
        assert!(format!("{registry:?}").contains("sim"));
    }
}
