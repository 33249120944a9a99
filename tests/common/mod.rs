use std::sync::Arc;

use tansu::sim::SimRuntime;
use tansu::{
    DeviceProperties, DeviceRuntime, DeviceSpec, EventHandle, EventOptions, Op, RawStream, Result,
    Scope, StreamHandle, StreamOptions,
};

/// Delegates everything to a sim runtime but declares only a subset of the
/// operation surface, for exercising the eager unsupported-operation path.
pub struct PartialRuntime {
    inner: SimRuntime,
    missing: Vec<Op>,
}

impl PartialRuntime {
    pub fn new(name: &str, device_count: u32, missing: &[Op]) -> Self {
        Self {
            inner: SimRuntime::new(name, device_count),
            missing: missing.to_vec(),
        }
    }

    pub fn register(name: &str, device_count: u32, missing: &[Op]) -> Arc<Self> {
        let runtime = Arc::new(Self::new(name, device_count, missing));
        tansu::register(name, runtime.clone());
        runtime
    }
}

impl DeviceRuntime for PartialRuntime {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supported_ops(&self) -> Vec<Op> {
        Op::ALL
            .iter()
            .copied()
            .filter(|op| !self.missing.contains(op))
            .collect()
    }

    fn device_count(&self) -> u32 {
        self.inner.device_count()
    }

    fn current_device(&self) -> Result<u32> {
        self.inner.current_device()
    }

    fn set_device(&self, device: &DeviceSpec) -> Result<()> {
        self.inner.set_device(device)
    }

    fn stream(&self, stream: StreamHandle) -> Result<Box<dyn Scope>> {
        self.inner.stream(stream)
    }

    fn current_stream(&self, device: Option<u32>) -> Result<StreamHandle> {
        self.inner.current_stream(device)
    }

    fn set_stream(&self, stream: StreamHandle) -> Result<()> {
        self.inner.set_stream(stream)
    }

    fn set_stream_by_id(&self, stream_id: u64, device_index: u32, device_type: i32) -> Result<()> {
        self.inner.set_stream_by_id(stream_id, device_index, device_type)
    }

    fn get_raw_stream(&self, device: u32) -> Result<RawStream> {
        self.inner.get_raw_stream(device)
    }

    fn synchronize(&self, device: Option<u32>) -> Result<()> {
        self.inner.synchronize(device)
    }

    fn get_device_properties(&self, device: Option<u32>) -> Result<DeviceProperties> {
        self.inner.get_device_properties(device)
    }

    fn create_stream(&self, options: &StreamOptions) -> Result<StreamHandle> {
        self.inner.create_stream(options)
    }

    fn create_event(&self, options: &EventOptions) -> Result<EventHandle> {
        self.inner.create_event(options)
    }

    fn device_scope(&self, device: &DeviceSpec) -> Result<Box<dyn Scope>> {
        self.inner.device_scope(device)
    }
}
