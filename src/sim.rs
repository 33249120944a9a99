//! In-process simulated runtime.
//!
//! Implements the full contract against plain process memory: a fixed
//! device table, an active-stream table, and a mutable current-device
//! binding. Used by this crate's tests and as the reference for what a
//! real backend's registration looks like. Query counters are exposed so
//! tests can assert how often the "hardware" was actually touched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::device::{DeviceProperties, DeviceSpec};
use crate::error::{Result, RuntimeError};
use crate::handles::{EventHandle, EventOptions, RawStream, StreamHandle, StreamOptions};
use crate::registry;
use crate::runtime::DeviceRuntime;
use crate::scope::Scope;

/// Device type tag the sim runtime stamps on its stream handles.
pub const SIM_DEVICE_TYPE: i32 = 17;

/// Counts of live queries reaching the simulated hardware.
#[derive(Default)]
pub struct SimCounters {
    pub current_device: AtomicUsize,
    pub device_count: AtomicUsize,
    pub get_device_properties: AtomicUsize,
}

pub struct SimRuntime {
    name: String,
    devices: Vec<DeviceProperties>,
    compiled: bool,
    current: Arc<Mutex<u32>>,
    streams: Arc<Mutex<HashMap<u32, StreamHandle>>>,
    next_id: AtomicU64,
    pub counters: SimCounters,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn default_stream(device: u32) -> StreamHandle {
    StreamHandle {
        id: 0,
        device_index: device,
        device_type: SIM_DEVICE_TYPE,
    }
}

impl SimRuntime {
    /// A runtime named `name` with `device_count` identical devices,
    /// named `{name}{index}`.
    pub fn new(name: &str, device_count: u32) -> Self {
        let devices = (0..device_count)
            .map(|index| DeviceProperties {
                name: format!("{name}{index}"),
                total_memory: 4 << 30,
                multi_processor_count: 16,
                major: 7,
                minor: 5,
            })
            .collect();
        Self::with_devices(name, devices)
    }

    /// A runtime with an explicit device table.
    pub fn with_devices(name: &str, devices: Vec<DeviceProperties>) -> Self {
        Self {
            name: name.to_string(),
            devices,
            compiled: true,
            current: Arc::new(Mutex::new(0)),
            streams: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            counters: SimCounters::default(),
        }
    }

    /// Marks the runtime as built without its native library, so raw
    /// stream access fails with [`RuntimeError::NotCompiled`].
    pub fn without_native(mut self) -> Self {
        self.compiled = false;
        self
    }

    fn check_index(&self, index: u32) -> Result<u32> {
        if index as usize >= self.devices.len() {
            return Err(RuntimeError::DeviceIndexOutOfRange {
                backend: self.name.clone(),
                index,
                count: self.devices.len() as u32,
            });
        }
        Ok(index)
    }

    fn resolve(&self, device: Option<u32>) -> Result<u32> {
        match device {
            Some(index) => self.check_index(index),
            None => self.current_device(),
        }
    }
}

struct SimStreamScope {
    streams: Arc<Mutex<HashMap<u32, StreamHandle>>>,
    target: StreamHandle,
    prev: Option<StreamHandle>,
}

impl Scope for SimStreamScope {
    fn enter(&mut self) {
        let mut streams = lock(&self.streams);
        let device = self.target.device_index;
        self.prev = Some(
            streams
                .get(&device)
                .copied()
                .unwrap_or_else(|| default_stream(device)),
        );
        streams.insert(device, self.target);
    }

    fn exit(&mut self) {
        if let Some(prev) = self.prev.take() {
            lock(&self.streams).insert(prev.device_index, prev);
        }
    }
}

struct SimDeviceScope {
    current: Arc<Mutex<u32>>,
    target: Option<u32>,
    prev: Option<u32>,
}

impl Scope for SimDeviceScope {
    fn enter(&mut self) {
        if let Some(target) = self.target {
            let mut current = lock(&self.current);
            self.prev = Some(*current);
            *current = target;
        }
    }

    fn exit(&mut self) {
        if let Some(prev) = self.prev.take() {
            *lock(&self.current) = prev;
        }
    }
}

impl DeviceRuntime for SimRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.compiled && !self.devices.is_empty()
    }

    fn device_count(&self) -> u32 {
        self.counters.device_count.fetch_add(1, Ordering::SeqCst);
        self.devices.len() as u32
    }

    fn current_device(&self) -> Result<u32> {
        self.counters.current_device.fetch_add(1, Ordering::SeqCst);
        if self.devices.is_empty() {
            return Err(RuntimeError::Unavailable(self.name.clone()));
        }
        Ok(*lock(&self.current))
    }

    fn set_device(&self, device: &DeviceSpec) -> Result<()> {
        match device.resolve(&self.name)? {
            Some(index) => {
                let index = self.check_index(index)?;
                *lock(&self.current) = index;
                Ok(())
            }
            // "current device" forms are a pass-through
            None => Ok(()),
        }
    }

    fn stream(&self, stream: StreamHandle) -> Result<Box<dyn Scope>> {
        self.check_index(stream.device_index)?;
        Ok(Box::new(SimStreamScope {
            streams: self.streams.clone(),
            target: stream,
            prev: None,
        }))
    }

    fn current_stream(&self, device: Option<u32>) -> Result<StreamHandle> {
        let device = self.resolve(device)?;
        Ok(lock(&self.streams)
            .get(&device)
            .copied()
            .unwrap_or_else(|| default_stream(device)))
    }

    fn set_stream(&self, stream: StreamHandle) -> Result<()> {
        self.check_index(stream.device_index)?;
        lock(&self.streams).insert(stream.device_index, stream);
        Ok(())
    }

    fn set_stream_by_id(&self, stream_id: u64, device_index: u32, device_type: i32) -> Result<()> {
        self.set_stream(StreamHandle {
            id: stream_id,
            device_index,
            device_type,
        })
    }

    fn get_raw_stream(&self, device: u32) -> Result<RawStream> {
        if !self.compiled {
            return Err(RuntimeError::NotCompiled(self.name.clone()));
        }
        let device = self.check_index(device)?;
        Ok(self.current_stream(Some(device))?.id)
    }

    fn synchronize(&self, device: Option<u32>) -> Result<()> {
        // nothing in flight to wait on
        self.resolve(device)?;
        Ok(())
    }

    fn get_device_properties(&self, device: Option<u32>) -> Result<DeviceProperties> {
        self.counters
            .get_device_properties
            .fetch_add(1, Ordering::SeqCst);
        let device = self.resolve(device)?;
        Ok(self.devices[device as usize].clone())
    }

    fn create_stream(&self, options: &StreamOptions) -> Result<StreamHandle> {
        let device = match options.device.resolve(&self.name)? {
            Some(index) => self.check_index(index)?,
            None => self.current_device()?,
        };
        Ok(StreamHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            device_index: device,
            device_type: SIM_DEVICE_TYPE,
        })
    }

    fn create_event(&self, _options: &EventOptions) -> Result<EventHandle> {
        Ok(EventHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    fn device_scope(&self, device: &DeviceSpec) -> Result<Box<dyn Scope>> {
        let target = match device.resolve(&self.name)? {
            Some(index) => Some(self.check_index(index)?),
            None => None,
        };
        Ok(Box::new(SimDeviceScope {
            current: self.current.clone(),
            target,
            prev: None,
        }))
    }
}

/// Registers a fresh simulated runtime under `name` in the process-wide
/// registry, the way a real backend registers itself at startup. Returns
/// the runtime so tests can inspect its counters.
pub fn register_sim(name: &str, device_count: u32) -> Arc<SimRuntime> {
    let runtime = Arc::new(SimRuntime::new(name, device_count));
    registry::register(name, runtime.clone());
    runtime
}
