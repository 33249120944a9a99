//! Process-local cache of device state for worker processes.
//!
//! Subprocess workers must agree with their parent's view of device
//! assignment without re-querying hardware, so the cache decouples "what
//! this process believes" from "what the driver reports". Entries are
//! stale by design: device topology is assumed fixed for the process's
//! lifetime and nothing here is ever invalidated.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::device::DeviceProperties;
use crate::error::{Result, RuntimeError};
use crate::registry;
use crate::runtime::DeviceRuntime;

/// Cache of "current device index" and "device property list" per device
/// type name.
pub struct WorkerCache {
    current: Mutex<HashMap<String, u32>>,
    properties: Mutex<HashMap<String, Vec<DeviceProperties>>>,
}

impl WorkerCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(HashMap::new()),
            properties: Mutex::new(HashMap::new()),
        }
    }

    fn current_map(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn properties_map(&self) -> MutexGuard<'_, HashMap<String, Vec<DeviceProperties>>> {
        self.properties.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn live(&self, name: &str) -> Result<std::sync::Arc<dyn DeviceRuntime>> {
        registry::lookup(name).ok_or_else(|| RuntimeError::NotRegistered(name.to_string()))
    }

    /// Current device index for `name`.
    ///
    /// Returns the cached entry if one was written; otherwise queries the
    /// live runtime. Live reads are deliberately not written back: cache
    /// entries only ever reflect explicit [`set_current_device`] writes.
    ///
    /// [`set_current_device`]: WorkerCache::set_current_device
    pub fn current_device(&self, name: &str) -> Result<u32> {
        if let Some(index) = self.current_map().get(name) {
            return Ok(*index);
        }
        self.live(name)?.current_device()
    }

    /// Overwrites the cached current device for `name`.
    ///
    /// Does not call into the runtime. A worker mirroring its parent's
    /// device assignment uses this without issuing a real device-binding
    /// call; callers that also want hardware state changed invoke the
    /// runtime's `set_device` separately.
    pub fn set_current_device(&self, name: &str, index: u32) {
        self.current_map().insert(name.to_string(), index);
    }

    /// Properties of one device of `name`.
    ///
    /// `None` resolves through [`current_device`]. The first call for a
    /// backend populates the whole list (one `device_count` query plus one
    /// `get_device_properties` per device) and the list is never
    /// re-queried afterwards.
    ///
    /// [`current_device`]: WorkerCache::current_device
    pub fn device_properties(&self, name: &str, device: Option<u32>) -> Result<DeviceProperties> {
        let device = match device {
            Some(index) => index,
            None => self.current_device(name)?,
        };

        let mut map = self.properties_map();
        if !map.contains_key(name) {
            let runtime = self.live(name)?;
            let count = runtime.device_count();
            let mut list = Vec::with_capacity(count as usize);
            for index in 0..count {
                list.push(runtime.get_device_properties(Some(index))?);
            }
            map.insert(name.to_string(), list);
        }

        let list = &map[name];
        list.get(device as usize)
            .cloned()
            .ok_or_else(|| RuntimeError::DeviceIndexOutOfRange {
                backend: name.to_string(),
                index: device,
                count: list.len() as u32,
            })
    }

    /// Drops every cached entry. Used by the testing-only registry reset.
    pub(crate) fn clear(&self) {
        self.current_map().clear();
        self.properties_map().clear();
    }
}

impl Default for WorkerCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide worker cache.
pub fn worker() -> &'static WorkerCache {
    static WORKER: OnceLock<WorkerCache> = OnceLock::new();
    WORKER.get_or_init(WorkerCache::new)
}
