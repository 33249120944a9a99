//! The contract every accelerator backend must implement to be
//! dispatch-compatible.

use std::str::FromStr;

use crate::device::{DeviceProperties, DeviceSpec};
use crate::error::{Result, RuntimeError};
use crate::handles::{EventHandle, EventOptions, RawStream, StreamHandle, StreamOptions};
use crate::scope::Scope;

/// The statically enumerated operation surface of [`DeviceRuntime`].
///
/// Dispatch checks membership here instead of probing for methods at call
/// time; a runtime that omits an operation from [`DeviceRuntime::supported_ops`]
/// fails eagerly with [`RuntimeError::UnsupportedOperation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    CurrentDevice,
    SetDevice,
    DeviceCount,
    IsAvailable,
    Stream,
    CurrentStream,
    SetStream,
    SetStreamById,
    GetRawStream,
    Synchronize,
    GetDeviceProperties,
    GetComputeCapability,
    CreateStream,
    CreateEvent,
    DeviceScope,
}

impl Op {
    pub const ALL: [Op; 15] = [
        Op::CurrentDevice,
        Op::SetDevice,
        Op::DeviceCount,
        Op::IsAvailable,
        Op::Stream,
        Op::CurrentStream,
        Op::SetStream,
        Op::SetStreamById,
        Op::GetRawStream,
        Op::Synchronize,
        Op::GetDeviceProperties,
        Op::GetComputeCapability,
        Op::CreateStream,
        Op::CreateEvent,
        Op::DeviceScope,
    ];

    /// Stable wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Op::CurrentDevice => "current_device",
            Op::SetDevice => "set_device",
            Op::DeviceCount => "device_count",
            Op::IsAvailable => "is_available",
            Op::Stream => "stream",
            Op::CurrentStream => "current_stream",
            Op::SetStream => "set_stream",
            Op::SetStreamById => "set_stream_by_id",
            Op::GetRawStream => "get_raw_stream",
            Op::Synchronize => "synchronize",
            Op::GetDeviceProperties => "get_device_properties",
            Op::GetComputeCapability => "get_compute_capability",
            Op::CreateStream => "create_stream",
            Op::CreateEvent => "create_event",
            Op::DeviceScope => "device_scope",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Op {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        Op::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| RuntimeError::UnknownOperation(s.to_string()))
    }
}

/// Uniform device/stream/event surface a backend exposes to the
/// compiler/runtime above it.
///
/// The registry and dispatch layer never touch hardware themselves; they
/// route calls to whichever implementation is registered under a device
/// type name. Stream and event values are opaque handles supplied by the
/// backend's native driver.
///
/// # Implementing a runtime
///
/// ```ignore
/// use tansu::{DeviceRuntime, DeviceProperties, Result};
///
/// struct MyRuntime {
///     // driver-specific state
/// }
///
/// impl DeviceRuntime for MyRuntime {
///     fn name(&self) -> &str { "my-accel" }
///     fn device_count(&self) -> u32 { 0 }
///     // ...
/// }
/// ```
pub trait DeviceRuntime: Send + Sync {
    /// Stable name of this backend. Used as the registry key.
    fn name(&self) -> &str;

    /// Operations this runtime implements.
    ///
    /// Defaults to the full surface. Partial backends narrow this so that
    /// dispatch can reject unimplemented operations eagerly.
    fn supported_ops(&self) -> Vec<Op> {
        Op::ALL.to_vec()
    }

    /// Whether this runtime declares the given operation.
    fn supports(&self, op: Op) -> bool {
        self.supported_ops().contains(&op)
    }

    /// Whether the runtime is usable at all: linked in and at least one
    /// device visible.
    fn is_available(&self) -> bool {
        self.device_count() > 0
    }

    /// Number of visible devices. Returns 0 rather than failing when the
    /// runtime is linked but no devices are present.
    fn device_count(&self) -> u32;

    /// Index of the device the calling thread is bound to.
    ///
    /// Fails with [`RuntimeError::Unavailable`] when no device is present.
    fn current_device(&self) -> Result<u32>;

    /// Binds the calling thread to the given device.
    ///
    /// [`DeviceSpec::Current`] is a no-op pass-through.
    fn set_device(&self, device: &DeviceSpec) -> Result<()>;

    /// Returns a scope that makes `stream` the active stream for its
    /// dynamic extent. The scope is returned un-entered.
    fn stream(&self, stream: StreamHandle) -> Result<Box<dyn Scope>>;

    /// Active stream on the given (or current) device.
    fn current_stream(&self, device: Option<u32>) -> Result<StreamHandle>;

    /// Makes `stream` the active stream on its device.
    fn set_stream(&self, stream: StreamHandle) -> Result<()>;

    /// Rebuilds and applies a stream binding from raw identifiers, for
    /// callers on the far side of an ABI boundary that hold no live handle.
    fn set_stream_by_id(&self, stream_id: u64, device_index: u32, device_type: i32) -> Result<()>;

    /// Escape hatch exposing the native stream identifier for interop.
    ///
    /// May require the native runtime to be initialized; fails with
    /// [`RuntimeError::NotCompiled`] when it was never linked.
    fn get_raw_stream(&self, device: u32) -> Result<RawStream>;

    /// Blocks until all outstanding work on the given (or current)
    /// device's active stream completes. Unbounded; no timeout.
    fn synchronize(&self, device: Option<u32>) -> Result<()>;

    /// Static hardware facts for the given (or current) device.
    fn get_device_properties(&self, device: Option<u32>) -> Result<DeviceProperties>;

    /// Backend-defined hardware generation encoding, used upstream for
    /// capability-gated codegen.
    fn get_compute_capability(&self, device: Option<u32>) -> Result<u32> {
        let props = self.get_device_properties(device)?;
        Ok(props.compute_capability())
    }

    /// Stream factory. Options are forwarded verbatim; the handle is
    /// opaque to the registry.
    fn create_stream(&self, options: &StreamOptions) -> Result<StreamHandle>;

    /// Event factory. Options are forwarded verbatim; the handle is
    /// opaque to the registry.
    fn create_event(&self, options: &EventOptions) -> Result<EventHandle>;

    /// Device-scope factory: a scope that binds `device` on enter and
    /// restores the previous binding on exit. Returned un-entered.
    fn device_scope(&self, device: &DeviceSpec) -> Result<Box<dyn Scope>>;
}
