//! Device-type-parameterized front door.
//!
//! Every function takes a `device_type` name first, resolves the runtime
//! through the process-wide registry, and forwards the call. An absent
//! backend is a hard [`RuntimeError::NotRegistered`] here, unlike
//! [`crate::registry::lookup`] which soft-returns `None` for callers that
//! can fall back. External code should come through this module rather
//! than reaching into the registry directly.

use std::sync::Arc;

use crate::device::{DeviceProperties, DeviceSpec};
use crate::error::{Result, RuntimeError};
use crate::handles::{EventHandle, EventOptions, RawStream, StreamHandle, StreamOptions};
use crate::registry;
use crate::runtime::{DeviceRuntime, Op};
use crate::scope::{ScopedDevice, ScopedStream};

fn resolve(device_type: &str) -> Result<Arc<dyn DeviceRuntime>> {
    registry::lookup(device_type)
        .ok_or_else(|| RuntimeError::NotRegistered(device_type.to_string()))
}

fn resolve_op(device_type: &str, op: Op) -> Result<Arc<dyn DeviceRuntime>> {
    let runtime = resolve(device_type)?;
    if !runtime.supports(op) {
        return Err(RuntimeError::UnsupportedOperation {
            backend: device_type.to_string(),
            op,
        });
    }
    Ok(runtime)
}

/// Whether the named backend declares the named operation.
///
/// Fails with [`RuntimeError::UnknownOperation`] for names outside the
/// contract surface, and [`RuntimeError::NotRegistered`] for unknown
/// backends.
pub fn supports(device_type: &str, op_name: &str) -> Result<bool> {
    let op: Op = op_name.parse()?;
    Ok(resolve(device_type)?.supports(op))
}

pub fn current_device(device_type: &str) -> Result<u32> {
    resolve_op(device_type, Op::CurrentDevice)?.current_device()
}

pub fn set_device(device_type: &str, device: &DeviceSpec) -> Result<()> {
    resolve_op(device_type, Op::SetDevice)?.set_device(device)
}

pub fn device_count(device_type: &str) -> Result<u32> {
    Ok(resolve_op(device_type, Op::DeviceCount)?.device_count())
}

pub fn is_available(device_type: &str) -> Result<bool> {
    Ok(resolve_op(device_type, Op::IsAvailable)?.is_available())
}

/// Enters a scope that makes `stream` the active stream until the returned
/// guard is dropped.
pub fn stream(device_type: &str, stream: StreamHandle) -> Result<ScopedStream> {
    let scope = resolve_op(device_type, Op::Stream)?.stream(stream)?;
    Ok(ScopedStream::enter(scope))
}

pub fn current_stream(device_type: &str, device: Option<u32>) -> Result<StreamHandle> {
    resolve_op(device_type, Op::CurrentStream)?.current_stream(device)
}

pub fn set_stream(device_type: &str, stream: StreamHandle) -> Result<()> {
    resolve_op(device_type, Op::SetStream)?.set_stream(stream)
}

pub fn set_stream_by_id(
    device_type: &str,
    stream_id: u64,
    device_index: u32,
    device_type_tag: i32,
) -> Result<()> {
    resolve_op(device_type, Op::SetStreamById)?.set_stream_by_id(
        stream_id,
        device_index,
        device_type_tag,
    )
}

pub fn get_raw_stream(device_type: &str, device: u32) -> Result<RawStream> {
    resolve_op(device_type, Op::GetRawStream)?.get_raw_stream(device)
}

pub fn synchronize(device_type: &str, device: Option<u32>) -> Result<()> {
    resolve_op(device_type, Op::Synchronize)?.synchronize(device)
}

pub fn get_device_properties(device_type: &str, device: Option<u32>) -> Result<DeviceProperties> {
    resolve_op(device_type, Op::GetDeviceProperties)?.get_device_properties(device)
}

pub fn get_compute_capability(device_type: &str, device: Option<u32>) -> Result<u32> {
    resolve_op(device_type, Op::GetComputeCapability)?.get_compute_capability(device)
}

/// Constructs a stream through the backend's factory, forwarding the
/// options verbatim.
pub fn new_stream(device_type: &str, options: &StreamOptions) -> Result<StreamHandle> {
    resolve_op(device_type, Op::CreateStream)?.create_stream(options)
}

/// Constructs an event through the backend's factory, forwarding the
/// options verbatim.
pub fn new_event(device_type: &str, options: &EventOptions) -> Result<EventHandle> {
    resolve_op(device_type, Op::CreateEvent)?.create_event(options)
}

/// Enters a scope that binds `device` until the returned guard is dropped.
pub fn device_scope(device_type: &str, device: &DeviceSpec) -> Result<ScopedDevice> {
    let scope = resolve_op(device_type, Op::DeviceScope)?.device_scope(device)?;
    Ok(ScopedDevice::enter(scope))
}
