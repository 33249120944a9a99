use thiserror::Error;

use crate::runtime::Op;

/// Errors surfaced by the runtime registry and dispatch layer.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No runtime has been registered under the requested device type.
    #[error("no runtime registered for device type `{0}`")]
    NotRegistered(String),

    /// The runtime is registered but does not declare this operation.
    #[error("runtime `{backend}` does not implement `{op}`")]
    UnsupportedOperation { backend: String, op: Op },

    /// The runtime is present but sees no usable devices.
    #[error("runtime `{0}` has no visible devices")]
    Unavailable(String),

    /// Native interop was requested but the runtime was built without its
    /// native library.
    #[error("runtime `{0}` was built without native support")]
    NotCompiled(String),

    /// Device index past the runtime's device count.
    #[error("device index {index} out of range for `{backend}` ({count} devices)")]
    DeviceIndexOutOfRange {
        backend: String,
        index: u32,
        count: u32,
    },

    /// Operation name outside the contract surface.
    #[error("unknown runtime operation `{0}`")]
    UnknownOperation(String),

    /// Device spec that cannot be resolved against the runtime.
    #[error("invalid device `{0}`")]
    InvalidDevice(String),
}

/// Convenient crate-wide result type.
pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;
