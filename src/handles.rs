use crate::device::DeviceSpec;

#[cfg(feature = "tansu-serde")]
use serde::{Deserialize, Serialize};

/// The backend's native, ABI-level stream identifier.
pub type RawStream = u64;

/// Identifies a stream on a specific device.
///
/// This is the raw triple used to rebuild a stream binding across
/// language/ABI boundaries; the registry treats it as opaque.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "tansu-serde", derive(Serialize, Deserialize))]
pub struct StreamHandle {
    pub id: u64,
    pub device_index: u32,
    pub device_type: i32,
}

/// Opaque event marker produced by a backend's event factory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "tansu-serde", derive(Serialize, Deserialize))]
pub struct EventHandle {
    pub id: u64,
}

/// Arguments forwarded verbatim to a backend's stream constructor.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "tansu-serde", derive(Serialize, Deserialize))]
pub struct StreamOptions {
    pub device: DeviceSpec,
    pub priority: i32,
}

/// Arguments forwarded verbatim to a backend's event constructor.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "tansu-serde", derive(Serialize, Deserialize))]
pub struct EventOptions {
    pub enable_timing: bool,
    pub blocking: bool,
    pub interprocess: bool,
}
