use crate::error::{Result, RuntimeError};

#[cfg(feature = "tansu-serde")]
use serde::{Deserialize, Serialize};

/// How callers refer to a device.
///
/// Mirrors the convenience forms accepted by accelerator runtimes: a plain
/// index, a qualified name such as `"sim:1"`, or nothing at all, meaning
/// whatever device the calling thread is currently bound to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "tansu-serde", derive(Serialize, Deserialize))]
pub enum DeviceSpec {
    /// Explicit device index.
    Index(u32),
    /// Device given by name, e.g. `"sim:1"`. The prefix must match the
    /// backend the spec is resolved against.
    Named(String),
    /// The device the calling thread is currently bound to.
    #[default]
    Current,
}

impl DeviceSpec {
    /// Resolves the spec to an index for the given backend.
    ///
    /// Returns `None` for the "current device" forms (`Current`, or a bare
    /// name with no index). A named spec whose prefix does not match
    /// `backend`, or whose index part does not parse, fails with
    /// [`RuntimeError::InvalidDevice`].
    pub fn resolve(&self, backend: &str) -> Result<Option<u32>> {
        match self {
            DeviceSpec::Index(index) => Ok(Some(*index)),
            DeviceSpec::Current => Ok(None),
            DeviceSpec::Named(spec) => {
                let (name, index) = match spec.split_once(':') {
                    Some((name, raw)) => {
                        let index = raw
                            .parse::<u32>()
                            .map_err(|_| RuntimeError::InvalidDevice(spec.clone()))?;
                        (name, Some(index))
                    }
                    None => (spec.as_str(), None),
                };
                if name != backend {
                    return Err(RuntimeError::InvalidDevice(spec.clone()));
                }
                Ok(index)
            }
        }
    }
}

impl From<u32> for DeviceSpec {
    fn from(index: u32) -> Self {
        DeviceSpec::Index(index)
    }
}

impl From<&str> for DeviceSpec {
    fn from(name: &str) -> Self {
        DeviceSpec::Named(name.to_string())
    }
}

/// Static facts about a single device.
///
/// Opaque to the registry beyond being a read-only record; populated once
/// per process by the worker cache and never re-queried.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "tansu-serde", derive(Serialize, Deserialize))]
pub struct DeviceProperties {
    pub name: String,
    pub total_memory: u64,
    pub multi_processor_count: u32,
    pub major: u32,
    pub minor: u32,
}

impl DeviceProperties {
    /// Hardware generation in the conventional `major * 10 + minor` encoding.
    pub fn compute_capability(&self) -> u32 {
        self.major * 10 + self.minor
    }
}

impl std::fmt::Display for DeviceProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[Name {} -- Mem {} -- CC {}]",
            self.name,
            self.total_memory,
            self.compute_capability()
        )
    }
}
