//! Pluggable accelerator-runtime registry.
//!
//! Heterogeneous compute backends expose a uniform device/stream/event
//! surface by implementing [`DeviceRuntime`]. A process-wide registry maps
//! device type names to implementations; [`dispatch`] is the front door
//! that resolves a backend by name and forwards the call, and [`worker`]
//! caches cheap-to-stale device facts for subprocess workers that must not
//! re-query hardware.
//!
//! ```
//! use tansu::{dispatch, sim};
//!
//! sim::register_sim("sim", 2);
//! assert_eq!(dispatch::device_count("sim").unwrap(), 2);
//! assert!(dispatch::is_available("sim").unwrap());
//! ```

pub mod device;
pub mod dispatch;
pub mod error;
pub mod handles;
pub mod registry;
pub mod runtime;
pub mod scope;
pub mod sim;
pub mod worker;

pub use device::{DeviceProperties, DeviceSpec};
pub use error::{Result, RuntimeError};
pub use handles::{EventHandle, EventOptions, RawStream, StreamHandle, StreamOptions};
pub use registry::{lookup, register, registered, Registry, StreamFn, StreamOp};
pub use runtime::{DeviceRuntime, Op};
pub use scope::{Scope, ScopedDevice, ScopedStream};
pub use worker::{worker, WorkerCache};
