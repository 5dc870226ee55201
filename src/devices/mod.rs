//! Device registry for connected peripherals
//!
//! Devices enter the registry when the discovery controller establishes a
//! session and leave it when the transport reports a disconnect

pub mod registry;
pub mod types;

pub use registry::{DeviceRegistry, SharedDeviceRegistry};
pub use types::{DeviceEntry, DeviceInfo};
