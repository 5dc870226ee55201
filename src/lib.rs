//! Furby Bridge - HTTP control plane for Bluetooth LE Furby toys
//!
//! This library provides the core functionality for the bridge:
//! - Discovery and connection of peripherals advertising a configured name
//! - A registry of live device sessions
//! - Dispatch of named commands to one device or all of them
//! - An HTTP gateway in front of the dispatcher
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 HTTP Gateway                  │
//! │   /cmd/{name}  │  /list  │  /scan  │ /devices │
//! └───────┬────────────────────────────┬──────────┘
//!         │                            │
//! ┌───────▼────────┐          ┌────────▼─────────┐
//! │   Dispatcher   │          │    Discovery     │
//! │ target | bcast │          │    Controller    │
//! └───────┬────────┘          └────────┬─────────┘
//!         │ reads                writes│
//! ┌───────▼────────────────────────────▼─────────┐
//! │               Device Registry                 │
//! └───────────────────────┬───────────────────────┘
//!                         │
//! ┌───────────────────────▼───────────────────────┐
//! │          Transport (btleplug / Furby)          │
//! └───────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod devices;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod transport;

pub use config::Config;
pub use daemon::Daemon;
pub use devices::{DeviceRegistry, SharedDeviceRegistry};
pub use discovery::{DiscoveryController, DiscoveryHandle};
pub use dispatch::{CommandOutcome, CommandRequest, Dispatcher};
pub use error::{Error, Result};
pub use transport::{AdapterState, DeviceSession, Transport, TransportEvent};
