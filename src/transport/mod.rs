//! Peripheral transport seam
//!
//! The discovery controller and dispatcher only see the traits defined here.
//! The BLE implementation lives in [`ble`], the per-device session in [`furby`].

pub mod ble;
pub mod furby;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::Result;

pub use ble::BleTransport;
pub use furby::FurbySession;

/// Power state of the Bluetooth adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    PoweredOn,
    PoweredOff,
    Unknown,
}

/// Notification emitted by the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The adapter changed power state
    AdapterState(AdapterState),
    /// A peripheral advertised itself
    Discovered {
        device_id: String,
        name: Option<String>,
    },
    /// A connected peripheral dropped its connection
    Disconnected { device_id: String },
}

/// An established, usable connection to one peripheral
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Identifier of the peripheral this session talks to
    fn device_id(&self) -> &str;

    /// Execute a named command with optional parameters
    ///
    /// A failure here does not imply the peripheral disconnected.
    async fn execute(&self, command: &str, params: Option<&serde_json::Value>) -> Result<()>;
}

/// Discovery and connection capability of a peripheral transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stream of adapter, discovery and disconnect notifications
    async fn events(&self) -> Result<BoxStream<'static, TransportEvent>>;

    /// Start scanning for peripherals
    async fn start_scan(&self) -> Result<()>;

    /// Stop scanning for peripherals
    async fn stop_scan(&self) -> Result<()>;

    /// Connect to a discovered peripheral and open a session
    async fn connect(&self, device_id: &str) -> Result<Arc<dyn DeviceSession>>;

    /// Connect to a discovered peripheral and enumerate what it exposes
    async fn introspect(&self, device_id: &str) -> Result<Vec<ServiceInfo>>;
}

/// GATT service exposed by a peripheral
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub uuid: String,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicInfo>,
}

/// GATT characteristic exposed by a service
#[derive(Debug, Clone, Serialize)]
pub struct CharacteristicInfo {
    pub uuid: String,
    pub properties: Vec<String>,
}
