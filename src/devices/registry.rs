//! Device registry for tracking connected peripherals

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::types::{DeviceEntry, DeviceInfo};
use crate::transport::DeviceSession;

/// Shared device registry handle
pub type SharedDeviceRegistry = Arc<DeviceRegistry>;

/// Registry of connected devices keyed by device identifier
///
/// Every mutation and snapshot takes the internal lock, so readers observe
/// either the whole mutation or none of it.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, DeviceEntry>>,
}

impl DeviceRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty registry behind an `Arc`
    #[must_use]
    pub fn shared() -> SharedDeviceRegistry {
        Arc::new(Self::new())
    }

    /// Register a connected device, replacing any stale session with the same id
    ///
    /// Returns the replaced session, if there was one
    pub async fn insert(
        &self,
        device_id: impl Into<String>,
        session: Arc<dyn DeviceSession>,
    ) -> Option<Arc<dyn DeviceSession>> {
        self.insert_named(device_id, None, session).await
    }

    /// Register a connected device along with its advertised name
    pub async fn insert_named(
        &self,
        device_id: impl Into<String>,
        name: Option<String>,
        session: Arc<dyn DeviceSession>,
    ) -> Option<Arc<dyn DeviceSession>> {
        let entry = DeviceEntry {
            session,
            name,
            connected_at: chrono::Utc::now(),
        };
        self.devices
            .write()
            .await
            .insert(device_id.into(), entry)
            .map(|old| old.session)
    }

    /// Remove a device; no-op if it is not registered
    pub async fn remove(&self, device_id: &str) -> Option<Arc<dyn DeviceSession>> {
        self.devices
            .write()
            .await
            .remove(device_id)
            .map(|entry| entry.session)
    }

    /// Get the session for a device
    pub async fn get(&self, device_id: &str) -> Option<Arc<dyn DeviceSession>> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|entry| Arc::clone(&entry.session))
    }

    /// Point-in-time snapshot of every registered session
    pub async fn all(&self) -> Vec<(String, Arc<dyn DeviceSession>)> {
        self.devices
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(&entry.session)))
            .collect()
    }

    /// Describe every registered device, ordered by id
    pub async fn list(&self) -> Vec<DeviceInfo> {
        let mut devices: Vec<DeviceInfo> = self
            .devices
            .read()
            .await
            .iter()
            .map(|(id, entry)| DeviceInfo {
                id: id.clone(),
                name: entry.name.clone(),
                connected_at: entry.connected_at.to_rfc3339(),
            })
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    /// Whether a device is registered
    pub async fn contains(&self, device_id: &str) -> bool {
        self.devices.read().await.contains_key(device_id)
    }

    /// Number of registered devices
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}
