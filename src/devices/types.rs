//! Device registry types

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::transport::DeviceSession;

/// A registry entry: the live session plus bookkeeping
#[derive(Clone)]
pub struct DeviceEntry {
    pub session: Arc<dyn DeviceSession>,
    pub name: Option<String>,
    pub connected_at: DateTime<Utc>,
}

impl std::fmt::Debug for DeviceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEntry")
            .field("device_id", &self.session.device_id())
            .field("name", &self.name)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a connected device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: Option<String>,
    pub connected_at: String,
}
