//! Connected device listing

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};

use super::ApiState;
use crate::devices::DeviceInfo;

/// Build device routes
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/devices", get(list_devices))
        .with_state(state)
}

/// List all connected devices
async fn list_devices(State(state): State<Arc<ApiState>>) -> Json<Vec<DeviceInfo>> {
    Json(state.registry.list().await)
}
