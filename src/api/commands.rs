//! Command endpoints
//!
//! `POST /cmd/{name}` hands a command to the dispatcher and acknowledges
//! immediately; per-device outcomes are logged, never returned. `GET /list`
//! serves the static catalog and `GET /scan` restarts scanning.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use super::ApiState;
use crate::commands::{self, CommandDescriptor};
use crate::dispatch::CommandRequest;
use crate::{Error, Result};

/// JSON body accepted by `POST /cmd/{name}`
#[derive(Debug, Default, Deserialize)]
struct CommandBody {
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    params: Option<serde_json::Value>,
}

/// Build command routes
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/cmd/{name}", post(run_command))
        .route("/list", get(list_commands))
        .route("/scan", get(scan))
        .with_state(state)
}

/// Parse a command request body
///
/// An empty body is treated as `{}`, i.e. a broadcast without params.
///
/// # Errors
///
/// Returns `MalformedRequest` if the body is not a JSON object of the expected
/// shape
pub fn parse_command(name: &str, body: &[u8]) -> Result<CommandRequest> {
    let body = body.trim_ascii();
    let parsed = if body.is_empty() {
        CommandBody::default()
    } else {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| Error::MalformedRequest(e.to_string()))?;
        if !value.is_object() {
            return Err(Error::MalformedRequest(
                "body must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| Error::MalformedRequest(e.to_string()))?
    };

    Ok(CommandRequest {
        name: name.to_string(),
        target: parsed.target,
        params: parsed.params,
    })
}

/// Dispatch a command to one or all devices
async fn run_command(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> (StatusCode, String) {
    let request = match parse_command(&name, &body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(command = %name, error = %e, "rejected malformed command");
            return (StatusCode::BAD_REQUEST, format!("error: {e}"));
        }
    };

    match state.dispatcher.submit(request).await {
        Ok(targets) => {
            tracing::debug!(command = %name, targets, "command dispatched");
            (StatusCode::OK, "ok".to_string())
        }
        Err(Error::TargetNotFound(target)) => {
            tracing::info!(command = %name, target_id = %target, "command target not found");
            (
                StatusCode::NOT_FOUND,
                "error: could not find target".to_string(),
            )
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {e}")),
    }
}

/// List the command catalog
async fn list_commands() -> Json<&'static [CommandDescriptor]> {
    Json(commands::catalog())
}

/// Restart scanning
async fn scan(State(state): State<Arc<ApiState>>) -> (StatusCode, String) {
    match state.discovery.rescan().await {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "scan restart failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "error: discovery is not running".to_string(),
            )
        }
    }
}
