//! HTTP API server for the Furby bridge

pub mod commands;
pub mod devices;
pub mod health;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::devices::SharedDeviceRegistry;
use crate::discovery::DiscoveryHandle;
use crate::dispatch::Dispatcher;

/// Shared state for API handlers
#[derive(Debug, Clone)]
pub struct ApiState {
    pub registry: SharedDeviceRegistry,
    pub dispatcher: Dispatcher,
    pub discovery: DiscoveryHandle,
}

impl ApiState {
    /// Build API state around a registry and the discovery handle
    #[must_use]
    pub fn new(registry: SharedDeviceRegistry, discovery: DiscoveryHandle) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&registry)),
            registry,
            discovery,
        }
    }
}

/// Build the router with all routes
pub fn router(state: Arc<ApiState>) -> Router {
    // every response carries an open CORS allowance
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(commands::router(Arc::clone(&state)))
        .merge(devices::router(Arc::clone(&state)))
        .merge(health::router(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    addr: SocketAddr,
}

impl ApiServer {
    /// Create a server that will listen on `addr`
    #[must_use]
    pub fn new(state: ApiState, addr: SocketAddr) -> Self {
        Self {
            state: Arc::new(state),
            addr,
        }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(addr = %self.addr, "API server listening");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
