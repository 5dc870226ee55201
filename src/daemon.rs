//! Bridge daemon
//!
//! Wires the transport, registry, discovery controller and API server
//! together and runs them until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::{ApiServer, ApiState};
use crate::devices::DeviceRegistry;
use crate::discovery::DiscoveryController;
use crate::transport::{BleTransport, Transport};
use crate::{Config, Error, Result};

/// Long-running bridge service
pub struct Daemon {
    config: Config,
    transport: Arc<dyn Transport>,
}

impl Daemon {
    /// Create a daemon on the host's Bluetooth adapter
    ///
    /// # Errors
    ///
    /// Returns error if no Bluetooth adapter is available
    pub async fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(BleTransport::new().await?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a daemon on an arbitrary transport
    #[must_use]
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Run the daemon until interrupted
    ///
    /// If the transport's event stream ends the API keeps serving; no new
    /// devices will be discovered.
    ///
    /// # Errors
    ///
    /// Returns error if the transport cannot be subscribed to or the API
    /// server fails
    pub async fn run(self) -> Result<()> {
        let registry = DeviceRegistry::shared();
        let (controller, discovery_handle) = DiscoveryController::new(
            Arc::clone(&self.transport),
            Arc::clone(&registry),
            self.config.device_name.clone(),
        );

        let events = self.transport.events().await?;
        let mut discovery = tokio::spawn(controller.run_with(events));
        let mut discovery_running = true;

        let addr = SocketAddr::new(self.config.api_server.bind, self.config.api_server.port);
        let mut api = ApiServer::new(ApiState::new(registry, discovery_handle), addr).spawn();

        tracing::info!(
            device_name = %self.config.device_name,
            addr = %addr,
            "furby bridge running"
        );

        let outcome = loop {
            tokio::select! {
                result = &mut api => {
                    break match result {
                        Ok(result) => result,
                        Err(e) => Err(Error::Config(format!("API server task failed: {e}"))),
                    };
                }
                result = &mut discovery, if discovery_running => {
                    discovery_running = false;
                    if let Err(e) = result {
                        tracing::error!(error = %e, "discovery task failed");
                    }
                    tracing::warn!("discovery stopped, no further devices will connect");
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                    break Ok(());
                }
            }
        };

        api.abort();
        discovery.abort();
        outcome
    }
}
