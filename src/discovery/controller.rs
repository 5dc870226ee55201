//! Discovery controller state machine
//!
//! Consumes transport notifications and its own control messages on a single
//! task. Connect attempts run as spawned tasks and report back through the
//! control channel, so registry inserts and removes all happen here.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;

use crate::devices::SharedDeviceRegistry;
use crate::transport::{AdapterState, DeviceSession, Transport, TransportEvent};
use crate::{Error, Result};

const CONTROL_CHANNEL_CAPACITY: usize = 64;

/// Connection state of a peripheral the controller has seen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralState {
    Connecting,
    Connected,
}

/// A tracked peripheral and the connect attempt that produced its state
#[derive(Debug, Clone, Copy)]
struct Tracked {
    state: PeripheralState,
    attempt: u64,
}

/// Messages posted to the controller by its handle and its connect tasks
pub(crate) enum ControlMessage {
    /// Stop and restart scanning
    Rescan,
    /// A connect attempt produced a session
    Connected {
        device_id: String,
        attempt: u64,
        name: Option<String>,
        session: Arc<dyn DeviceSession>,
    },
    /// A connect attempt failed
    ConnectFailed {
        device_id: String,
        attempt: u64,
        error: Error,
    },
}

/// Cloneable handle for poking a running controller
#[derive(Debug, Clone)]
pub struct DiscoveryHandle {
    tx: mpsc::Sender<ControlMessage>,
}

impl std::fmt::Debug for ControlMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rescan => f.write_str("Rescan"),
            Self::Connected {
                device_id, attempt, ..
            } => write!(f, "Connected({device_id}#{attempt})"),
            Self::ConnectFailed {
                device_id,
                attempt,
                error,
            } => write!(f, "ConnectFailed({device_id}#{attempt}: {error})"),
        }
    }
}

impl DiscoveryHandle {
    /// Ask the controller to restart scanning
    ///
    /// # Errors
    ///
    /// Returns error if the controller is no longer running
    pub async fn rescan(&self) -> Result<()> {
        self.tx
            .send(ControlMessage::Rescan)
            .await
            .map_err(|_| Error::Discovery("discovery is not running".to_string()))
    }
}

/// Drives scanning and connection from transport notifications
pub struct DiscoveryController {
    transport: Arc<dyn Transport>,
    registry: SharedDeviceRegistry,
    device_name: String,
    peripherals: HashMap<String, Tracked>,
    next_attempt: u64,
    tx: mpsc::Sender<ControlMessage>,
    rx: mpsc::Receiver<ControlMessage>,
}

impl DiscoveryController {
    /// Create a controller and the handle used to reach it
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: SharedDeviceRegistry,
        device_name: impl Into<String>,
    ) -> (Self, DiscoveryHandle) {
        let (tx, rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let handle = DiscoveryHandle { tx: tx.clone() };
        let controller = Self {
            transport,
            registry,
            device_name: device_name.into(),
            peripherals: HashMap::new(),
            next_attempt: 0,
            tx,
            rx,
        };
        (controller, handle)
    }

    /// Current state of a peripheral, if the controller is tracking it
    #[must_use]
    pub fn peripheral_state(&self, device_id: &str) -> Option<PeripheralState> {
        self.peripherals.get(device_id).map(|t| t.state)
    }

    /// Subscribe to the transport and process events until its stream ends
    ///
    /// # Errors
    ///
    /// Returns error if the transport event stream cannot be opened
    pub async fn run(self) -> Result<()> {
        let events = self.transport.events().await?;
        self.run_with(events).await;
        Ok(())
    }

    /// Process events from the given stream until it ends
    pub async fn run_with(mut self, mut events: BoxStream<'static, TransportEvent>) {
        tracing::info!(device_name = %self.device_name, "discovery controller started");

        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else {
                        tracing::info!("transport event stream closed");
                        break;
                    };
                    self.handle_event(event).await;
                }
                Some(message) = self.rx.recv() => {
                    self.handle_control(message).await;
                }
            }
        }
    }

    /// Apply one transport notification
    pub async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::AdapterState(state) => self.on_adapter_state(state).await,
            TransportEvent::Discovered { device_id, name } => self.on_discovered(device_id, name),
            TransportEvent::Disconnected { device_id } => self.on_disconnected(&device_id).await,
        }
    }

    pub(crate) async fn handle_control(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Rescan => self.rescan().await,
            ControlMessage::Connected {
                device_id,
                attempt,
                name,
                session,
            } => {
                if !self.is_pending(&device_id, attempt) {
                    // the peripheral went away while this attempt was in flight
                    tracing::debug!(device_id = %device_id, attempt, "dropping stale session");
                    return;
                }
                let replaced = self
                    .registry
                    .insert_named(device_id.clone(), name, session)
                    .await;
                self.peripherals.insert(
                    device_id.clone(),
                    Tracked {
                        state: PeripheralState::Connected,
                        attempt,
                    },
                );
                if replaced.is_some() {
                    tracing::info!(device_id = %device_id, "device reconnected, session replaced");
                } else {
                    tracing::info!(device_id = %device_id, "device connected");
                }
            }
            ControlMessage::ConnectFailed {
                device_id,
                attempt,
                error,
            } => {
                if self.is_pending(&device_id, attempt) {
                    self.peripherals.remove(&device_id);
                }
                tracing::warn!(device_id = %device_id, error = %error, "connection failed");
            }
        }
    }

    /// Whether `attempt` is the connect currently in flight for `device_id`
    fn is_pending(&self, device_id: &str, attempt: u64) -> bool {
        self.peripherals.get(device_id).is_some_and(|t| {
            t.state == PeripheralState::Connecting && t.attempt == attempt
        })
    }

    async fn on_adapter_state(&self, state: AdapterState) {
        let result = if state == AdapterState::PoweredOn {
            tracing::info!("adapter powered on, starting scan");
            self.transport.start_scan().await
        } else {
            tracing::info!(?state, "adapter not powered, stopping scan");
            self.transport.stop_scan().await
        };
        if let Err(e) = result {
            tracing::warn!(?state, error = %e, "failed to apply adapter state");
        }
    }

    fn on_discovered(&mut self, device_id: String, name: Option<String>) {
        if name.as_deref() != Some(self.device_name.as_str()) {
            tracing::trace!(device_id = %device_id, ?name, "ignoring peripheral");
            return;
        }

        if self.peripheral_state(&device_id) == Some(PeripheralState::Connecting) {
            tracing::debug!(device_id = %device_id, "connect already in flight");
            return;
        }

        tracing::info!(device_id = %device_id, "discovered device, connecting");
        let attempt = self.next_attempt;
        self.next_attempt += 1;
        self.peripherals.insert(
            device_id.clone(),
            Tracked {
                state: PeripheralState::Connecting,
                attempt,
            },
        );

        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = match transport.connect(&device_id).await {
                Ok(session) => ControlMessage::Connected {
                    device_id,
                    attempt,
                    name,
                    session,
                },
                Err(error) => ControlMessage::ConnectFailed {
                    device_id,
                    attempt,
                    error,
                },
            };
            if tx.send(message).await.is_err() {
                tracing::debug!("controller stopped before connect completed");
            }
        });
    }

    async fn on_disconnected(&mut self, device_id: &str) {
        // forgetting a connecting peripheral turns its pending attempt stale
        if let Some(tracked) = self.peripherals.remove(device_id)
            && tracked.state == PeripheralState::Connecting
        {
            tracing::debug!(device_id = %device_id, "disconnected before connect completed");
        }
        if self.registry.remove(device_id).await.is_some() {
            tracing::info!(device_id = %device_id, "device disconnected");
        }
    }

    async fn rescan(&self) {
        tracing::info!("restarting scan");
        if let Err(e) = self.transport.stop_scan().await {
            tracing::debug!(error = %e, "stop scan before restart failed");
        }
        if let Err(e) = self.transport.start_scan().await {
            tracing::warn!(error = %e, "failed to restart scan");
        }
    }

    #[cfg(test)]
    pub(crate) async fn next_control(&mut self) -> Option<ControlMessage> {
        self.rx.recv().await
    }
}
