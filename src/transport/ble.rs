//! Bluetooth LE transport backed by `btleplug`

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, CharPropFlags, Manager as _, Peripheral as _,
    ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::RwLock;

use super::furby::FurbySession;
use super::{
    AdapterState, CharacteristicInfo, DeviceSession, ServiceInfo, Transport, TransportEvent,
};
use crate::{Error, Result};

/// Named peripherals reported during the current scan
///
/// Unnamed peripherals are never kept. An entry is dropped on disconnect and
/// the whole set is cleared when a scan starts, so each peripheral is reported
/// again on its next advertisement.
#[derive(Debug)]
struct Announced<P> {
    peripherals: HashMap<String, P>,
}

impl<P> Default for Announced<P> {
    fn default() -> Self {
        Self {
            peripherals: HashMap::new(),
        }
    }
}

impl<P: Clone> Announced<P> {
    fn contains(&self, device_id: &str) -> bool {
        self.peripherals.contains_key(device_id)
    }

    fn announce(&mut self, device_id: String, peripheral: P) {
        self.peripherals.insert(device_id, peripheral);
    }

    fn get(&self, device_id: &str) -> Option<P> {
        self.peripherals.get(device_id).cloned()
    }

    fn rearm(&mut self, device_id: &str) {
        self.peripherals.remove(device_id);
    }

    fn clear(&mut self) {
        self.peripherals.clear();
    }

    fn len(&self) -> usize {
        self.peripherals.len()
    }
}

type SeenPeripherals = Arc<RwLock<Announced<Peripheral>>>;

/// Transport over the first Bluetooth adapter on the host
pub struct BleTransport {
    _manager: Manager,
    adapter: Adapter,
    seen: SeenPeripherals,
}

impl BleTransport {
    /// Open the first available Bluetooth adapter
    ///
    /// # Errors
    ///
    /// Returns error if the Bluetooth stack is unavailable or there is no adapter
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Config("no bluetooth adapter found".to_string()))?;

        match adapter.adapter_info().await {
            Ok(info) => tracing::info!(adapter = %info, "using bluetooth adapter"),
            Err(e) => tracing::debug!(error = %e, "could not read adapter info"),
        }

        Ok(Self {
            _manager: manager,
            adapter,
            seen: Arc::new(RwLock::new(Announced::default())),
        })
    }

    async fn peripheral(&self, device_id: &str) -> Result<Peripheral> {
        self.seen
            .read()
            .await
            .get(device_id)
            .ok_or_else(|| Error::Connection(format!("unknown peripheral {device_id}")))
    }

    async fn connected_peripheral(&self, device_id: &str) -> Result<Peripheral> {
        let peripheral = self.peripheral(device_id).await?;
        if !peripheral.is_connected().await? {
            peripheral
                .connect()
                .await
                .map_err(|e| Error::Connection(format!("{device_id}: {e}")))?;
        }
        peripheral.discover_services().await?;
        Ok(peripheral)
    }
}

const fn adapter_state(state: CentralState) -> AdapterState {
    match state {
        CentralState::PoweredOn => AdapterState::PoweredOn,
        CentralState::PoweredOff => AdapterState::PoweredOff,
        _ => AdapterState::Unknown,
    }
}

/// Map a raw adapter event onto a transport event
///
/// Discovery is reported once per appearance: on `DeviceDiscovered`, or on the
/// first update that carries a name if the discovery did not. A disconnect or
/// a scan restart re-arms the peripheral so its next advertisement is
/// reported again.
async fn translate(
    adapter: &Adapter,
    seen: &RwLock<Announced<Peripheral>>,
    event: CentralEvent,
) -> Option<TransportEvent> {
    match event {
        CentralEvent::StateUpdate(state) => Some(TransportEvent::AdapterState(adapter_state(state))),
        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
            let device_id = id.to_string();
            if seen.read().await.contains(&device_id) {
                return None;
            }

            let peripheral = match adapter.peripheral(&id).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!(device_id = %device_id, error = %e, "peripheral vanished");
                    return None;
                }
            };
            let name = match peripheral.properties().await {
                Ok(props) => props.and_then(|p| p.local_name),
                Err(e) => {
                    tracing::debug!(device_id = %device_id, error = %e, "failed to read properties");
                    None
                }
            };

            let name = name?;
            seen.write().await.announce(device_id.clone(), peripheral);
            Some(TransportEvent::Discovered {
                device_id,
                name: Some(name),
            })
        }
        CentralEvent::DeviceDisconnected(id) => {
            let device_id = id.to_string();
            seen.write().await.rearm(&device_id);
            Some(TransportEvent::Disconnected { device_id })
        }
        _ => None,
    }
}

fn property_labels(flags: CharPropFlags) -> Vec<String> {
    flags
        .iter_names()
        .map(|(name, _)| name.to_lowercase())
        .collect()
}

#[async_trait]
impl Transport for BleTransport {
    async fn events(&self) -> Result<BoxStream<'static, TransportEvent>> {
        // adapters do not always report their initial state as an event
        let initial = match self.adapter.adapter_state().await {
            Ok(state) => Some(TransportEvent::AdapterState(adapter_state(state))),
            Err(e) => {
                tracing::warn!(error = %e, "could not read adapter state");
                None
            }
        };

        let adapter = self.adapter.clone();
        let seen = Arc::clone(&self.seen);
        let events = self.adapter.events().await?.filter_map(move |event| {
            let adapter = adapter.clone();
            let seen = Arc::clone(&seen);
            async move { translate(&adapter, &seen, event).await }
        });

        Ok(futures::stream::iter(initial).chain(events).boxed())
    }

    async fn start_scan(&self) -> Result<()> {
        {
            let mut seen = self.seen.write().await;
            tracing::debug!(forgotten = seen.len(), "re-arming peripherals for new scan");
            seen.clear();
        }
        self.adapter.start_scan(ScanFilter::default()).await?;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn connect(&self, device_id: &str) -> Result<Arc<dyn DeviceSession>> {
        let peripheral = self.connected_peripheral(device_id).await?;
        let session = FurbySession::open(device_id.to_string(), peripheral).await?;
        Ok(Arc::new(session))
    }

    async fn introspect(&self, device_id: &str) -> Result<Vec<ServiceInfo>> {
        let peripheral = self.connected_peripheral(device_id).await?;

        let mut services: Vec<ServiceInfo> = peripheral
            .services()
            .into_iter()
            .map(|service| {
                let mut characteristics: Vec<CharacteristicInfo> = service
                    .characteristics
                    .iter()
                    .map(|c| CharacteristicInfo {
                        uuid: c.uuid.to_string(),
                        properties: property_labels(c.properties),
                    })
                    .collect();
                characteristics.sort_by(|a, b| a.uuid.cmp(&b.uuid));
                ServiceInfo {
                    uuid: service.uuid.to_string(),
                    primary: service.primary,
                    characteristics,
                }
            })
            .collect();
        services.sort_by(|a, b| a.uuid.cmp(&b.uuid));

        if let Err(e) = peripheral.disconnect().await {
            tracing::debug!(device_id = %device_id, error = %e, "disconnect after introspection failed");
        }

        Ok(services)
    }
}
