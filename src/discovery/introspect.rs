//! One-shot peripheral introspection

use futures::StreamExt;
use futures::stream::BoxStream;

use crate::transport::{AdapterState, ServiceInfo, Transport, TransportEvent};
use crate::{Error, Result};

/// Wait for the first peripheral advertising `device_name` and enumerate it
///
/// Scanning follows the adapter state exactly as in normal service, but no
/// session is registered: the first match is inspected and scanning stops.
///
/// # Errors
///
/// Returns error if the event stream ends before a match or the peripheral
/// cannot be inspected
pub async fn introspect(
    transport: &dyn Transport,
    mut events: BoxStream<'static, TransportEvent>,
    device_name: &str,
) -> Result<(String, Vec<ServiceInfo>)> {
    while let Some(event) = events.next().await {
        match event {
            TransportEvent::AdapterState(AdapterState::PoweredOn) => {
                transport.start_scan().await?;
            }
            TransportEvent::AdapterState(state) => {
                if let Err(e) = transport.stop_scan().await {
                    tracing::debug!(?state, error = %e, "failed to stop scan");
                }
            }
            TransportEvent::Discovered { device_id, name }
                if name.as_deref() == Some(device_name) =>
            {
                tracing::info!(device_id = %device_id, "found device, introspecting");
                if let Err(e) = transport.stop_scan().await {
                    tracing::debug!(error = %e, "failed to stop scan");
                }
                let services = transport.introspect(&device_id).await?;
                return Ok((device_id, services));
            }
            TransportEvent::Discovered { .. } | TransportEvent::Disconnected { .. } => {}
        }
    }

    Err(Error::Discovery(format!(
        "event stream ended before a '{device_name}' was found"
    )))
}
