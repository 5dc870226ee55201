//! Device session for a connected Furby Connect

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use uuid::{Uuid, uuid};

use super::DeviceSession;
use crate::{Error, Result, commands};

/// Primary Furby service
pub const FLUFF_SERVICE: Uuid = uuid!("dab91435-b5a1-e29c-b041-bcd562613bde");

/// GeneralPlus characteristic that accepts command packets
pub const GENERALPLUS_WRITE: Uuid = uuid!("dab91383-b5a1-e29c-b041-bcd562613bde");

/// GeneralPlus characteristic the Furby notifies on
pub const GENERALPLUS_LISTEN: Uuid = uuid!("dab91382-b5a1-e29c-b041-bcd562613bde");

/// Session over one connected Furby
#[derive(Debug)]
pub struct FurbySession {
    device_id: String,
    peripheral: Peripheral,
    write: Characteristic,
}

impl FurbySession {
    /// Wrap a connected peripheral whose services have been discovered
    ///
    /// The peripheral is disconnected again if it lacks the command
    /// characteristic.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the peripheral does not expose
    /// [`GENERALPLUS_WRITE`]
    pub async fn open(device_id: String, peripheral: Peripheral) -> Result<Self> {
        let write = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == GENERALPLUS_WRITE);

        let Some(write) = write else {
            if let Err(e) = peripheral.disconnect().await {
                tracing::debug!(device_id = %device_id, error = %e, "disconnect after failed open");
            }
            return Err(Error::Connection(format!(
                "{device_id} has no command characteristic"
            )));
        };

        Ok(Self {
            device_id,
            peripheral,
            write,
        })
    }
}

#[async_trait]
impl DeviceSession for FurbySession {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn execute(&self, command: &str, params: Option<&serde_json::Value>) -> Result<()> {
        let packet = commands::encode(command, params)?;
        tracing::trace!(
            device_id = %self.device_id,
            command,
            packet = %hex::encode(&packet),
            "writing packet"
        );

        self.peripheral
            .write(&self.write, &packet, WriteType::WithResponse)
            .await
            .map_err(|e| Error::Execution(format!("{}: {e}", self.device_id)))
    }
}
