//! Packet encoding for catalog commands

use serde_json::Value;

use crate::{Error, Result};

/// Largest packet that fits a default-MTU GATT write
pub const MAX_PACKET_LEN: usize = 20;

const MOOD_TYPES: [&str; 5] = [
    "excitedness",
    "displeasedness",
    "tiredness",
    "fullness",
    "wellness",
];

/// Encode a catalog command into the bytes written to the peripheral
///
/// # Errors
///
/// Returns `UnknownCommand` for names outside the catalog and `InvalidParams`
/// when a required parameter is missing or out of range
pub fn encode(command: &str, params: Option<&Value>) -> Result<Vec<u8>> {
    let descriptor =
        super::find(command).ok_or_else(|| Error::UnknownCommand(command.to_string()))?;

    let packet = match descriptor.name {
        "antenna" => vec![
            0x14,
            byte(params, "red")?,
            byte(params, "green")?,
            byte(params, "blue")?,
        ],
        "lcd" => vec![0xcd, u8::from(flag(params, "state")?)],
        "debug" => vec![0xdb],
        "cycleDebug" => vec![0xdc],
        "action" => vec![
            0x13,
            0x00,
            byte(params, "input")?,
            byte(params, "index")?,
            byte(params, "subindex")?,
            byte(params, "specific")?,
        ],
        "setName" => vec![0x21, byte(params, "name")?],
        "moodMeter" => vec![
            0x23,
            mood_action(params)?,
            mood_type(params)?,
            byte(params, "value")?,
        ],
        "raw" => raw(params)?,
        // catalogued but without an encoder
        other => return Err(Error::UnknownCommand(other.to_string())),
    };
    Ok(packet)
}

fn field<'a>(params: Option<&'a Value>, name: &str) -> Result<&'a Value> {
    params
        .and_then(|p| p.get(name))
        .ok_or_else(|| Error::InvalidParams(format!("missing '{name}'")))
}

fn byte(params: Option<&Value>, name: &str) -> Result<u8> {
    let value = field(params, name)?;
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| Error::InvalidParams(format!("'{name}' must be an integer in 0..=255")))
}

fn flag(params: Option<&Value>, name: &str) -> Result<bool> {
    match field(params, name)? {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        _ => Err(Error::InvalidParams(format!("'{name}' must be a boolean"))),
    }
}

fn mood_action(params: Option<&Value>) -> Result<u8> {
    match field(params, "action")?.as_str() {
        Some("set") => Ok(0x00),
        Some("increase") => Ok(0x01),
        _ => Err(Error::InvalidParams(
            "'action' must be \"set\" or \"increase\"".to_string(),
        )),
    }
}

fn mood_type(params: Option<&Value>) -> Result<u8> {
    let name = field(params, "type")?.as_str().unwrap_or_default();
    MOOD_TYPES
        .iter()
        .position(|t| *t == name)
        .and_then(|i| u8::try_from(i).ok())
        .ok_or_else(|| {
            Error::InvalidParams(format!("'type' must be one of {}", MOOD_TYPES.join(", ")))
        })
}

fn raw(params: Option<&Value>) -> Result<Vec<u8>> {
    let text = field(params, "packet")?
        .as_str()
        .ok_or_else(|| Error::InvalidParams("'packet' must be a hex string".to_string()))?;
    let bytes = hex::decode(text.trim())
        .map_err(|e| Error::InvalidParams(format!("'packet' is not valid hex: {e}")))?;
    if bytes.is_empty() || bytes.len() > MAX_PACKET_LEN {
        return Err(Error::InvalidParams(format!(
            "'packet' must be 1..={MAX_PACKET_LEN} bytes"
        )));
    }
    Ok(bytes)
}
