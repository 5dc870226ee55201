//! Error types for the Furby bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Furby bridge
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Bluetooth stack error
    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Could not establish a session with a peripheral
    #[error("connection failed: {0}")]
    Connection(String),

    /// A session failed to execute a command
    #[error("execution failed: {0}")]
    Execution(String),

    /// Command name not present in the catalog
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Command parameters did not match the command's schema
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Named target is not in the device registry
    #[error("could not find target")]
    TargetNotFound(String),

    /// Request body could not be parsed
    #[error("{0}")]
    MalformedRequest(String),

    /// Discovery controller is gone or unreachable
    #[error("discovery error: {0}")]
    Discovery(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
