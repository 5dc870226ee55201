//! Configuration management for the Furby bridge

pub mod file;

use std::net::IpAddr;

use crate::{Error, Result};

pub use file::BridgeConfigFile;

/// Advertised name Furby Connect toys use
pub const DEFAULT_DEVICE_NAME: &str = "Furby";

/// Default HTTP API port
pub const DEFAULT_PORT: u16 = 3872;

/// Furby bridge configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Advertised name a peripheral must carry to be connected
    pub device_name: String,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Address to bind to
    pub bind: IpAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            api_server: ApiServerConfig {
                port: DEFAULT_PORT,
                bind: IpAddr::from([0, 0, 0, 0]),
            },
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a configured value cannot be parsed
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed config file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if a configured value cannot be parsed
    pub fn from_sources(
        fc: BridgeConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let device_name = env("FURBY_DEVICE_NAME")
            .or(fc.device_name)
            .unwrap_or(defaults.device_name);
        if device_name.trim().is_empty() {
            return Err(Error::Config("device name must not be empty".to_string()));
        }

        let port = match env("FURBY_BRIDGE_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("invalid FURBY_BRIDGE_PORT '{raw}': {e}")))?,
            None => fc.server.port.unwrap_or(defaults.api_server.port),
        };

        let bind = match env("FURBY_BRIDGE_BIND").or(fc.server.bind) {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("invalid bind address '{raw}': {e}")))?,
            None => defaults.api_server.bind,
        };

        Ok(Self {
            device_name,
            api_server: ApiServerConfig { port, bind },
        })
    }
}
