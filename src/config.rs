//! # Configuration Management
//!
//! Centralized configuration for the transport library.
//!
//! This module provides structured configuration for servers and clients:
//! listen/connect addresses, connection limits, and logging settings.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - TOML strings via `from_toml()`
//! - Environment-variable overrides via `from_env()`
//! - Direct instantiation with defaults

use crate::error::{NetError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Max allowed frame body size (16 MB). A decoded header claiming more than
/// this is treated as a framing error and closes the connection.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// First identity a server hands out; the counter is monotonic from here.
pub const FIRST_CLIENT_ID: u32 = 10_000;

/// Top-level configuration containing all configurable settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NetError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| NetError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables, starting from defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("FRAMELINK_SERVER_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(max) = std::env::var("FRAMELINK_MAX_CONNECTIONS") {
            if let Ok(val) = max.parse::<usize>() {
                config.server.max_connections = val;
            }
        }

        if let Ok(host) = std::env::var("FRAMELINK_CLIENT_HOST") {
            config.client.host = host;
        }

        if let Ok(port) = std::env::var("FRAMELINK_CLIENT_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                config.client.port = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration.
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration for common misconfigurations.
    ///
    /// Returns a list of validation errors. Empty list means the
    /// configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.client.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(NetError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:60000")
    pub address: String,

    /// Maximum number of simultaneously tracked connections. Further
    /// sockets are dropped before the connect hook runs.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("0.0.0.0:60000"),
            max_connections: 1000,
        }
    }
}

impl ServerConfig {
    /// Server configuration listening on one port, all interfaces.
    pub fn on_port(port: u16) -> Self {
        Self {
            address: format!("0.0.0.0:{port}"),
            ..Self::default()
        }
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("server.address is not a socket address: {}", self.address));
        }

        if self.max_connections == 0 {
            errors.push("server.max_connections must be at least 1".to_string());
        }

        errors
    }
}

/// Client-specific configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Remote host to connect to (name or address)
    pub host: String,

    /// Remote port to connect to
    pub port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 60000,
        }
    }
}

impl ClientConfig {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.is_empty() {
            errors.push("client.host must not be empty".to_string());
        }

        if self.port == 0 {
            errors.push("client.port must not be 0".to_string());
        }

        errors
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn" or "error"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
        }
    }
}

impl LoggingConfig {
    /// Parsed `tracing` level for this configuration.
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    fn validate(&self) -> Vec<String> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        if LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            Vec::new()
        } else {
            vec![format!("logging.level is not a known level: {}", self.level)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_clean() {
        assert!(NetworkConfig::default().validate().is_empty());
    }

    #[test]
    fn toml_round_trip() {
        let config = NetworkConfig::from_toml(
            r#"
            [server]
            address = "127.0.0.1:9000"
            max_connections = 8

            [client]
            host = "example.org"
            port = 9000

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.address, "127.0.0.1:9000");
        assert_eq!(config.server.max_connections, 8);
        assert_eq!(config.client.host, "example.org");
        assert_eq!(config.logging.tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn bad_values_are_reported() {
        let config = NetworkConfig::default_with_overrides(|c| {
            c.server.address = String::from("not-an-address");
            c.server.max_connections = 0;
            c.client.port = 0;
        });

        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(config.validate_strict().is_err());
    }
}
