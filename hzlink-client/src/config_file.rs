//! Declarative configuration loading from YAML, TOML, and environment variables.
//!
//! A [`FileConfig`] mirrors [`ClientConfig`](crate::config::ClientConfig) with
//! serde-friendly types and is converted through the builder, so file and
//! environment settings go through the same validation as programmatic ones.
//!
//! # Supported Formats
//!
//! - **YAML** (requires `config-file` feature): `ClientConfig::from_yaml("client.yaml")`
//! - **TOML** (requires `config-file` feature): `ClientConfig::from_toml("client.toml")`
//! - **Environment Variables** (always available): `ClientConfig::from_env()`
//!
//! # Example YAML
//!
//! ```yaml
//! address: "10.0.0.1:5701"
//! username: dev
//! password: dev-pass
//! client-type: RST
//! connection-timeout-ms: 5000
//! exchange-timeout-ms: 120000
//! heartbeat-interval-ms: 10000
//! queue-serializer-id: -12
//! ```

use std::time::Duration;

use hzlink_core::Address;
use serde::{Deserialize, Serialize};

use crate::config::{ClientConfig, ClientConfigBuilder, ConfigError};

/// File-based client configuration.
///
/// Every field is optional; missing fields keep the builder defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct FileConfig {
    /// Member address as `host:port`.
    pub address: Option<String>,
    /// Authentication username.
    pub username: Option<String>,
    /// Authentication password.
    pub password: Option<String>,
    /// Client type reported during authentication.
    pub client_type: Option<String>,
    /// Serialization version requested during authentication.
    pub serialization_version: Option<u8>,
    /// TCP connect timeout in milliseconds.
    pub connection_timeout_ms: Option<u64>,
    /// Request/response timeout in milliseconds.
    pub exchange_timeout_ms: Option<u64>,
    /// Heartbeat interval in milliseconds; 0 disables heartbeats.
    pub heartbeat_interval_ms: Option<u64>,
    /// Serializer id written into queue item envelopes.
    pub queue_serializer_id: Option<i32>,
}

impl TryFrom<FileConfig> for ClientConfig {
    type Error = ConfigError;

    fn try_from(file: FileConfig) -> Result<Self, Self::Error> {
        let mut builder = ClientConfigBuilder::new();

        if let Some(address) = file.address {
            let address: Address = address
                .parse()
                .map_err(|e| ConfigError::new(format!("invalid address: {e}")))?;
            builder = builder.address(address);
        }

        match (file.username, file.password) {
            (Some(username), Some(password)) => builder = builder.credentials(username, password),
            (Some(username), None) => {
                let password = ClientConfig::default().password().to_string();
                builder = builder.credentials(username, password);
            }
            (None, Some(password)) => {
                let username = ClientConfig::default().username().to_string();
                builder = builder.credentials(username, password);
            }
            (None, None) => {}
        }

        if let Some(client_type) = file.client_type {
            builder = builder.client_type(client_type);
        }
        if let Some(version) = file.serialization_version {
            builder = builder.serialization_version(version);
        }
        if let Some(ms) = file.connection_timeout_ms {
            builder = builder.connection_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.exchange_timeout_ms {
            builder = builder.exchange_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.heartbeat_interval_ms {
            builder = builder.heartbeat_interval(Duration::from_millis(ms));
        }
        if let Some(id) = file.queue_serializer_id {
            builder = builder.queue_serializer_id(id);
        }

        builder.build()
    }
}

impl ClientConfig {
    /// Loads configuration from a YAML file.
    ///
    /// Requires the `config-file` feature.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = ClientConfig::from_yaml("client.yaml")?;
    /// let client = HzClient::connect(config).await?;
    /// ```
    #[cfg(feature = "config-file")]
    pub fn from_yaml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(format!("failed to read YAML config file: {e}"))
        })?;
        let file_config: FileConfig = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::new(format!("failed to parse YAML config: {e}"))
        })?;
        file_config.try_into()
    }

    /// Loads configuration from a TOML file.
    ///
    /// Requires the `config-file` feature.
    #[cfg(feature = "config-file")]
    pub fn from_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(format!("failed to read TOML config file: {e}"))
        })?;
        let file_config: FileConfig = toml_crate::from_str(&content).map_err(|e| {
            ConfigError::new(format!("failed to parse TOML config: {e}"))
        })?;
        file_config.try_into()
    }

    /// Loads configuration from environment variables.
    ///
    /// This method is always available (no feature flag required).
    ///
    /// # Supported Environment Variables
    ///
    /// | Variable | Maps to |
    /// |----------|---------|
    /// | `HZ_ADDRESS` | Member address (`host:port`) |
    /// | `HZ_USERNAME` | Authentication username |
    /// | `HZ_PASSWORD` | Authentication password |
    /// | `HZ_CLIENT_TYPE` | Client type string |
    /// | `HZ_CONNECTION_TIMEOUT_MS` | Connect timeout in milliseconds |
    /// | `HZ_EXCHANGE_TIMEOUT_MS` | Request/response timeout in milliseconds |
    /// | `HZ_HEARTBEAT_INTERVAL_MS` | Heartbeat interval in milliseconds |
    /// | `HZ_QUEUE_SERIALIZER_ID` | Serializer id for queue items |
    ///
    /// Numeric variables that fail to parse are ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut file_config = FileConfig {
            address: var("HZ_ADDRESS"),
            username: var("HZ_USERNAME"),
            password: var("HZ_PASSWORD"),
            client_type: var("HZ_CLIENT_TYPE"),
            ..Default::default()
        };

        if let Some(ms) = var("HZ_CONNECTION_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            file_config.connection_timeout_ms = Some(ms);
        }
        if let Some(ms) = var("HZ_EXCHANGE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            file_config.exchange_timeout_ms = Some(ms);
        }
        if let Some(ms) = var("HZ_HEARTBEAT_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            file_config.heartbeat_interval_ms = Some(ms);
        }
        if let Some(id) = var("HZ_QUEUE_SERIALIZER_ID").and_then(|v| v.parse().ok()) {
            file_config.queue_serializer_id = Some(id);
        }

        file_config.try_into()
    }
}

/// Loads a configuration file, picking the format from its extension.
///
/// Supports `.yaml`, `.yml`, and `.toml` extensions.
/// Requires the `config-file` feature.
#[cfg(feature = "config-file")]
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => ClientConfig::from_yaml(path),
        Some("toml") => ClientConfig::from_toml(path),
        Some(ext) => Err(ConfigError::new(format!(
            "unsupported config file extension: .{ext} (expected .yaml, .yml, or .toml)"
        ))),
        None => Err(ConfigError::new(
            "config file has no extension; expected .yaml, .yml, or .toml",
        )),
    }
}
