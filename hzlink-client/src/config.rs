//! Client configuration types and builders.

use std::time::Duration;

use hzlink_core::{Address, HzError};

/// Default member address.
const DEFAULT_HOST: &str = "127.0.0.1";
/// Default member port.
const DEFAULT_PORT: u16 = 5701;
/// Default username.
const DEFAULT_USERNAME: &str = "dev";
/// Default password.
const DEFAULT_PASSWORD: &str = "dev-pass";
/// Client type reported during authentication.
const DEFAULT_CLIENT_TYPE: &str = "RST";
/// Default serialization version.
const DEFAULT_SERIALIZATION_VERSION: u8 = 1;
/// Default connection timeout.
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
/// Default request/response timeout.
const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(120);
/// Default heartbeat interval.
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
/// Serializer id of the member's byte-array serializer.
const DEFAULT_QUEUE_SERIALIZER_ID: i32 = -12;

/// Configuration error returned when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for HzError {
    fn from(err: ConfigError) -> Self {
        HzError::Configuration(err.message)
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    address: Address,
    username: String,
    password: String,
    client_type: String,
    serialization_version: u8,
    connection_timeout: Duration,
    exchange_timeout: Duration,
    heartbeat_interval: Duration,
    queue_serializer_id: i32,
}

impl ClientConfig {
    /// Creates a new client configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the member address to connect to.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Returns the username used for authentication.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password used for authentication.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the client type reported to the member.
    pub fn client_type(&self) -> &str {
        &self.client_type
    }

    /// Returns the serialization version requested during authentication.
    pub fn serialization_version(&self) -> u8 {
        self.serialization_version
    }

    /// Returns the TCP connect timeout.
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Returns the default request/response timeout.
    pub fn exchange_timeout(&self) -> Duration {
        self.exchange_timeout
    }

    /// Returns the heartbeat interval. Zero disables heartbeats.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Returns the serializer id written into queue item envelopes.
    pub fn queue_serializer_id(&self) -> i32 {
        self.queue_serializer_id
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: Address::new(DEFAULT_HOST, DEFAULT_PORT),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            client_type: DEFAULT_CLIENT_TYPE.to_string(),
            serialization_version: DEFAULT_SERIALIZATION_VERSION,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            queue_serializer_id: DEFAULT_QUEUE_SERIALIZER_ID,
        }
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    address: Option<Address>,
    username: Option<String>,
    password: Option<String>,
    client_type: Option<String>,
    serialization_version: Option<u8>,
    connection_timeout: Option<Duration>,
    exchange_timeout: Option<Duration>,
    heartbeat_interval: Option<Duration>,
    queue_serializer_id: Option<i32>,
}

impl ClientConfigBuilder {
    /// Creates a new client configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the member address.
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Sets credentials for authentication.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the client type reported to the member.
    pub fn client_type(mut self, client_type: impl Into<String>) -> Self {
        self.client_type = Some(client_type.into());
        self
    }

    /// Sets the serialization version requested during authentication.
    pub fn serialization_version(mut self, version: u8) -> Self {
        self.serialization_version = Some(version);
        self
    }

    /// Sets the TCP connect timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Sets the default request/response timeout.
    pub fn exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = Some(timeout);
        self
    }

    /// Sets the heartbeat interval. `Duration::ZERO` disables heartbeats.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Sets the serializer id written into queue item envelopes.
    pub fn queue_serializer_id(mut self, serializer_id: i32) -> Self {
        self.queue_serializer_id = Some(serializer_id);
        self
    }

    /// Builds the client configuration, returning an error if validation fails.
    ///
    /// Returns `ConfigError` if:
    /// - the address has an empty host or port 0
    /// - the exchange timeout is zero
    /// - the username is empty
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let defaults = ClientConfig::default();

        let address = self.address.unwrap_or(defaults.address);
        if address.host().is_empty() {
            return Err(ConfigError::new("address host must not be empty"));
        }
        if address.port() == 0 {
            return Err(ConfigError::new("address port must not be 0"));
        }

        let exchange_timeout = self.exchange_timeout.unwrap_or(defaults.exchange_timeout);
        if exchange_timeout.is_zero() {
            return Err(ConfigError::new("exchange_timeout must be greater than zero"));
        }

        let username = self.username.unwrap_or(defaults.username);
        if username.is_empty() {
            return Err(ConfigError::new("username must not be empty"));
        }

        Ok(ClientConfig {
            address,
            username,
            password: self.password.unwrap_or(defaults.password),
            client_type: self.client_type.unwrap_or(defaults.client_type),
            serialization_version: self
                .serialization_version
                .unwrap_or(defaults.serialization_version),
            connection_timeout: self
                .connection_timeout
                .unwrap_or(defaults.connection_timeout),
            exchange_timeout,
            heartbeat_interval: self
                .heartbeat_interval
                .unwrap_or(defaults.heartbeat_interval),
            queue_serializer_id: self
                .queue_serializer_id
                .unwrap_or(defaults.queue_serializer_id),
        })
    }
}
