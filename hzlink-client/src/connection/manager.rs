//! Connection manager: dials, authenticates and caches member connections.

use std::collections::HashMap;
use std::sync::Arc;

use hzlink_core::logging::{Logging, TracingLogger};
use hzlink_core::{hz_error, hz_info, Address, HzError, Promise};
use parking_lot::Mutex;

use super::connection::{Connection, ConnectionOptions};
use crate::codec::auth::{self, AuthenticationRequest, AuthenticationStatus};
use crate::config::ClientConfig;

/// Owns the authenticated connections of a client, keyed by the address
/// they were requested for.
pub struct ConnectionManager {
    connections: Arc<Mutex<HashMap<Address, Arc<Connection>>>>,
    logger: Arc<dyn Logging>,
}

impl ConnectionManager {
    /// Creates a manager logging through `tracing`.
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingLogger))
    }

    /// Creates a manager whose connections log through `logger`.
    pub fn with_logger(logger: Arc<dyn Logging>) -> Self {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
            logger,
        }
    }

    /// Returns an authenticated connection to the configured member.
    ///
    /// An open connection for the same address is reused. Otherwise the
    /// member is dialed, the reader is started and the client authenticates;
    /// the promise fails with the first error of that sequence.
    pub fn get_or_connect(&self, config: &ClientConfig) -> Promise<Arc<Connection>> {
        let requested = config.address().clone();
        if let Some(existing) = self.connection(&requested) {
            tracing::debug!(address = %requested, "reusing open connection");
            return Promise::resolved(existing);
        }

        let connection = Arc::new(Connection::new(
            requested.clone(),
            ConnectionOptions::from(config),
            Arc::clone(&self.logger),
        ));

        let config = config.clone();
        let connections = Arc::clone(&self.connections);
        let logger = Arc::clone(&self.logger);
        let failure_logger = Arc::clone(&self.logger);

        connection
            .connect()
            .then_first(Connection::init_read_loop, |_| {})
            .then_promise(
                move |connection| authenticate(connection, config),
                |e| e,
            )
            .then_first(
                move |connection| {
                    hz_info!(
                        logger,
                        "authenticated to {} (requested {})",
                        connection.address(),
                        requested
                    );
                    connections
                        .lock()
                        .insert(requested, Arc::clone(connection));
                    Ok(())
                },
                move |e| hz_error!(failure_logger, "failed to open connection: {}", e),
            )
    }

    /// Returns the open connection for `address`, if any.
    pub fn connection(&self, address: &Address) -> Option<Arc<Connection>> {
        let mut connections = self.connections.lock();
        match connections.get(address) {
            Some(connection) if !connection.is_closed() => Some(Arc::clone(connection)),
            Some(_) => {
                connections.remove(address);
                None
            }
            None => None,
        }
    }

    /// Returns every cached connection.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections.lock().values().cloned().collect()
    }

    /// Returns the number of cached connections.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Closes and forgets every connection.
    pub async fn shutdown(&self) {
        let connections: Vec<_> = self.connections.lock().drain().map(|(_, c)| c).collect();
        for connection in connections {
            connection.close().await;
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// Authenticates `connection` with the configured credentials.
///
/// On success the connection's address is replaced by the one the member
/// reports. A rejected status leaves the connection open.
pub fn authenticate(connection: Arc<Connection>, config: ClientConfig) -> Promise<Arc<Connection>> {
    Promise::spawn(async move {
        let request = AuthenticationRequest {
            username: config.username(),
            password: config.password(),
            uuid: None,
            owner_uuid: None,
            is_owner_connection: true,
            client_type: config.client_type(),
            serialization_version: config.serialization_version(),
        };

        let response = auth::send_authentication(&connection, &request).await?;
        if response.status != AuthenticationStatus::Authenticated {
            return Err(HzError::Authentication(format!(
                "connection to {} is not authenticated: {:?}",
                connection.address(),
                response.status
            )));
        }

        if let Some(address) = response.address {
            tracing::debug!(
                requested = %connection.address(),
                reported = %address,
                "member reported canonical address"
            );
            connection.set_address(address);
        }
        Ok(connection)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_failure_names_address() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ClientConfig::builder()
            .address(Address::new("127.0.0.1", port))
            .connection_timeout(Duration::from_secs(1))
            .build()
            .unwrap();

        let manager = ConnectionManager::new();
        let err = manager.get_or_connect(&config).await.unwrap_err();
        assert!(matches!(err, HzError::Connection(_)));
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
        assert_eq!(manager.connection_count(), 0);
    }

    #[test]
    fn test_new_manager_is_empty() {
        let manager = ConnectionManager::default();
        assert_eq!(manager.connection_count(), 0);
        assert!(manager.connections().is_empty());
        assert!(manager.connection(&Address::default()).is_none());
    }
}
