//! Client entry point.

use std::sync::Arc;

use hzlink_core::logging::{Logging, TracingLogger};
use hzlink_core::Result;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::codec::partitions::{self, PartitionTable};
use crate::codec::ping;
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionManager};
use crate::heartbeat::spawn_heartbeat;
use crate::proxy::IQueue;

/// A connected, authenticated client for a single member.
///
/// Connecting dials the configured member, authenticates, fetches the
/// partition table and starts the heartbeat.
///
/// # Example
///
/// ```ignore
/// use hzlink_client::{ClientConfig, HzClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = HzClient::connect(ClientConfig::default()).await?;
///     let queue = client.get_queue("orders").await?;
///
///     queue.put(b"order-1").await?;
///     let item = queue.poll(std::time::Duration::from_secs(1)).await?;
///
///     client.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct HzClient {
    config: ClientConfig,
    manager: ConnectionManager,
    connection: Arc<Connection>,
    partitions: PartitionTable,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl HzClient {
    /// Connects using `tracing` for connection logs.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        Self::connect_with_logger(config, Arc::new(TracingLogger)).await
    }

    /// Connects with a caller-supplied logger.
    ///
    /// # Errors
    ///
    /// Returns the first failure of dialing, authentication or the partition
    /// table request. The connection is closed on a partition table failure.
    pub async fn connect_with_logger(config: ClientConfig, logger: Arc<dyn Logging>) -> Result<Self> {
        let manager = ConnectionManager::with_logger(logger);
        let connection = manager.get_or_connect(&config).await?;

        let partitions = match partitions::send_get_partitions(&connection).await {
            Ok(table) => table,
            Err(e) => {
                manager.shutdown().await;
                return Err(e);
            }
        };

        let heartbeat = spawn_heartbeat(Arc::clone(&connection), config.heartbeat_interval());

        tracing::info!(
            address = %connection.address(),
            partitions = partitions.partition_count(),
            "client connected"
        );

        Ok(Self {
            config,
            manager,
            connection,
            partitions,
            heartbeat: Mutex::new(heartbeat),
        })
    }

    /// Returns the configuration this client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the connection to the member.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Returns the partition table fetched at connect time.
    pub fn partition_table(&self) -> &PartitionTable {
        &self.partitions
    }

    /// Creates the named queue on the member and returns a proxy to it.
    pub async fn get_queue(&self, name: &str) -> Result<IQueue> {
        IQueue::create(
            name,
            Arc::clone(&self.connection),
            self.config.queue_serializer_id(),
        )
        .await
    }

    /// Sends a ping and waits for the member's reply.
    pub async fn ping(&self) -> Result<()> {
        ping::send_ping(&self.connection).await
    }

    /// Stops the heartbeat and closes every connection.
    ///
    /// Outstanding requests fail with [`HzError::ConnectionClosed`](hzlink_core::HzError::ConnectionClosed).
    pub async fn shutdown(&self) {
        tracing::info!(address = %self.connection.address(), "shutting down client");
        if let Some(heartbeat) = self.heartbeat.lock().take() {
            heartbeat.abort();
        }
        self.manager.shutdown().await;
    }
}

impl std::fmt::Debug for HzClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HzClient")
            .field("connection", &self.connection)
            .field("partition_count", &self.partitions.partition_count())
            .finish()
    }
}
