//! Distributed queue proxy.

use std::sync::Arc;
use std::time::Duration;

use hzlink_core::protocol::QUEUE_SERVICE_NAME;
use hzlink_core::Result;

use crate::codec::{proxy, queue};
use crate::connection::Connection;
use crate::listener::QueueListener;

/// A handle to a named queue on the cluster.
///
/// Items are raw bytes, carried with the configured serializer id.
#[derive(Debug, Clone)]
pub struct IQueue {
    name: String,
    connection: Arc<Connection>,
    serializer_id: i32,
}

impl IQueue {
    /// Creates a queue proxy. The distributed object must already exist,
    /// see [`IQueue::create`].
    pub fn new(name: impl Into<String>, connection: Arc<Connection>, serializer_id: i32) -> Self {
        Self {
            name: name.into(),
            connection,
            serializer_id,
        }
    }

    /// Asks the member to create the queue and returns a proxy to it.
    pub async fn create(
        name: impl Into<String>,
        connection: Arc<Connection>,
        serializer_id: i32,
    ) -> Result<Self> {
        let queue = Self::new(name, connection, serializer_id);
        proxy::send_create_proxy(&queue.connection, &queue.name, QUEUE_SERVICE_NAME).await?;
        Ok(queue)
    }

    /// Returns the name of this queue.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends an item, waiting for the member to accept it.
    pub async fn put(&self, item: &[u8]) -> Result<()> {
        queue::send_put(&self.connection, &self.name, item, self.serializer_id).await
    }

    /// Removes the head of the queue, letting the member wait up to `timeout`
    /// for an item to arrive. Returns `None` if none did.
    pub async fn poll(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let timeout_millis = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        queue::send_poll(&self.connection, &self.name, timeout_millis, self.serializer_id).await
    }

    /// Removes every item.
    pub async fn clear(&self) -> Result<()> {
        queue::send_clear(&self.connection, &self.name).await
    }

    /// Registers an item listener on this queue.
    pub async fn add_listener(&self) -> Result<QueueListener> {
        QueueListener::register(Arc::clone(&self.connection), &self.name).await
    }

    /// Destroys the queue on the cluster.
    pub async fn destroy(self) -> Result<()> {
        proxy::send_destroy_proxy(&self.connection, &self.name, QUEUE_SERVICE_NAME).await
    }
}
