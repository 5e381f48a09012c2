//! Queue item listeners.
//!
//! A listener registration is a persistent correlation entry: the member
//! acknowledges the add-listener request with a registration id and then
//! pushes every item event under the same correlation id.

use std::sync::Arc;

use hzlink_core::{hz_error, hz_trace, HzError, Result};
use tokio::task::JoinHandle;

pub use crate::codec::queue::{ItemEvent, ItemEventType};

use crate::codec::queue;
use crate::connection::{Connection, ResponseCallback};

/// Callback interface for item events.
pub trait ItemListener: Send + Sync {
    /// Called when an item is added to the queue.
    fn item_added(&self, event: ItemEvent);

    /// Called when an item is removed from the queue.
    fn item_removed(&self, event: ItemEvent);
}

/// An active item listener on a named queue.
///
/// Dropping the listener forgets its correlation entry, after which events
/// pushed by the member are logged as unmatched.
pub struct QueueListener {
    connection: Arc<Connection>,
    queue_name: String,
    registration_id: String,
    callback: ResponseCallback,
}

impl QueueListener {
    /// Registers an item listener on `queue_name`.
    pub async fn register(connection: Arc<Connection>, queue_name: &str) -> Result<Self> {
        let request = queue::prepare_add_listener(&connection, queue_name);
        let correlation_id = request.correlation_id();
        let mut callback = connection.register(correlation_id, false);
        let entry = connection.guard_entry(correlation_id);

        let registration_id = Self::await_registration(&connection, request, &mut callback).await?;
        entry.keep();
        hz_trace!(
            connection.logger(),
            "item listener on {} registered as {}",
            queue_name,
            registration_id
        );
        Ok(Self {
            connection,
            queue_name: queue_name.to_string(),
            registration_id,
            callback,
        })
    }

    async fn await_registration(
        connection: &Connection,
        request: hzlink_core::ClientMessage,
        callback: &mut ResponseCallback,
    ) -> Result<String> {
        connection.send(request).await?;
        let ack = tokio::time::timeout(connection.exchange_timeout(), callback.recv())
            .await
            .map_err(|_| {
                HzError::Timeout(format!(
                    "no listener registration from {} within {:?}",
                    connection.address(),
                    connection.exchange_timeout()
                ))
            })?
            .ok_or_else(|| {
                HzError::ConnectionClosed(format!(
                    "connection to {} closed during listener registration",
                    connection.address()
                ))
            })?;
        queue::accept_add_listener(connection, ack)
    }

    /// Returns the name of the queue being observed.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Returns the registration id assigned by the member.
    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    /// Returns the correlation id events arrive under.
    pub fn correlation_id(&self) -> i64 {
        self.callback.correlation_id()
    }

    /// Waits for the next item event.
    ///
    /// Returns `Ok(None)` once the connection has closed.
    pub async fn next_event(&mut self) -> Result<Option<ItemEvent>> {
        match self.callback.recv().await {
            Some(mut message) => queue::decode_item_event(&mut message).map(Some),
            None => Ok(None),
        }
    }

    /// Stops receiving events.
    pub fn unregister(self) {
        hz_trace!(
            self.connection.logger(),
            "item listener {} on {} unregistered",
            self.registration_id,
            self.queue_name
        );
    }

    /// Forwards every event to `listener` on a spawned task until the
    /// connection closes.
    pub fn dispatch_to(mut self, listener: Arc<dyn ItemListener>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.next_event().await {
                    Ok(Some(event)) => match event.event_type {
                        ItemEventType::Added => listener.item_added(event),
                        ItemEventType::Removed => listener.item_removed(event),
                        ItemEventType::Unknown(code) => hz_error!(
                            self.connection.logger(),
                            "ignoring item event with unknown type {} on {}",
                            code,
                            self.queue_name
                        ),
                    },
                    Ok(None) => break,
                    Err(e) => hz_error!(
                        self.connection.logger(),
                        "undecodable item event on {}: {}",
                        self.queue_name,
                        e
                    ),
                }
            }
        })
    }
}

impl Drop for QueueListener {
    fn drop(&mut self) {
        self.connection.forget(self.callback.correlation_id());
    }
}

impl std::fmt::Debug for QueueListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueListener")
            .field("queue_name", &self.queue_name)
            .field("registration_id", &self.registration_id)
            .field("correlation_id", &self.callback.correlation_id())
            .finish()
    }
}
