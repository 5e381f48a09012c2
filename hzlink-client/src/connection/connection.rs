//! Single correlation-multiplexed connection to a cluster member.

use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::BytesMut;
use hzlink_core::logging::Logging;
use hzlink_core::partition::PartitionAware;
use hzlink_core::protocol::{
    check_frame_length, ClientMessage, ClientMessageCodec, AUTHENTICATION_CORRELATION_ID,
    CLIENT_BINARY_PROTOCOL, INT_SIZE_IN_BYTES,
};
use hzlink_core::{hz_error, hz_info, hz_trace, hz_warn, Address, HzError, Promise, Result};
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::Encoder;
use tokio_util::sync::CancellationToken;

use super::registry::{CorrelationRegistry, Dispatch, EntryGuard, ResponseCallback};
use crate::config::ClientConfig;

/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default exchange timeout.
const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generates a new unique connection ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle of a connection. Transitions only move forward, except that a
/// failed dial returns to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Not yet dialed.
    Disconnected = 0,
    /// Dial in progress.
    Connecting = 1,
    /// Socket open and preamble written.
    Connected = 2,
    /// Closed by the caller or by a transport failure. Terminal.
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Timeouts applied by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Upper bound on the TCP dial.
    pub connect_timeout: Duration,
    /// Timeout used by [`Connection::exchange`].
    pub exchange_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

impl From<&ClientConfig> for ConnectionOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connection_timeout(),
            exchange_timeout: config.exchange_timeout(),
        }
    }
}

/// A connection to a single cluster member.
///
/// Any number of tasks may call [`exchange`](Self::exchange) concurrently.
/// Writes are serialized by a write lock; a single reader task, started by
/// [`init_read_loop`](Self::init_read_loop), reads every inbound frame and
/// routes it by correlation id.
pub struct Connection {
    id: ConnectionId,
    address: RwLock<Address>,
    options: ConnectionOptions,
    state: AtomicU8,
    correlation_counter: AtomicI64,
    partition_count: AtomicI32,
    registry: CorrelationRegistry,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    reader: Mutex<Option<OwnedReadHalf>>,
    shutdown: CancellationToken,
    logger: Arc<dyn Logging>,
}

impl Connection {
    /// Creates an unconnected connection to `address`.
    pub fn new(address: Address, options: ConnectionOptions, logger: Arc<dyn Logging>) -> Self {
        Self {
            id: ConnectionId::new(),
            address: RwLock::new(address),
            options,
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            correlation_counter: AtomicI64::new(AUTHENTICATION_CORRELATION_ID),
            partition_count: AtomicI32::new(0),
            registry: CorrelationRegistry::new(),
            writer: tokio::sync::Mutex::new(None),
            reader: Mutex::new(None),
            shutdown: CancellationToken::new(),
            logger,
        }
    }

    /// Returns the connection's unique identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the member address. After authentication this is the address
    /// the member reported for itself.
    pub fn address(&self) -> Address {
        self.address.read().clone()
    }

    /// Replaces the member address.
    pub fn set_address(&self, address: Address) {
        *self.address.write() = address;
    }

    /// Returns the partition count, `0` until a partition table has arrived.
    pub fn partition_count(&self) -> i32 {
        self.partition_count.load(Ordering::Acquire)
    }

    /// Stores the partition count used for key routing.
    pub fn set_partition_count(&self, count: i32) {
        self.partition_count.store(count, Ordering::Release);
    }

    /// Returns the partition that owns `key`.
    pub fn partition_for_key<K: PartitionAware + ?Sized>(&self, key: &K) -> Result<i32> {
        key.partition_id(self.partition_count())
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns true once the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Returns the number of registered response callbacks.
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the logger this connection reports through.
    pub fn logger(&self) -> &dyn Logging {
        self.logger.as_ref()
    }

    /// Returns the timeout applied by [`exchange`](Self::exchange).
    pub fn exchange_timeout(&self) -> Duration {
        self.options.exchange_timeout
    }

    /// Returns the next correlation id.
    ///
    /// The counter starts at the id reserved for authentication, so the first
    /// call returns 2.
    pub fn next_correlation_id(&self) -> i64 {
        self.correlation_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Dials the member and writes the protocol preamble.
    ///
    /// The returned promise resolves with this connection. A failure names the
    /// address that could not be reached and leaves the connection
    /// `Disconnected`. If [`close`](Self::close) runs while the dial is in
    /// flight the connection stays `Closed` and the promise is rejected with
    /// `ConnectionClosed`.
    pub fn connect(self: &Arc<Self>) -> Promise<Arc<Connection>> {
        let connection = Arc::clone(self);
        Promise::spawn(async move {
            connection.establish().await?;
            Ok(connection)
        })
    }

    async fn establish(&self) -> Result<()> {
        let address = self.address();
        if let Err(current) = self.state.compare_exchange(
            ConnectionState::Disconnected as u8,
            ConnectionState::Connecting as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return Err(HzError::Connection(format!(
                "cannot connect to {}: connection is {}",
                address,
                ConnectionState::from_u8(current)
            )));
        }

        let _abandoned = ResetConnecting(&self.state);
        let dialed = self.dial(&address).await;
        let next = if dialed.is_ok() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };

        // A close() that ran during the dial already moved the state to Closed.
        let closed_meanwhile = self
            .state
            .compare_exchange(
                ConnectionState::Connecting as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err();

        match dialed {
            Ok(()) if closed_meanwhile => {
                self.reader.lock().take();
                self.writer.lock().await.take();
                hz_warn!(
                    self.logger,
                    "{} to {} was closed while connecting, dropping the socket",
                    self.id,
                    address
                );
                Err(HzError::ConnectionClosed(format!(
                    "connection to {} was closed while connecting",
                    address
                )))
            }
            Ok(()) => {
                hz_info!(self.logger, "{} connected to {}", self.id, address);
                tracing::debug!(id = %self.id, address = %address, "established connection");
                Ok(())
            }
            Err(e) => {
                hz_error!(self.logger, "{}", e);
                Err(e)
            }
        }
    }

    async fn dial(&self, address: &Address) -> Result<()> {
        let target = (address.host().to_string(), address.port());
        let stream =
            match tokio::time::timeout(self.options.connect_timeout, TcpStream::connect(target))
                .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    return Err(HzError::Connection(format!(
                        "failed to connect to {}: {}",
                        address, e
                    )))
                }
                Err(_) => {
                    return Err(HzError::Connection(format!(
                        "timed out connecting to {} after {:?}",
                        address, self.options.connect_timeout
                    )))
                }
            };

        stream.set_nodelay(true).map_err(|e| {
            HzError::Connection(format!("failed to set TCP_NODELAY on {}: {}", address, e))
        })?;

        let (reader, mut writer) = stream.into_split();
        writer.write_all(CLIENT_BINARY_PROTOCOL).await.map_err(|e| {
            HzError::Connection(format!(
                "failed to write protocol preamble to {}: {}",
                address, e
            ))
        })?;

        *self.reader.lock() = Some(reader);
        *self.writer.lock().await = Some(writer);
        Ok(())
    }

    /// Starts the reader task. Fails if the connection is not established or
    /// the reader was already started.
    pub fn init_read_loop(self: &Arc<Self>) -> Result<()> {
        let reader = self.reader.lock().take().ok_or_else(|| {
            HzError::Connection(format!(
                "read loop for {} is already running or the connection is not established",
                self.address()
            ))
        })?;

        tokio::spawn(read_loop(
            Arc::downgrade(self),
            reader,
            self.shutdown.clone(),
            Arc::clone(&self.logger),
        ));
        Ok(())
    }

    /// Registers a callback for frames carrying `correlation_id`.
    ///
    /// Auto-remove entries are dropped after their first delivery; persistent
    /// entries stay until [`forget`](Self::forget) or [`close`](Self::close).
    pub fn register(&self, correlation_id: i64, auto_remove: bool) -> ResponseCallback {
        self.registry.register(correlation_id, auto_remove)
    }

    /// Removes a registered callback. Returns true if one was registered.
    pub fn forget(&self, correlation_id: i64) -> bool {
        self.registry.forget(correlation_id)
    }

    /// Returns a guard that forgets `correlation_id` when dropped.
    pub fn guard_entry(&self, correlation_id: i64) -> EntryGuard<'_> {
        self.registry.guard(correlation_id)
    }

    /// Writes a message without waiting for a response.
    pub async fn send(&self, message: ClientMessage) -> Result<()> {
        self.write_message(message).await
    }

    /// Sends a request and waits for its response using the default timeout.
    pub async fn exchange(&self, message: ClientMessage) -> Result<ClientMessage> {
        self.exchange_with_timeout(message, self.options.exchange_timeout)
            .await
    }

    /// Sends a request and waits up to `timeout` for the frame carrying the
    /// same correlation id.
    ///
    /// On timeout the callback is removed and the connection stays open; a
    /// reply arriving later is logged as unmatched. Dropping the returned
    /// future removes the callback as well.
    pub async fn exchange_with_timeout(
        &self,
        message: ClientMessage,
        timeout: Duration,
    ) -> Result<ClientMessage> {
        let correlation_id = message.correlation_id();
        let mut callback = self.registry.register(correlation_id, true);
        let _entry = self.registry.guard(correlation_id);

        self.write_message(message).await?;

        match tokio::time::timeout(timeout, callback.recv()).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(HzError::ConnectionClosed(format!(
                "connection to {} closed before correlation id {} was answered",
                self.address(),
                correlation_id
            ))),
            Err(_) => {
                hz_warn!(
                    self.logger,
                    "no response for correlation id {} from {} within {:?}",
                    correlation_id,
                    self.address(),
                    timeout
                );
                Err(HzError::Timeout(format!(
                    "no response for correlation id {} from {} within {:?}",
                    correlation_id,
                    self.address(),
                    timeout
                )))
            }
        }
    }

    async fn write_message(&self, message: ClientMessage) -> Result<()> {
        let correlation_id = message.correlation_id();
        let message_type = message.message_type();

        let mut buf = BytesMut::with_capacity(message.len());
        ClientMessageCodec::new().encode(message, &mut buf)?;

        let mut write = FrameWrite {
            connection: self,
            writer: self.writer.lock().await,
            correlation_id,
            started: false,
        };
        if write.writer.is_none() || self.is_closed() {
            return Err(HzError::ConnectionClosed(format!(
                "connection to {} is not open",
                self.address()
            )));
        }

        hz_trace!(
            self.logger,
            "====> Sending message cid={} type=0x{:04x} len={} to {}",
            correlation_id,
            message_type,
            buf.len(),
            self.address()
        );

        if let Err(e) = write.write_all(&buf).await {
            hz_error!(
                self.logger,
                "write of correlation id {} to {} failed: {}",
                correlation_id,
                self.address(),
                e
            );
            // Dropping the unfinished write closes the connection.
            drop(write);
            return Err(HzError::Io(e));
        }
        Ok(())
    }

    fn dispatch(&self, message: ClientMessage) {
        let correlation_id = message.correlation_id();
        let message_type = message.message_type();
        hz_trace!(
            self.logger,
            "<==== Received message cid={} type=0x{:04x} len={} from {}",
            correlation_id,
            message_type,
            message.len(),
            self.address()
        );

        match self.registry.dispatch(message) {
            Dispatch::Delivered { .. } => {}
            Dispatch::Unmatched => hz_error!(
                self.logger,
                "no callback registered for correlation id {} (type 0x{:04x}) on {}, dropping frame",
                correlation_id,
                message_type,
                self.address()
            ),
            Dispatch::Abandoned => hz_warn!(
                self.logger,
                "callback for correlation id {} on {} was dropped, removing it",
                correlation_id,
                self.address()
            ),
        }
    }

    /// Closes the socket, stops the reader and fails every pending callback.
    ///
    /// Idempotent.
    pub async fn close(&self) {
        if !self.mark_closed() {
            return;
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        self.fail_pending();
    }

    /// Moves to `Closed` and stops the reader. Returns false if the
    /// connection was already closed.
    fn mark_closed(&self) -> bool {
        let previous = self
            .state
            .swap(ConnectionState::Closed as u8, Ordering::AcqRel);
        if previous == ConnectionState::Closed as u8 {
            return false;
        }
        self.shutdown.cancel();
        self.reader.lock().take();
        true
    }

    fn fail_pending(&self) {
        let failed = self.registry.fail_all();
        hz_info!(
            self.logger,
            "{} to {} closed, {} pending callbacks failed",
            self.id,
            self.address(),
            failed
        );
    }
}

/// Returns a dial that was dropped midway from `Connecting` to `Disconnected`.
struct ResetConnecting<'a>(&'a AtomicU8);

impl Drop for ResetConnecting<'_> {
    fn drop(&mut self) {
        let _ = self.0.compare_exchange(
            ConnectionState::Connecting as u8,
            ConnectionState::Disconnected as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// A frame write in progress, holding the write lock.
///
/// If it is dropped after bytes may have reached the socket but before the
/// whole frame did, the stream can no longer be framed: the write half is
/// dropped and the connection closed on the spot.
struct FrameWrite<'a> {
    connection: &'a Connection,
    writer: tokio::sync::MutexGuard<'a, Option<OwnedWriteHalf>>,
    correlation_id: i64,
    started: bool,
}

impl FrameWrite<'_> {
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(std::io::ErrorKind::NotConnected.into());
        };
        self.started = true;
        writer.write_all(buf).await?;
        self.started = false;
        Ok(())
    }
}

impl Drop for FrameWrite<'_> {
    fn drop(&mut self) {
        if !self.started {
            return;
        }
        self.writer.take();
        if self.connection.mark_closed() {
            hz_error!(
                self.connection.logger,
                "write of correlation id {} to {} was interrupted, closing connection",
                self.correlation_id,
                self.connection.address()
            );
            self.connection.fail_pending();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("address", &*self.address.read())
            .field("state", &self.state())
            .field("partition_count", &self.partition_count())
            .field("pending", &self.registry.len())
            .finish()
    }
}

async fn read_loop(
    connection: Weak<Connection>,
    mut reader: OwnedReadHalf,
    shutdown: CancellationToken,
    logger: Arc<dyn Logging>,
) {
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = read_frame(&mut reader) => frame,
        };

        let Some(connection) = connection.upgrade() else {
            break;
        };

        match frame {
            Ok(message) => connection.dispatch(message),
            Err(e) => {
                if !connection.is_closed() {
                    hz_error!(
                        logger,
                        "read loop for {} stopped: {}",
                        connection.address(),
                        e
                    );
                }
                connection.close().await;
                break;
            }
        }
    }
    hz_trace!(logger, "read loop exited");
}

async fn read_frame(reader: &mut OwnedReadHalf) -> Result<ClientMessage> {
    let mut prefix = [0u8; INT_SIZE_IN_BYTES];
    reader.read_exact(&mut prefix).await?;
    let frame_length = check_frame_length(i32::from_le_bytes(prefix))?;

    let mut buffer = BytesMut::with_capacity(frame_length);
    buffer.extend_from_slice(&prefix);
    buffer.resize(frame_length, 0);
    reader.read_exact(&mut buffer[INT_SIZE_IN_BYTES..]).await?;

    ClientMessage::create_for_decode(buffer)
}
