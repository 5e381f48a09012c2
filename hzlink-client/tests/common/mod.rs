//! Common test utilities for integration tests: an in-process mock member
//! and a logger that records what the connection layer reports.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use hzlink_client::codec::{auth, partitions, ping, queue};
use hzlink_client::{Address, ClientConfig, ItemEvent, ItemEventType, PartitionTable};
use hzlink_core::logging::Logging;
use hzlink_core::protocol::{
    ClientMessage, ClientMessageCodec, BEGIN_END_FLAG, CLIENT_AUTHENTICATION,
    CLIENT_BINARY_PROTOCOL, CLIENT_CREATE_PROXY, CLIENT_DESTROY_PROXY, CLIENT_GET_PARTITIONS,
    CLIENT_PING, QUEUE_ADD_LISTENER, QUEUE_CLEAR, QUEUE_POLL, QUEUE_PUT,
};
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

pub const PARTITION_COUNT: i32 = 271;

/// What the mock member does with a request.
pub enum Action {
    /// Write these frames. A frame whose correlation id is 0 is stamped with
    /// the request's correlation id.
    Reply(Vec<ClientMessage>),
    /// Do not answer.
    Ignore,
    /// Close the socket.
    HangUp,
}

impl Action {
    pub fn reply(message: ClientMessage) -> Self {
        Action::Reply(vec![message])
    }
}

/// A request as the mock member saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub message_type: u16,
    pub correlation_id: i64,
    pub partition_id: i32,
}

/// A single-connection member listening on an ephemeral local port.
pub struct MockMember {
    addr: SocketAddr,
    preamble: Arc<Mutex<Option<Vec<u8>>>>,
    received: Arc<Mutex<Vec<Received>>>,
    task: JoinHandle<()>,
}

impl MockMember {
    pub async fn start<H>(mut handler: H) -> Self
    where
        H: FnMut(&mut ClientMessage) -> Action + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let preamble = Arc::new(Mutex::new(None));
        let received = Arc::new(Mutex::new(Vec::new()));

        let task_preamble = Arc::clone(&preamble);
        let task_received = Arc::clone(&received);
        let task = tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };

            let mut header = vec![0u8; CLIENT_BINARY_PROTOCOL.len()];
            if stream.read_exact(&mut header).await.is_err() {
                return;
            }
            *task_preamble.lock() = Some(header);

            let mut framed = Framed::new(stream, ClientMessageCodec::new());
            while let Some(Ok(mut request)) = framed.next().await {
                task_received.lock().push(Received {
                    message_type: request.message_type(),
                    correlation_id: request.correlation_id(),
                    partition_id: request.partition_id(),
                });

                match handler(&mut request) {
                    Action::Reply(responses) => {
                        for mut response in responses {
                            if response.correlation_id() == 0 {
                                response.set_correlation_id(request.correlation_id());
                            }
                            response.set_flags(response.flags() | BEGIN_END_FLAG);
                            if framed.send(response).await.is_err() {
                                return;
                            }
                        }
                    }
                    Action::Ignore => {}
                    Action::HangUp => return,
                }
            }
        });

        Self {
            addr,
            preamble,
            received,
            task,
        }
    }

    /// Starts a member that answers the whole client command set.
    pub async fn start_default() -> Self {
        Self::start(MemberState::new().into_handler()).await
    }

    pub fn address(&self) -> Address {
        Address::from(self.addr)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::builder()
            .address(self.address())
            .connection_timeout(Duration::from_secs(2))
            .exchange_timeout(Duration::from_secs(2))
            .heartbeat_interval(Duration::ZERO)
            .build()
            .unwrap()
    }

    pub fn preamble(&self) -> Option<Vec<u8>> {
        self.preamble.lock().clone()
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }

    pub fn received_types(&self) -> Vec<u16> {
        self.received().into_iter().map(|r| r.message_type).collect()
    }
}

impl Drop for MockMember {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// In-memory state of a member that implements authentication, partitions,
/// proxies, pings and one queue per name.
pub struct MemberState {
    pub reported_address: Option<Address>,
    pub accept_credentials: (String, String),
    pub queues: std::collections::HashMap<String, VecDeque<Vec<u8>>>,
    pub listener: Option<(String, i64)>,
    pub member_uuid: String,
}

impl MemberState {
    pub fn new() -> Self {
        Self {
            reported_address: Some(Address::new("member-1.internal", 5701)),
            accept_credentials: ("dev".to_string(), "dev-pass".to_string()),
            queues: Default::default(),
            listener: None,
            member_uuid: "member-uuid-1".to_string(),
        }
    }

    pub fn into_handler(mut self) -> impl FnMut(&mut ClientMessage) -> Action + Send + 'static {
        move |request| self.handle(request)
    }

    pub fn handle(&mut self, request: &mut ClientMessage) -> Action {
        match request.message_type() {
            CLIENT_AUTHENTICATION => {
                let credentials = auth::decode_request(request).unwrap();
                let status = if credentials == self.accept_credentials {
                    auth::AuthenticationStatus::Authenticated
                } else {
                    auth::AuthenticationStatus::CredentialsFailed
                };
                Action::reply(auth::encode_response(&auth::AuthenticationResponse {
                    status,
                    address: self.reported_address.clone(),
                    uuid: Some("client-uuid-1".to_string()),
                    owner_uuid: Some(self.member_uuid.clone()),
                    serialization_version: 1,
                }))
            }
            CLIENT_GET_PARTITIONS => {
                let owner = self
                    .reported_address
                    .clone()
                    .unwrap_or_else(|| Address::new("127.0.0.1", 5701));
                let table = PartitionTable::new(vec![(owner, (0..PARTITION_COUNT).collect())]);
                Action::reply(partitions::encode_response(&table))
            }
            CLIENT_PING | CLIENT_CREATE_PROXY | CLIENT_DESTROY_PROXY => {
                Action::reply(ping::encode_void_response())
            }
            QUEUE_PUT => {
                let name = request.read_string().unwrap();
                let data = request.read_byte_array().unwrap();
                self.queues
                    .entry(name.clone())
                    .or_default()
                    .push_back(data);

                let mut replies = vec![ping::encode_void_response()];
                if let Some((listener_queue, correlation_id)) = &self.listener {
                    if *listener_queue == name {
                        let mut event = queue::encode_item_event(&ItemEvent {
                            item: None,
                            member_uuid: self.member_uuid.clone(),
                            event_type: ItemEventType::Added,
                        });
                        event.set_correlation_id(*correlation_id);
                        replies.push(event);
                    }
                }
                Action::Reply(replies)
            }
            QUEUE_POLL => {
                let name = request.read_string().unwrap();
                let item = self.queues.get_mut(&name).and_then(VecDeque::pop_front);

                let mut replies = vec![queue::encode_poll_response(item.as_deref())];
                if let (Some(_), Some((listener_queue, correlation_id))) = (&item, &self.listener)
                {
                    if *listener_queue == name {
                        let mut event = queue::encode_item_event(&ItemEvent {
                            item: None,
                            member_uuid: self.member_uuid.clone(),
                            event_type: ItemEventType::Removed,
                        });
                        event.set_correlation_id(*correlation_id);
                        replies.push(event);
                    }
                }
                Action::Reply(replies)
            }
            QUEUE_CLEAR => {
                let name = request.read_string().unwrap();
                self.queues.remove(&name);
                Action::reply(ping::encode_void_response())
            }
            QUEUE_ADD_LISTENER => {
                let name = request.read_string().unwrap();
                self.listener = Some((name, request.correlation_id()));
                Action::reply(queue::encode_string_response("registration-1"))
            }
            _ => Action::Ignore,
        }
    }
}

/// A logger that keeps every line it is handed.
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self, level: &str) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn contains(&self, level: &str, needle: &str) -> bool {
        self.lines(level).iter().any(|line| line.contains(needle))
    }

    fn record(&self, level: &'static str, args: fmt::Arguments<'_>) {
        self.lines.lock().push((level, args.to_string()));
    }
}

impl Logging for RecordingLogger {
    fn trace(&self, args: fmt::Arguments<'_>) {
        self.record("trace", args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.record("info", args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.record("warn", args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.record("error", args);
    }

    fn fatal(&self, args: fmt::Arguments<'_>) {
        self.record("fatal", args);
    }
}

/// Polls `condition` until it holds or a second passes.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
