//! Async client for the hzlink binary data-grid protocol.
//!
//! This crate multiplexes request/response exchanges over a single TCP
//! connection to a member. Every outbound frame carries a correlation id; a
//! background reader routes each inbound frame back to whoever registered
//! that id, either a one-shot exchange or a persistent event listener.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hzlink_client::{ClientConfig, HzClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HzClient::connect(ClientConfig::default()).await?;
//!
//!     let queue = client.get_queue("orders").await?;
//!     queue.put(b"order-1").await?;
//!     let item = queue.poll(Duration::from_secs(1)).await?;
//!     println!("{:?}", item);
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Layers
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`connection`] | Socket, correlation registry, read loop, exchange with timeout |
//! | [`codec`] | Request encoders and response decoders per message type |
//! | [`proxy`] | Typed handles on remote structures ([`IQueue`]) |
//! | [`listener`] | Item event registrations |
//! | [`heartbeat`] | Periodic pings on an idle connection |
//! | [`config`] / [`config_file`] | Builder, environment and file configuration |
//!
//! # Feature Flags
//!
//! | Flag | Purpose |
//! |------|---------|
//! | `config-file` | YAML and TOML configuration files via `serde_yaml` and `toml` |

#![warn(missing_docs)]

mod client;
pub mod codec;
pub mod config;
pub mod config_file;
pub mod connection;
pub mod heartbeat;
pub mod listener;
pub mod proxy;

pub use client::HzClient;
pub use codec::partitions::PartitionTable;
pub use config::{ClientConfig, ClientConfigBuilder, ConfigError};
#[cfg(feature = "config-file")]
pub use config_file::load_config;
pub use config_file::FileConfig;
pub use connection::{
    Connection, ConnectionId, ConnectionManager, ConnectionOptions, ConnectionState,
};
pub use heartbeat::spawn_heartbeat;
pub use hzlink_core as core;
pub use hzlink_core::{Address, HzError, Promise, Result};
pub use listener::{ItemEvent, ItemEventType, ItemListener, QueueListener};
pub use proxy::IQueue;
