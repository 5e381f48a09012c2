//! Connection management for the hzlink client.

#[allow(clippy::module_inception)]
mod connection;
mod manager;
mod registry;

pub use connection::{Connection, ConnectionId, ConnectionOptions, ConnectionState};
pub use manager::{authenticate, ConnectionManager};
pub use registry::{CorrelationRegistry, Dispatch, EntryGuard, ResponseCallback};
