//! Core types for the hzlink binary client protocol.
//!
//! This crate holds everything that does not need a socket: the wire message
//! and its stream codec, the partition hash, the promise type used to chain
//! asynchronous steps, the shared error type and the logging capability.

#![warn(missing_docs)]

pub mod address;
pub mod error;
pub mod logging;
pub mod partition;
pub mod promise;
pub mod protocol;

pub use address::Address;
pub use error::{HzError, Result};
pub use logging::{Logging, TracingLogger};
pub use partition::{
    murmur_hash3_x86_32, partition_hash, partition_id, partition_key_for_name, PartitionAware,
};
pub use promise::{Completer, Promise};
pub use protocol::{ClientMessage, ClientMessageCodec};
