//! Error types for hzlink operations.

use std::io;
use thiserror::Error;

/// The main error type for hzlink operations.
#[derive(Debug, Error)]
pub enum HzError {
    /// Connection-related errors (dial failures, rejected preamble).
    #[error("connection error: {0}")]
    Connection(String),

    /// The connection was closed while the operation was outstanding.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Protocol-related errors (malformed frames, unexpected message types).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A message exchange did not receive its reply in time.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// The member rejected the client's credentials.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Configuration errors (invalid settings).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Partition routing was requested before a partition table arrived.
    #[error("partition count unknown: {0}")]
    PartitionCountUnknown(String),

    /// The member answered with an exception response.
    #[error("server error {} ({}){}", .code, .class_name, message_suffix(.message))]
    Server {
        /// Protocol error code reported by the member.
        code: i32,
        /// Server-side exception class name.
        class_name: String,
        /// Exception message, if the member sent one.
        message: Option<String>,
    },

    /// A promise was abandoned before it resolved.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl HzError {
    /// Returns true for errors after which the connection can no longer be used.
    pub fn is_transport_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ConnectionClosed(_))
    }
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

/// A specialized `Result` type for hzlink operations.
pub type Result<T> = std::result::Result<T, HzError>;
