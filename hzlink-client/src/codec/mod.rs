//! Request encoders and response decoders for the commands the client issues.
//!
//! Each submodule follows the same shape: `calculate_*_size` functions that
//! mirror the appends, `encode_*` functions that build a frame, `decode_*`
//! functions that read one, and `send_*` helpers that stamp a correlation id,
//! exchange the frame on a [`Connection`] and check the response type.
//! Response encoders exist as well so that a member can be simulated.

pub mod auth;
pub mod exception;
pub mod partitions;
pub mod ping;
pub mod proxy;
pub mod queue;

use hzlink_core::protocol::{ClientMessage, BEGIN_END_FLAG, EXCEPTION_RESPONSE};
use hzlink_core::{hz_error, HzError, Result};

use crate::connection::Connection;

/// Stamps a fresh correlation id, the target partition and single-frame flags.
pub(crate) fn prepare(connection: &Connection, message: &mut ClientMessage, partition_id: i32) {
    message.set_correlation_id(connection.next_correlation_id());
    message.set_partition_id(partition_id);
    message.set_flags(BEGIN_END_FLAG);
}

/// Checks that `response` has the `expected` type.
///
/// An exception response is decoded into [`HzError::Server`]; any other type
/// is logged and reported as a protocol error.
pub(crate) fn expect_response(
    connection: &Connection,
    mut response: ClientMessage,
    expected: u16,
    operation: &str,
) -> Result<ClientMessage> {
    let message_type = response.message_type();
    if message_type == expected {
        return Ok(response);
    }

    if message_type == EXCEPTION_RESPONSE {
        let error = exception::decode(&mut response)?;
        hz_error!(
            connection.logger(),
            "{} on {} failed: {}",
            operation,
            connection.address(),
            error
        );
        return Err(error);
    }

    hz_error!(
        connection.logger(),
        "unexpected response to {} on {}: type 0x{:04x}",
        operation,
        connection.address(),
        message_type
    );
    Err(HzError::Protocol(format!(
        "unexpected response to {}: type 0x{:04x}, expected 0x{:04x}",
        operation, message_type, expected
    )))
}
