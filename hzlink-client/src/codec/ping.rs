//! Heartbeat ping (0x000f) codec.

use hzlink_core::protocol::{ClientMessage, CLIENT_PING, PARTITION_ID_NONE, VOID_RESPONSE};
use hzlink_core::{hz_trace, Result};

use super::{expect_response, prepare};
use crate::connection::Connection;

/// Encodes a ping request. It has no payload.
pub fn encode_request() -> ClientMessage {
    let mut message = ClientMessage::create_for_encode(0);
    message.set_message_type(CLIENT_PING);
    message.update_frame_length();
    message
}

/// Encodes the empty acknowledgement returned for void operations.
pub fn encode_void_response() -> ClientMessage {
    let mut message = ClientMessage::create_for_encode(0);
    message.set_message_type(VOID_RESPONSE);
    message.update_frame_length();
    message
}

/// Pings the member and waits for the acknowledgement.
pub async fn send_ping(connection: &Connection) -> Result<()> {
    let mut request = encode_request();
    prepare(connection, &mut request, PARTITION_ID_NONE);

    let response = connection.exchange(request).await?;
    expect_response(connection, response, VOID_RESPONSE, "ping")?;
    hz_trace!(connection.logger(), "ping acknowledged by {}", connection.address());
    Ok(())
}
