//! Distributed queue codecs: put, poll, clear, add listener and item events.
//!
//! Queue items travel as serialized data: a big-endian envelope of partition
//! hash, serializer id and length-prefixed bytes, itself carried as a
//! little-endian byte array field of the frame.

use hzlink_core::partition::partition_key_for_name;
use hzlink_core::protocol::{
    calculate_size_byte_array, calculate_size_str, ClientMessage, BOOLEAN_SIZE_IN_BYTES,
    DATA_RESPONSE, INT_SIZE_IN_BYTES, ITEM_EVENT, LISTENER_FLAG, LONG_SIZE_IN_BYTES,
    PARTITION_ID_NONE, QUEUE_ADD_LISTENER, QUEUE_CLEAR, QUEUE_POLL, QUEUE_PUT, STRING_RESPONSE,
    VOID_RESPONSE,
};
use hzlink_core::{hz_trace, HzError, Result};

use super::{expect_response, prepare};
use crate::connection::Connection;

/// Size of the envelope header preceding the item bytes.
const DATA_HEADER_SIZE: usize = 3 * INT_SIZE_IN_BYTES;

/// Kind of change an item event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEventType {
    /// An item was added to the queue.
    Added,
    /// An item was removed from the queue.
    Removed,
    /// An event type this client does not know.
    Unknown(i32),
}

impl ItemEventType {
    /// Maps a wire event type.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Added,
            2 => Self::Removed,
            other => Self::Unknown(other),
        }
    }

    /// Returns the wire event type.
    pub fn code(&self) -> i32 {
        match self {
            Self::Added => 1,
            Self::Removed => 2,
            Self::Unknown(code) => *code,
        }
    }
}

/// An item event pushed to a queue listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEvent {
    /// Serialized item, present only when the listener asked for values.
    pub item: Option<Vec<u8>>,
    /// Uuid of the member that produced the event.
    pub member_uuid: String,
    /// Kind of change.
    pub event_type: ItemEventType,
}

/// Wraps raw bytes in the serialized data envelope.
pub fn wrap_data(payload: &[u8], serializer_id: i32) -> Vec<u8> {
    let mut data = Vec::with_capacity(DATA_HEADER_SIZE + payload.len());
    data.extend_from_slice(&0i32.to_be_bytes());
    data.extend_from_slice(&serializer_id.to_be_bytes());
    data.extend_from_slice(&(payload.len() as i32).to_be_bytes());
    data.extend_from_slice(payload);
    data
}

/// Returns the partition key the named queue is routed by.
pub fn queue_partition_key(name: &str) -> Vec<u8> {
    partition_key_for_name(name)
}

/// Encodes a put request carrying an already wrapped item.
pub fn encode_put_request(name: &str, data: &[u8]) -> ClientMessage {
    let mut message =
        ClientMessage::create_for_encode(calculate_size_str(name) + calculate_size_byte_array(data));
    message.set_message_type(QUEUE_PUT);
    message.append_str(name);
    message.append_byte_array(data);
    message.update_frame_length();
    message
}

/// Encodes a poll request waiting up to `timeout_millis` on the member.
pub fn encode_poll_request(name: &str, timeout_millis: i64) -> ClientMessage {
    let mut message = ClientMessage::create_for_encode(calculate_size_str(name) + LONG_SIZE_IN_BYTES);
    message.set_message_type(QUEUE_POLL);
    message.append_str(name);
    message.append_i64(timeout_millis);
    message.update_frame_length();
    message
}

/// Encodes a clear request.
pub fn encode_clear_request(name: &str) -> ClientMessage {
    let mut message = ClientMessage::create_for_encode(calculate_size_str(name));
    message.set_message_type(QUEUE_CLEAR);
    message.append_str(name);
    message.update_frame_length();
    message
}

/// Encodes an add-listener request.
pub fn encode_add_listener_request(name: &str, include_value: bool, local_only: bool) -> ClientMessage {
    let mut message =
        ClientMessage::create_for_encode(calculate_size_str(name) + 2 * BOOLEAN_SIZE_IN_BYTES);
    message.set_message_type(QUEUE_ADD_LISTENER);
    message.append_str(name);
    message.append_bool(include_value);
    message.append_bool(local_only);
    message.update_frame_length();
    message
}

/// Encodes a poll response. `data` is the wrapped item, `None` when the
/// queue was empty.
pub fn encode_poll_response(data: Option<&[u8]>) -> ClientMessage {
    let size = BOOLEAN_SIZE_IN_BYTES + data.map_or(0, calculate_size_byte_array);
    let mut message = ClientMessage::create_for_encode(size);
    message.set_message_type(DATA_RESPONSE);
    message.append_bool(data.is_none());
    if let Some(data) = data {
        message.append_byte_array(data);
    }
    message.update_frame_length();
    message
}

/// Decodes a poll response, unwrapping the item.
///
/// Returns `None` when the queue was empty. An item written with a
/// serializer other than `serializer_id` is rejected.
pub fn decode_poll_response(message: &mut ClientMessage, serializer_id: i32) -> Result<Option<Vec<u8>>> {
    if message.read_bool()? {
        return Ok(None);
    }

    let _data_length = message.read_i32()?;
    let _partition_hash = message.read_be_i32()?;
    let item_serializer_id = message.read_be_i32()?;
    if item_serializer_id != serializer_id {
        return Err(HzError::Protocol(format!(
            "queue item has serializer id {item_serializer_id}, expected {serializer_id}"
        )));
    }
    message.read_be_byte_array().map(Some)
}

/// Encodes the string response carrying a listener registration id.
pub fn encode_string_response(value: &str) -> ClientMessage {
    let mut message = ClientMessage::create_for_encode(calculate_size_str(value));
    message.set_message_type(STRING_RESPONSE);
    message.append_str(value);
    message.update_frame_length();
    message
}

/// Decodes the registration id returned for an add-listener request.
pub fn decode_add_listener_response(message: &mut ClientMessage) -> Result<String> {
    message.read_string()
}

/// Encodes an item event.
pub fn encode_item_event(event: &ItemEvent) -> ClientMessage {
    let size = BOOLEAN_SIZE_IN_BYTES
        + event.item.as_deref().map_or(0, calculate_size_byte_array)
        + calculate_size_str(&event.member_uuid)
        + INT_SIZE_IN_BYTES;

    let mut message = ClientMessage::create_for_encode(size);
    message.set_message_type(ITEM_EVENT);
    message.set_flags(LISTENER_FLAG);
    message.append_bool(event.item.is_none());
    if let Some(item) = &event.item {
        message.append_byte_array(item);
    }
    message.append_str(&event.member_uuid);
    message.append_i32(event.event_type.code());
    message.update_frame_length();
    message
}

/// Decodes an item event.
pub fn decode_item_event(message: &mut ClientMessage) -> Result<ItemEvent> {
    if message.message_type() != ITEM_EVENT {
        return Err(HzError::Protocol(format!(
            "expected item event, got type 0x{:04x}",
            message.message_type()
        )));
    }

    let item = if message.read_bool()? {
        None
    } else {
        Some(message.read_byte_array()?)
    };
    let member_uuid = message.read_string()?;
    let event_type = ItemEventType::from_code(message.read_i32()?);

    Ok(ItemEvent {
        item,
        member_uuid,
        event_type,
    })
}

/// Puts `payload` on the named queue, wrapped with `serializer_id`.
pub async fn send_put(connection: &Connection, name: &str, payload: &[u8], serializer_id: i32) -> Result<()> {
    let partition_id = connection.partition_for_key(queue_partition_key(name).as_slice())?;
    let mut request = encode_put_request(name, &wrap_data(payload, serializer_id));
    prepare(connection, &mut request, partition_id);

    let response = connection.exchange(request).await?;
    expect_response(connection, response, VOID_RESPONSE, "queue put")?;
    hz_trace!(
        connection.logger(),
        "queue put to {} succeeded, {} bytes",
        name,
        payload.len()
    );
    Ok(())
}

/// Polls the named queue, waiting up to `timeout_millis` on the member.
pub async fn send_poll(
    connection: &Connection,
    name: &str,
    timeout_millis: i64,
    serializer_id: i32,
) -> Result<Option<Vec<u8>>> {
    let partition_id = connection.partition_for_key(queue_partition_key(name).as_slice())?;
    let mut request = encode_poll_request(name, timeout_millis);
    prepare(connection, &mut request, partition_id);

    let response = connection.exchange(request).await?;
    let mut response = expect_response(connection, response, DATA_RESPONSE, "queue poll")?;
    let item = decode_poll_response(&mut response, serializer_id)?;
    hz_trace!(
        connection.logger(),
        "queue poll from {} returned {} bytes",
        name,
        item.as_ref().map_or(0, Vec::len)
    );
    Ok(item)
}

/// Removes every item from the named queue.
pub async fn send_clear(connection: &Connection, name: &str) -> Result<()> {
    let partition_id = connection.partition_for_key(queue_partition_key(name).as_slice())?;
    let mut request = encode_clear_request(name);
    prepare(connection, &mut request, partition_id);

    let response = connection.exchange(request).await?;
    expect_response(connection, response, VOID_RESPONSE, "queue clear")?;
    Ok(())
}

/// Builds an add-listener request stamped with a fresh correlation id.
///
/// The caller registers the correlation id before sending, since the member
/// answers and then pushes events under the same id.
pub(crate) fn prepare_add_listener(connection: &Connection, name: &str) -> ClientMessage {
    let mut request = encode_add_listener_request(name, false, false);
    prepare(connection, &mut request, PARTITION_ID_NONE);
    request
}

/// Checks the add-listener acknowledgement and returns the registration id.
pub(crate) fn accept_add_listener(connection: &Connection, response: ClientMessage) -> Result<String> {
    let mut response = expect_response(connection, response, STRING_RESPONSE, "queue add listener")?;
    decode_add_listener_response(&mut response)
}
