//! Single-frame client message.
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |R|                      Frame Length                           |
//! +-------------+---------------+---------------------------------+
//! |  Version    |B|E|  Flags    |               Type              |
//! +-------------+---------------+---------------------------------+
//! |                                                               |
//! +                       CorrelationId                           +
//! |                                                               |
//! +---------------------------------------------------------------+
//! |                        PartitionId                            |
//! +-----------------------------+---------------------------------+
//! |        Data Offset          |                                 |
//! +-----------------------------+                                 |
//! |                      Message Payload Data                    ...
//! ```
//!
//! All header fields and payload primitives are little-endian, except the
//! `read_be_*` readers used for payloads wrapped by the member's serializer.

use bytes::{BufMut, Bytes, BytesMut};

use super::constants::*;
use crate::error::{HzError, Result};

/// A binary protocol frame: a 22-byte header followed by the payload.
///
/// Encode-mode messages come from [`create_for_encode`](Self::create_for_encode)
/// and grow by appending; decode-mode messages wrap the exact bytes read off the
/// socket and are consumed front to back with the `read_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    buffer: BytesMut,
    read_index: usize,
    retryable: bool,
}

impl ClientMessage {
    /// Creates a message for encoding with room for `payload_size` payload bytes.
    ///
    /// The header is initialised with the current version, a data offset of
    /// [`HEADER_SIZE`], a frame length of [`HEADER_SIZE`] and no partition.
    pub fn create_for_encode(payload_size: usize) -> Self {
        let mut buffer = BytesMut::with_capacity(HEADER_SIZE + payload_size);
        buffer.resize(HEADER_SIZE, 0);

        let mut message = Self {
            buffer,
            read_index: 0,
            retryable: false,
        };
        message.set_version(VERSION);
        message.set_data_offset(HEADER_SIZE as u16);
        message.set_frame_length(HEADER_SIZE as i32);
        message.set_partition_id(PARTITION_ID_NONE);
        message
    }

    /// Wraps bytes received from the wire for decoding.
    ///
    /// Fails if the buffer cannot hold a header or the header's data offset
    /// points outside of it.
    pub fn create_for_decode(buffer: impl Into<BytesMut>) -> Result<Self> {
        let buffer = buffer.into();
        if buffer.len() < HEADER_SIZE {
            return Err(HzError::Protocol(format!(
                "frame of {} bytes is shorter than the {}-byte header",
                buffer.len(),
                HEADER_SIZE
            )));
        }

        let message = Self {
            buffer,
            read_index: 0,
            retryable: false,
        };
        let data_offset = message.data_offset() as usize;
        if data_offset < HEADER_SIZE || data_offset > message.buffer.len() {
            return Err(HzError::Protocol(format!(
                "data offset {} is outside the {}-byte frame",
                data_offset,
                message.buffer.len()
            )));
        }
        Ok(message)
    }

    // Header accessors.

    /// Returns the frame length stored in the header.
    pub fn frame_length(&self) -> i32 {
        i32::from_le_bytes(self.header_field(FRAME_LENGTH_FIELD_OFFSET))
    }

    /// Stores the frame length in the header.
    pub fn set_frame_length(&mut self, length: i32) {
        self.set_header_field(FRAME_LENGTH_FIELD_OFFSET, length.to_le_bytes());
    }

    /// Returns the protocol version.
    pub fn version(&self) -> u8 {
        self.buffer[VERSION_FIELD_OFFSET]
    }

    /// Sets the protocol version.
    pub fn set_version(&mut self, version: u8) {
        self.buffer[VERSION_FIELD_OFFSET] = version;
    }

    /// Returns the flags byte.
    pub fn flags(&self) -> u8 {
        self.buffer[FLAGS_FIELD_OFFSET]
    }

    /// Sets the flags byte.
    pub fn set_flags(&mut self, flags: u8) {
        self.buffer[FLAGS_FIELD_OFFSET] = flags;
    }

    /// Returns true if any of the given flag bits are set.
    pub fn has_flags(&self, flags: u8) -> bool {
        self.flags() & flags != 0
    }

    /// Returns the message type.
    pub fn message_type(&self) -> u16 {
        u16::from_le_bytes(self.header_field(TYPE_FIELD_OFFSET))
    }

    /// Sets the message type.
    pub fn set_message_type(&mut self, message_type: u16) {
        self.set_header_field(TYPE_FIELD_OFFSET, message_type.to_le_bytes());
    }

    /// Returns the correlation id.
    pub fn correlation_id(&self) -> i64 {
        i64::from_le_bytes(self.header_field(CORRELATION_ID_FIELD_OFFSET))
    }

    /// Sets the correlation id.
    pub fn set_correlation_id(&mut self, correlation_id: i64) {
        self.set_header_field(CORRELATION_ID_FIELD_OFFSET, correlation_id.to_le_bytes());
    }

    /// Returns the partition id, `-1` when the message targets no partition.
    pub fn partition_id(&self) -> i32 {
        i32::from_le_bytes(self.header_field(PARTITION_ID_FIELD_OFFSET))
    }

    /// Sets the partition id.
    pub fn set_partition_id(&mut self, partition_id: i32) {
        self.set_header_field(PARTITION_ID_FIELD_OFFSET, partition_id.to_le_bytes());
    }

    /// Returns the offset at which the payload starts.
    pub fn data_offset(&self) -> u16 {
        u16::from_le_bytes(self.header_field(DATA_OFFSET_FIELD_OFFSET))
    }

    /// Sets the payload offset.
    pub fn set_data_offset(&mut self, offset: u16) {
        self.set_header_field(DATA_OFFSET_FIELD_OFFSET, offset.to_le_bytes());
    }

    /// Returns true if the message may be resent after a transport failure.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Marks the message as retryable.
    pub fn set_retryable(&mut self, retryable: bool) {
        self.retryable = retryable;
    }

    fn header_field<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut field = [0u8; N];
        field.copy_from_slice(&self.buffer[offset..offset + N]);
        field
    }

    fn set_header_field<const N: usize>(&mut self, offset: usize, bytes: [u8; N]) {
        self.buffer[offset..offset + N].copy_from_slice(&bytes);
    }

    // Payload appends.

    /// Appends a single byte.
    pub fn append_byte(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    /// Appends a boolean as `1` or `0`.
    pub fn append_bool(&mut self, value: bool) {
        self.append_byte(u8::from(value));
    }

    /// Appends a little-endian 32-bit integer.
    pub fn append_i32(&mut self, value: i32) {
        self.buffer.put_i32_le(value);
    }

    /// Appends a little-endian 64-bit integer.
    pub fn append_i64(&mut self, value: i64) {
        self.buffer.put_i64_le(value);
    }

    /// Appends a little-endian length prefix followed by the raw bytes.
    pub fn append_byte_array(&mut self, bytes: &[u8]) {
        self.append_i32(bytes.len() as i32);
        self.buffer.put_slice(bytes);
    }

    /// Appends a string as a byte array of its UTF-8 bytes.
    pub fn append_str(&mut self, value: &str) {
        self.append_byte_array(value.as_bytes());
    }

    /// Writes the current buffer length into the frame length field.
    ///
    /// Must run once, after the last append and before the message is sent.
    pub fn update_frame_length(&mut self) {
        self.set_frame_length(self.buffer.len() as i32);
    }

    // Payload reads.

    /// Reads a single byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a boolean; only `1` is true.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? == 1)
    }

    /// Reads a little-endian 32-bit integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Reads a big-endian 32-bit integer, as written by the member's serializers.
    pub fn read_be_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Reads a little-endian 64-bit integer.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Reads a byte array with a little-endian length prefix.
    pub fn read_byte_array(&mut self) -> Result<Vec<u8>> {
        let length = self.read_i32()?;
        self.read_sized(length)
    }

    /// Reads a byte array with a big-endian length prefix.
    pub fn read_be_byte_array(&mut self) -> Result<Vec<u8>> {
        let length = self.read_be_i32()?;
        self.read_sized(length)
    }

    /// Reads a UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_byte_array()?;
        String::from_utf8(bytes)
            .map_err(|e| HzError::Protocol(format!("string field is not valid UTF-8: {e}")))
    }

    fn read_sized(&mut self, length: i32) -> Result<Vec<u8>> {
        let length = usize::try_from(length)
            .map_err(|_| HzError::Protocol(format!("negative byte array length {length}")))?;
        Ok(self.take(length)?.to_vec())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn take(&mut self, length: usize) -> Result<&[u8]> {
        let start = self.data_offset() as usize + self.read_index;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.buffer.len())
            .ok_or_else(|| {
                HzError::Protocol(format!(
                    "read of {} bytes at offset {} overruns the {}-byte frame",
                    length,
                    start,
                    self.buffer.len()
                ))
            })?;
        self.read_index += length;
        Ok(&self.buffer[start..end])
    }

    // Buffer access.

    /// Returns the number of payload bytes written so far.
    pub fn write_index(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the number of payload bytes consumed by reads so far.
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Returns the number of payload bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.buffer
            .len()
            .saturating_sub(self.data_offset() as usize + self.read_index)
    }

    /// Returns the total buffer length, header included.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the message carries no payload.
    pub fn is_empty(&self) -> bool {
        self.buffer.len() <= self.data_offset() as usize
    }

    /// Returns the wire image of the message.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the message, returning its wire image.
    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }
}

/// Returns the encoded size of a string field.
pub fn calculate_size_str(value: &str) -> usize {
    INT_SIZE_IN_BYTES + value.len()
}

/// Returns the encoded size of a byte array field.
pub fn calculate_size_byte_array(bytes: &[u8]) -> usize {
    INT_SIZE_IN_BYTES + bytes.len()
}
