//! Codec implementation for framing client messages on a byte stream.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use super::constants::*;
use super::ClientMessage;
use crate::error::{HzError, Result};

/// Largest frame the decoder accepts.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

/// Codec for encoding and decoding single-frame client messages.
///
/// Implements the `tokio_util::codec::{Encoder, Decoder}` traits for use
/// with tokio's framed I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientMessageCodec;

impl ClientMessageCodec {
    /// Creates a new codec instance.
    pub fn new() -> Self {
        Self
    }
}

/// Validates a frame length read from the wire.
pub fn check_frame_length(frame_length: i32) -> Result<usize> {
    let length = usize::try_from(frame_length)
        .map_err(|_| HzError::Protocol(format!("negative frame length {frame_length}")))?;
    if length < HEADER_SIZE {
        return Err(HzError::Protocol(format!(
            "frame length {length} is shorter than the {HEADER_SIZE}-byte header"
        )));
    }
    if length > MAX_FRAME_LENGTH {
        return Err(HzError::Protocol(format!(
            "frame length {length} exceeds the {MAX_FRAME_LENGTH}-byte limit"
        )));
    }
    Ok(length)
}

impl Encoder<ClientMessage> for ClientMessageCodec {
    type Error = HzError;

    fn encode(&mut self, item: ClientMessage, dst: &mut BytesMut) -> Result<()> {
        if item.frame_length() as usize != item.len() {
            return Err(HzError::Protocol(format!(
                "frame length {} does not match the {}-byte buffer",
                item.frame_length(),
                item.len()
            )));
        }
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

impl Decoder for ClientMessageCodec {
    type Item = ClientMessage;
    type Error = HzError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < INT_SIZE_IN_BYTES {
            return Ok(None);
        }

        let frame_length =
            check_frame_length(i32::from_le_bytes([src[0], src[1], src[2], src[3]]))?;
        if src.len() < frame_length {
            src.reserve(frame_length - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_length);
        ClientMessage::create_for_decode(frame).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping(correlation_id: i64) -> ClientMessage {
        let mut message = ClientMessage::create_for_encode(0);
        message.set_message_type(CLIENT_PING);
        message.set_correlation_id(correlation_id);
        message.set_flags(BEGIN_END_FLAG);
        message.update_frame_length();
        message
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut codec = ClientMessageCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(ping(9), &mut buf).unwrap();

        assert_eq!(buf.len(), HEADER_SIZE);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.message_type(), CLIENT_PING);
        assert_eq!(decoded.correlation_id(), 9);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_rejects_stale_frame_length() {
        let mut codec = ClientMessageCodec::new();
        let mut message = ClientMessage::create_for_encode(4);
        message.append_i32(1);

        let mut buf = BytesMut::new();
        assert!(codec.encode(message, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_waits_for_length_prefix() {
        let mut codec = ClientMessageCodec::new();
        let mut buf = BytesMut::from(&[22u8, 0][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_decode_partial_frame() {
        let mut codec = ClientMessageCodec::new();
        let mut full = BytesMut::new();
        codec.encode(ping(3), &mut full).unwrap();

        let mut buf = BytesMut::from(&full[..10]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[10..]);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.correlation_id(), 3);
    }

    #[test]
    fn test_decode_back_to_back_frames() {
        let mut codec = ClientMessageCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(ping(1), &mut buf).unwrap();
        codec.encode(ping(2), &mut buf).unwrap();

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.correlation_id(), 1);
        assert_eq!(second.correlation_id(), 2);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_short_frame_length() {
        let mut codec = ClientMessageCodec::new();
        let mut buf = BytesMut::from(&[8u8, 0, 0, 0, 0, 0, 0, 0][..]);
        assert!(matches!(codec.decode(&mut buf), Err(HzError::Protocol(_))));
    }

    #[test]
    fn test_check_frame_length() {
        assert!(check_frame_length(-1).is_err());
        assert!(check_frame_length(21).is_err());
        assert_eq!(check_frame_length(22).unwrap(), 22);
        assert!(check_frame_length(i32::MAX).is_err());
    }
}
