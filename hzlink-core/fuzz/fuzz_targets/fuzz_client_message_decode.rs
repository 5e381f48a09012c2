#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;

use hzlink_core::protocol::{ClientMessage, ClientMessageCodec};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = ClientMessageCodec::new();
    let mut buf = BytesMut::from(data);

    loop {
        match codec.decode(&mut buf) {
            Ok(Some(mut msg)) => {
                let _ = msg.message_type();
                let _ = msg.correlation_id();
                let _ = msg.partition_id();
                let _ = msg.flags();
                while msg.remaining() > 0 {
                    if msg.read_string().is_err() {
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(_) => break,
        }
    }

    if let Ok(mut msg) = ClientMessage::create_for_decode(data) {
        let _ = msg.read_i64();
        let _ = msg.read_be_byte_array();
    }
});
