//! Exception response (0x6d) codec.

use hzlink_core::protocol::{
    calculate_size_str, ClientMessage, BOOLEAN_SIZE_IN_BYTES, EXCEPTION_RESPONSE,
    INT_SIZE_IN_BYTES,
};
use hzlink_core::{HzError, Result};

/// Decodes an exception response into [`HzError::Server`].
///
/// Only the leading error code, class name and message are read; the stack
/// trace and cause that may follow are ignored.
pub fn decode(message: &mut ClientMessage) -> Result<HzError> {
    let code = message.read_i32()?;
    let class_name = message.read_string()?;
    let message_is_null = message.read_bool()?;
    let text = if message_is_null {
        None
    } else {
        Some(message.read_string()?)
    };
    Ok(HzError::Server {
        code,
        class_name,
        message: text,
    })
}

/// Encodes an exception response.
pub fn encode(code: i32, class_name: &str, text: Option<&str>) -> ClientMessage {
    let size = INT_SIZE_IN_BYTES
        + calculate_size_str(class_name)
        + BOOLEAN_SIZE_IN_BYTES
        + text.map_or(0, calculate_size_str);

    let mut message = ClientMessage::create_for_encode(size);
    message.set_message_type(EXCEPTION_RESPONSE);
    message.append_i32(code);
    message.append_str(class_name);
    message.append_bool(text.is_none());
    if let Some(text) = text {
        message.append_str(text);
    }
    message.update_frame_length();
    message
}
