//! Distributed object proxy create (0x0005) and destroy (0x0006) codecs.

use hzlink_core::protocol::{
    calculate_size_str, ClientMessage, CLIENT_CREATE_PROXY, CLIENT_DESTROY_PROXY,
    INT_SIZE_IN_BYTES, PARTITION_ID_NONE, VOID_RESPONSE,
};
use hzlink_core::{hz_trace, Address, Result};

use super::{expect_response, prepare};
use crate::connection::Connection;

/// Returns the payload size of a create-proxy request.
pub fn calculate_create_size(name: &str, service_name: &str, target: &Address) -> usize {
    calculate_destroy_size(name, service_name) + calculate_size_str(target.host()) + INT_SIZE_IN_BYTES
}

/// Returns the payload size of a destroy-proxy request.
pub fn calculate_destroy_size(name: &str, service_name: &str) -> usize {
    calculate_size_str(name) + calculate_size_str(service_name)
}

/// Encodes a create-proxy request targeting the member at `target`.
pub fn encode_create_request(name: &str, service_name: &str, target: &Address) -> ClientMessage {
    let mut message =
        ClientMessage::create_for_encode(calculate_create_size(name, service_name, target));
    message.set_message_type(CLIENT_CREATE_PROXY);
    message.append_str(name);
    message.append_str(service_name);
    message.append_str(target.host());
    message.append_i32(i32::from(target.port()));
    message.update_frame_length();
    message
}

/// Encodes a destroy-proxy request.
pub fn encode_destroy_request(name: &str, service_name: &str) -> ClientMessage {
    let mut message = ClientMessage::create_for_encode(calculate_destroy_size(name, service_name));
    message.set_message_type(CLIENT_DESTROY_PROXY);
    message.append_str(name);
    message.append_str(service_name);
    message.update_frame_length();
    message
}

/// Asks the member to create the named distributed object.
pub async fn send_create_proxy(connection: &Connection, name: &str, service_name: &str) -> Result<()> {
    let mut request = encode_create_request(name, service_name, &connection.address());
    prepare(connection, &mut request, PARTITION_ID_NONE);

    let response = connection.exchange(request).await?;
    expect_response(connection, response, VOID_RESPONSE, "create proxy")?;
    hz_trace!(connection.logger(), "proxy created for {} on {}", name, service_name);
    Ok(())
}

/// Asks the member to destroy the named distributed object.
pub async fn send_destroy_proxy(connection: &Connection, name: &str, service_name: &str) -> Result<()> {
    let mut request = encode_destroy_request(name, service_name);
    prepare(connection, &mut request, PARTITION_ID_NONE);

    let response = connection.exchange(request).await?;
    expect_response(connection, response, VOID_RESPONSE, "destroy proxy")?;
    hz_trace!(connection.logger(), "proxy destroyed for {} on {}", name, service_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hzlink_core::protocol::{HEADER_SIZE, QUEUE_SERVICE_NAME};

    #[test]
    fn test_create_request_layout() {
        let target = Address::new("127.0.0.1", 5701);
        let message = encode_create_request("myqueue", QUEUE_SERVICE_NAME, &target);
        assert_eq!(message.message_type(), CLIENT_CREATE_PROXY);
        assert_eq!(
            message.len(),
            HEADER_SIZE + calculate_create_size("myqueue", QUEUE_SERVICE_NAME, &target)
        );

        let mut decoded = ClientMessage::create_for_decode(message.as_bytes()).unwrap();
        assert_eq!(decoded.read_string().unwrap(), "myqueue");
        assert_eq!(decoded.read_string().unwrap(), QUEUE_SERVICE_NAME);
        assert_eq!(decoded.read_string().unwrap(), "127.0.0.1");
        assert_eq!(decoded.read_i32().unwrap(), 5701);
    }

    #[test]
    fn test_destroy_request_layout() {
        let message = encode_destroy_request("myqueue", QUEUE_SERVICE_NAME);
        assert_eq!(message.message_type(), CLIENT_DESTROY_PROXY);

        let mut decoded = ClientMessage::create_for_decode(message.as_bytes()).unwrap();
        assert_eq!(decoded.read_string().unwrap(), "myqueue");
        assert_eq!(decoded.read_string().unwrap(), QUEUE_SERVICE_NAME);
        assert_eq!(decoded.remaining(), 0);
    }
}
