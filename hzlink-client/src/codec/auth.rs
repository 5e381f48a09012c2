//! Client authentication (0x0002 / 0x6b) codec.

use hzlink_core::protocol::{
    calculate_size_str, ClientMessage, AUTHENTICATION_CORRELATION_ID, AUTHENTICATION_RESPONSE,
    BEGIN_END_FLAG, BOOLEAN_SIZE_IN_BYTES, BYTE_SIZE_IN_BYTES, CLIENT_AUTHENTICATION,
    INT_SIZE_IN_BYTES, PARTITION_ID_NONE,
};
use hzlink_core::{hz_trace, Address, HzError, Result};

use super::expect_response;
use crate::connection::Connection;

/// Outcome reported by the member in an authentication response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationStatus {
    /// Credentials accepted.
    Authenticated,
    /// Credentials rejected.
    CredentialsFailed,
    /// The requested serialization version is not supported.
    SerializationVersionMismatch,
    /// A status code this client does not know.
    Unknown(u8),
}

impl AuthenticationStatus {
    /// Maps a wire status byte.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Authenticated,
            1 => Self::CredentialsFailed,
            2 => Self::SerializationVersionMismatch,
            other => Self::Unknown(other),
        }
    }

    /// Returns the wire status byte.
    pub fn code(&self) -> u8 {
        match self {
            Self::Authenticated => 0,
            Self::CredentialsFailed => 1,
            Self::SerializationVersionMismatch => 2,
            Self::Unknown(code) => *code,
        }
    }
}

/// Parameters of an authentication request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest<'a> {
    /// Username (the cluster group name on 3.x members).
    pub username: &'a str,
    /// Password.
    pub password: &'a str,
    /// Client uuid from a previous session, if any.
    pub uuid: Option<&'a str>,
    /// Owner member uuid from a previous session, if any.
    pub owner_uuid: Option<&'a str>,
    /// Whether this connection becomes the owner connection.
    pub is_owner_connection: bool,
    /// Client type string.
    pub client_type: &'a str,
    /// Requested serialization version.
    pub serialization_version: u8,
}

/// Decoded authentication response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResponse {
    /// Authentication outcome.
    pub status: AuthenticationStatus,
    /// Address the member reports for itself.
    pub address: Option<Address>,
    /// Uuid the member assigned to this client.
    pub uuid: Option<String>,
    /// Uuid of the owner member.
    pub owner_uuid: Option<String>,
    /// Serialization version the member selected.
    pub serialization_version: u8,
}

/// Returns the payload size of an authentication request.
pub fn calculate_request_size(request: &AuthenticationRequest<'_>) -> usize {
    calculate_size_str(request.username)
        + calculate_size_str(request.password)
        + BOOLEAN_SIZE_IN_BYTES
        + request.uuid.map_or(0, calculate_size_str)
        + BOOLEAN_SIZE_IN_BYTES
        + request.owner_uuid.map_or(0, calculate_size_str)
        + BOOLEAN_SIZE_IN_BYTES
        + calculate_size_str(request.client_type)
        + BYTE_SIZE_IN_BYTES
}

/// Encodes an authentication request. The frame is marked retryable.
pub fn encode_request(request: &AuthenticationRequest<'_>) -> ClientMessage {
    let mut message = ClientMessage::create_for_encode(calculate_request_size(request));
    message.set_message_type(CLIENT_AUTHENTICATION);
    message.set_retryable(true);
    message.append_str(request.username);
    message.append_str(request.password);
    append_nullable_str(&mut message, request.uuid);
    append_nullable_str(&mut message, request.owner_uuid);
    message.append_bool(request.is_owner_connection);
    message.append_str(request.client_type);
    message.append_byte(request.serialization_version);
    message.update_frame_length();
    message
}

/// Decodes an authentication request, as a member would.
pub fn decode_request(message: &mut ClientMessage) -> Result<(String, String)> {
    let username = message.read_string()?;
    let password = message.read_string()?;
    Ok((username, password))
}

/// Encodes an authentication response.
pub fn encode_response(response: &AuthenticationResponse) -> ClientMessage {
    let size = BYTE_SIZE_IN_BYTES
        + BOOLEAN_SIZE_IN_BYTES
        + response.address.as_ref().map_or(0, |address| {
            calculate_size_str(address.host()) + INT_SIZE_IN_BYTES
        })
        + BOOLEAN_SIZE_IN_BYTES
        + response.uuid.as_deref().map_or(0, calculate_size_str)
        + BOOLEAN_SIZE_IN_BYTES
        + response.owner_uuid.as_deref().map_or(0, calculate_size_str)
        + BYTE_SIZE_IN_BYTES;

    let mut message = ClientMessage::create_for_encode(size);
    message.set_message_type(AUTHENTICATION_RESPONSE);
    message.append_byte(response.status.code());
    message.append_bool(response.address.is_none());
    if let Some(address) = &response.address {
        message.append_str(address.host());
        message.append_i32(i32::from(address.port()));
    }
    append_nullable_str(&mut message, response.uuid.as_deref());
    append_nullable_str(&mut message, response.owner_uuid.as_deref());
    message.append_byte(response.serialization_version);
    message.update_frame_length();
    message
}

/// Decodes an authentication response.
pub fn decode_response(message: &mut ClientMessage) -> Result<AuthenticationResponse> {
    let status = AuthenticationStatus::from_code(message.read_byte()?);

    let address = if message.read_bool()? {
        None
    } else {
        let host = message.read_string()?;
        let port = message.read_i32()?;
        let port = u16::try_from(port)
            .map_err(|_| HzError::Protocol(format!("member reported invalid port {port}")))?;
        Some(Address::new(host, port))
    };

    let uuid = read_nullable_str(message)?;
    let owner_uuid = read_nullable_str(message)?;
    let serialization_version = message.read_byte()?;

    Ok(AuthenticationResponse {
        status,
        address,
        uuid,
        owner_uuid,
        serialization_version,
    })
}

/// Sends the authentication request with the reserved correlation id and
/// decodes the member's answer. The status is returned as-is.
pub async fn send_authentication(
    connection: &Connection,
    request: &AuthenticationRequest<'_>,
) -> Result<AuthenticationResponse> {
    let mut message = encode_request(request);
    message.set_correlation_id(AUTHENTICATION_CORRELATION_ID);
    message.set_partition_id(PARTITION_ID_NONE);
    message.set_flags(BEGIN_END_FLAG);

    let response = connection.exchange(message).await?;
    let mut response = expect_response(
        connection,
        response,
        AUTHENTICATION_RESPONSE,
        "authentication",
    )?;
    let decoded = decode_response(&mut response)?;
    hz_trace!(
        connection.logger(),
        "authentication response from {}: status {:?}",
        connection.address(),
        decoded.status
    );
    Ok(decoded)
}

fn append_nullable_str(message: &mut ClientMessage, value: Option<&str>) {
    message.append_bool(value.is_none());
    if let Some(value) = value {
        message.append_str(value);
    }
}

fn read_nullable_str(message: &mut ClientMessage) -> Result<Option<String>> {
    if message.read_bool()? {
        Ok(None)
    } else {
        message.read_string().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reread(message: &ClientMessage) -> ClientMessage {
        ClientMessage::create_for_decode(message.as_bytes()).unwrap()
    }

    fn request<'a>(uuid: Option<&'a str>, owner_uuid: Option<&'a str>) -> AuthenticationRequest<'a> {
        AuthenticationRequest {
            username: "dev",
            password: "dev-pass",
            uuid,
            owner_uuid,
            is_owner_connection: true,
            client_type: "RST",
            serialization_version: 1,
        }
    }

    #[test]
    fn test_request_size_matches_encoding() {
        for (uuid, owner) in [(None, None), (Some("u-1"), None), (Some("u-1"), Some("o-1"))] {
            let req = request(uuid, owner);
            let message = encode_request(&req);
            assert_eq!(
                message.len(),
                hzlink_core::protocol::HEADER_SIZE + calculate_request_size(&req)
            );
            assert_eq!(message.frame_length() as usize, message.len());
        }
    }

    #[test]
    fn test_request_layout() {
        let message = encode_request(&request(None, Some("owner")));
        assert_eq!(message.message_type(), CLIENT_AUTHENTICATION);
        assert!(message.is_retryable());

        let mut decoded = reread(&message);
        assert_eq!(decoded.read_string().unwrap(), "dev");
        assert_eq!(decoded.read_string().unwrap(), "dev-pass");
        assert!(decoded.read_bool().unwrap());
        assert!(!decoded.read_bool().unwrap());
        assert_eq!(decoded.read_string().unwrap(), "owner");
        assert!(decoded.read_bool().unwrap());
        assert_eq!(decoded.read_string().unwrap(), "RST");
        assert_eq!(decoded.read_byte().unwrap(), 1);
        assert_eq!(decoded.remaining(), 0);
    }

    #[test]
    fn test_decode_request_credentials() {
        let message = encode_request(&request(None, None));
        let (username, password) = decode_request(&mut reread(&message)).unwrap();
        assert_eq!(username, "dev");
        assert_eq!(password, "dev-pass");
    }

    #[test]
    fn test_response_round_trip() {
        let response = AuthenticationResponse {
            status: AuthenticationStatus::Authenticated,
            address: Some(Address::new("10.0.0.5", 5701)),
            uuid: Some("client-uuid".to_string()),
            owner_uuid: None,
            serialization_version: 1,
        };
        let encoded = encode_response(&response);
        assert_eq!(encoded.message_type(), AUTHENTICATION_RESPONSE);
        assert_eq!(decode_response(&mut reread(&encoded)).unwrap(), response);
    }

    #[test]
    fn test_response_without_address() {
        let response = AuthenticationResponse {
            status: AuthenticationStatus::CredentialsFailed,
            address: None,
            uuid: None,
            owner_uuid: None,
            serialization_version: 1,
        };
        let decoded = decode_response(&mut reread(&encode_response(&response))).unwrap();
        assert_eq!(decoded.status, AuthenticationStatus::CredentialsFailed);
        assert!(decoded.address.is_none());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthenticationStatus::from_code(0), AuthenticationStatus::Authenticated);
        assert_eq!(
            AuthenticationStatus::from_code(2),
            AuthenticationStatus::SerializationVersionMismatch
        );
        assert_eq!(AuthenticationStatus::from_code(9), AuthenticationStatus::Unknown(9));
        assert_eq!(AuthenticationStatus::Unknown(9).code(), 9);
    }

    #[test]
    fn test_decode_rejects_invalid_port() {
        let mut message = ClientMessage::create_for_encode(32);
        message.set_message_type(AUTHENTICATION_RESPONSE);
        message.append_byte(0);
        message.append_bool(false);
        message.append_str("host");
        message.append_i32(70_000);
        message.update_frame_length();

        assert!(decode_response(&mut reread(&message)).is_err());
    }
}
