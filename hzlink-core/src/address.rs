//! Cluster member addresses.

use std::fmt;
use std::str::FromStr;

use crate::error::HzError;

/// Host and port of a cluster member.
///
/// Unlike [`std::net::SocketAddr`] the host is kept verbatim, since members
/// report their canonical address as a host string during authentication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    /// Creates an address from a host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::new("127.0.0.1", 5701)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Address {
    type Err = HzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| HzError::Configuration(format!("address '{s}' is missing a port")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(HzError::Configuration(format!(
                "address '{s}' is missing a host"
            )));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| HzError::Configuration(format!("address '{s}' has an invalid port: {e}")))?;
        Ok(Self::new(host, port))
    }
}

impl From<std::net::SocketAddr> for Address {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let address = Address::new("10.0.0.1", 5701);
        assert_eq!(address.to_string(), "10.0.0.1:5701");
    }

    #[test]
    fn test_parse() {
        let address: Address = "localhost:5900".parse().unwrap();
        assert_eq!(address.host(), "localhost");
        assert_eq!(address.port(), 5900);
    }

    #[test]
    fn test_parse_ipv6() {
        let address: Address = "[::1]:5701".parse().unwrap();
        assert_eq!(address.host(), "::1");
        assert_eq!(address.port(), 5701);
    }

    #[test]
    fn test_parse_rejects_missing_port() {
        assert!("localhost".parse::<Address>().is_err());
        assert!("localhost:".parse::<Address>().is_err());
        assert!(":5701".parse::<Address>().is_err());
        assert!("localhost:99999".parse::<Address>().is_err());
    }

    #[test]
    fn test_from_socket_addr() {
        let socket: std::net::SocketAddr = "127.0.0.1:5702".parse().unwrap();
        assert_eq!(Address::from(socket), Address::new("127.0.0.1", 5702));
    }

    #[test]
    fn test_default() {
        assert_eq!(Address::default().to_string(), "127.0.0.1:5701");
    }
}
