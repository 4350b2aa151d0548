//! Destination addresses for datagram sends.

use super::TransportError;
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

/// A `(host, port)` pair, resolved afresh on every send.
///
/// Parsed from `host:port` text, with IPv6 literals in brackets
/// (`[::1]:5005`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportTarget {
    host: String,
    port: u16,
}

impl TransportTarget {
    /// Creates a target from a host name or IP literal and a port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the host, without IPv6 brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolves the target to its first socket address.
    pub fn resolve(&self) -> Result<SocketAddr, TransportError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::Unresolved(self.to_string()))
    }
}

impl FromStr for TransportTarget {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| TransportError::InvalidTarget(format!("missing port in {:?}", s)))?;

        let host = match host.strip_prefix('[') {
            Some(inner) => inner.strip_suffix(']').ok_or_else(|| {
                TransportError::InvalidTarget(format!("unterminated ipv6 literal in {:?}", s))
            })?,
            None if host.contains(':') => {
                return Err(TransportError::InvalidTarget(format!(
                    "ipv6 hosts must be bracketed: {:?}",
                    s
                )))
            }
            None => host,
        };
        if host.is_empty() {
            return Err(TransportError::InvalidTarget(format!("missing host in {:?}", s)));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| TransportError::InvalidTarget(format!("invalid port in {:?}", s)))?;

        Ok(Self::new(host, port))
    }
}

impl From<SocketAddr> for TransportTarget {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
