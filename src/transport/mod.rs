//! Frame transport over HTTP and UDP.
//!
//! Each transport performs one network send per frame and never alters
//! the payload. Failures are logged and counted at the call site; they
//! never propagate to the caller and never stop later sends.
//!
//! # Example
//!
//! ```no_run
//! use frame_relay::transport::{HttpTransport, TransportTarget, UdpSender};
//!
//! let http = HttpTransport::new("http://192.168.100.3:5000/receive_image").unwrap();
//! http.send_over_http(&[0u8; 16]);
//!
//! let target: TransportTarget = "192.168.100.3:5005".parse().unwrap();
//! let udp = UdpSender::new(target.clone(), 64).unwrap();
//! udp.send_over_udp(&[0u8; 16], &target);
//! udp.close();
//! ```

mod http;
mod stats;
mod target;
mod udp;

pub use http::{HttpTransport, HttpTransportConfig, OCTET_STREAM};
pub use stats::{TransportCounts, TransportStats};
pub use target::TransportTarget;
pub use udp::{send_datagram, UdpSender, MAX_DATAGRAM_PAYLOAD};

use thiserror::Error;

/// Errors raised by a single send attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The destination is not `host:port`.
    #[error("invalid target address: {0}")]
    InvalidTarget(String),
    /// The host resolved to no addresses.
    #[error("could not resolve {0}")]
    Unresolved(String),
    /// The endpoint URL is malformed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The endpoint URL is not http or https.
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
    /// The server answered with a non-2xx status.
    #[error("server responded with status {0}")]
    HttpStatus(u16),
    /// The request failed before a response arrived.
    #[error("http transport failed: {0}")]
    Http(String),
    /// The payload does not fit in one datagram.
    #[error("datagram of {size} bytes exceeds the {max} byte limit")]
    DatagramTooLarge {
        /// Payload length.
        size: usize,
        /// Largest payload one datagram can carry.
        max: usize,
    },
    /// The socket accepted only part of the payload.
    #[error("short datagram send: {sent} of {expected} bytes")]
    ShortSend {
        /// Bytes the socket reported as sent.
        sent: usize,
        /// Payload length.
        expected: usize,
    },
    /// A socket operation failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// A destination frames can be pushed to.
pub trait FrameTransport: Send + Sync {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Sends one frame payload. Errors are logged and counted, not returned.
    fn send_frame(&self, payload: &[u8]);

    /// Returns the transport's counters.
    fn counts(&self) -> TransportCounts;

    /// Stops the transport, flushing anything still queued.
    fn close(&self) {}
}
