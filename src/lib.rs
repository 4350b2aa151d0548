//! Frame Relay Library
//!
//! Captures camera frames and forwards each one, byte for byte, to a
//! remote server as an HTTP POST body or a UDP datagram.
//!
//! # Architecture
//!
//! ```text
//! camera → capture thread → latest-frame slot → analyzer thread → relay
//!                                                                   ↓
//!                                                   http POST / udp datagram
//! ```
//!
//! # Delivery Model
//!
//! - **Latest frame wins**: a slow analyzer drops stale frames instead of
//!   queueing them
//! - **Identity payload**: transports send exactly the captured bytes
//! - **Failures stay local**: a failed send is logged and counted, and the
//!   next frame is sent regardless
//! - **Bounded resources**: UDP sends run on one worker per sender behind
//!   a bounded queue
//!
//! # Example
//!
//! ```no_run
//! use frame_relay::{
//!     capture::{CaptureConfig, FrameProducer, MockCamera},
//!     config::TransportConfig,
//!     Relay,
//! };
//! use std::sync::Arc;
//!
//! let relay = Arc::new(Relay::from_config(&TransportConfig::default()).unwrap());
//! let sink = Arc::clone(&relay);
//!
//! let mut producer = FrameProducer::start(
//!     MockCamera::new,
//!     CaptureConfig::default(),
//!     move |frame| sink.handle_frame(frame),
//! )
//! .unwrap();
//!
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! producer.stop();
//! relay.close();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

/// Per-frame analysis.
pub mod analysis;
/// Cameras, frames and the frame producer.
pub mod capture;
/// Configuration file format.
pub mod config;
/// Prometheus metrics.
pub mod metrics;
/// Fan-out of frames to the configured transports.
pub mod relay;
/// HTTP and UDP frame transports.
pub mod transport;

// Re-export commonly used types at crate root
pub use analysis::{mean_luma, LumaTracker};
pub use capture::{Camera, CaptureConfig, Frame, FrameProducer, MockCamera, PixelFormat};
pub use config::{FileConfig, TransportConfig, TransportMode};
pub use relay::Relay;
pub use transport::{
    send_datagram, FrameTransport, HttpTransport, TransportError, TransportTarget, UdpSender,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
