//! Prometheus metrics for the frame relay.
//!
//! # Metrics Exposed
//!
//! ## Capture
//! - `frame_relay_frames_captured_total` - Frames captured from the camera
//! - `frame_relay_frames_dropped_total` - Frames replaced before analysis
//! - `frame_relay_frames_analyzed_total` - Frames delivered to the analyzer
//! - `frame_relay_capture_failures_total` - Failed capture attempts
//!
//! ## Transport (labelled by `transport`)
//! - `frame_relay_frames_sent_total` - Successful sends
//! - `frame_relay_send_failures_total` - Failed sends
//! - `frame_relay_transport_drops_total` - Frames discarded before sending
//! - `frame_relay_bytes_sent_total` - Payload bytes sent
//!
//! ## Analysis
//! - `frame_relay_last_luma` - Mean luma of the most recent frame
//!
//! The HTTP exporter is available with the `metrics` feature.
//!
//! # Example
//!
//! ```no_run
//! use frame_relay::capture::ProducerCounts;
//! use frame_relay::metrics::{MetricsRegistry, MetricsSnapshot};
//! use frame_relay::Relay;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let relay = Relay::new(Vec::new());
//!
//! let snapshot = MetricsSnapshot::from_components(ProducerCounts::default(), &relay);
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{BackgroundServer, MetricsServer, MetricsServerConfig, ServerError};
