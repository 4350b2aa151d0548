//! Metrics collection and registry.

use crate::capture::ProducerCounts;
use crate::relay::Relay;
use crate::transport::TransportCounts;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of relay state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Capture-side counters.
    pub producer: ProducerCounts,
    /// Per-transport counters, keyed by transport name.
    pub transports: Vec<(&'static str, TransportCounts)>,
    /// Mean luma of the most recent frame.
    pub last_luma: Option<f64>,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the producer and relay.
    pub fn from_components(producer: ProducerCounts, relay: &Relay) -> Self {
        Self {
            producer,
            transports: relay.counts(),
            last_luma: relay.last_luma(),
        }
    }
}

/// Prometheus metrics registry for the relay.
pub struct MetricsRegistry {
    registry: Registry,

    // Capture metrics
    frames_captured: IntCounter,
    frames_dropped: IntCounter,
    frames_analyzed: IntCounter,
    capture_failures: IntCounter,

    // Transport metrics, labelled by transport
    frames_sent: IntCounterVec,
    send_failures: IntCounterVec,
    queue_drops: IntCounterVec,
    bytes_sent: IntCounterVec,

    // Analysis metrics
    last_luma: Gauge,
}

/// Increments a counter up to `target`; counters only move forward.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all relay metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_captured = IntCounter::new(
            "frame_relay_frames_captured_total",
            "Frames captured from the camera",
        )?;
        let frames_dropped = IntCounter::new(
            "frame_relay_frames_dropped_total",
            "Frames replaced before the analyzer could take them",
        )?;
        let frames_analyzed = IntCounter::new(
            "frame_relay_frames_analyzed_total",
            "Frames delivered to the analyzer",
        )?;
        let capture_failures = IntCounter::new(
            "frame_relay_capture_failures_total",
            "Failed capture attempts",
        )?;

        let frames_sent = IntCounterVec::new(
            Opts::new("frame_relay_frames_sent_total", "Frames sent successfully"),
            &["transport"],
        )?;
        let send_failures = IntCounterVec::new(
            Opts::new("frame_relay_send_failures_total", "Frame sends that failed"),
            &["transport"],
        )?;
        let queue_drops = IntCounterVec::new(
            Opts::new(
                "frame_relay_transport_drops_total",
                "Frames discarded by a transport before sending",
            ),
            &["transport"],
        )?;
        let bytes_sent = IntCounterVec::new(
            Opts::new("frame_relay_bytes_sent_total", "Payload bytes sent"),
            &["transport"],
        )?;

        let last_luma = Gauge::new(
            "frame_relay_last_luma",
            "Mean luma of the most recent frame (0-255)",
        )?;

        registry.register(Box::new(frames_captured.clone()))?;
        registry.register(Box::new(frames_dropped.clone()))?;
        registry.register(Box::new(frames_analyzed.clone()))?;
        registry.register(Box::new(capture_failures.clone()))?;
        registry.register(Box::new(frames_sent.clone()))?;
        registry.register(Box::new(send_failures.clone()))?;
        registry.register(Box::new(queue_drops.clone()))?;
        registry.register(Box::new(bytes_sent.clone()))?;
        registry.register(Box::new(last_luma.clone()))?;

        Ok(Self {
            registry,
            frames_captured,
            frames_dropped,
            frames_analyzed,
            capture_failures,
            frames_sent,
            send_failures,
            queue_drops,
            bytes_sent,
            last_luma,
        })
    }

    /// Updates all metrics from a snapshot of relay state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        advance(&self.frames_captured, snapshot.producer.captured);
        advance(&self.frames_dropped, snapshot.producer.dropped);
        advance(&self.frames_analyzed, snapshot.producer.analyzed);
        advance(&self.capture_failures, snapshot.producer.capture_failures);

        for (name, counts) in &snapshot.transports {
            let labels = [*name];
            advance(&self.frames_sent.with_label_values(&labels), counts.sent);
            advance(&self.send_failures.with_label_values(&labels), counts.failed);
            advance(&self.queue_drops.with_label_values(&labels), counts.dropped);
            advance(&self.bytes_sent.with_label_values(&labels), counts.bytes_sent);
        }

        if let Some(luma) = snapshot.last_luma {
            self.last_luma.set(luma);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
