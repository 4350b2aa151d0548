//! Per-frame fan-out to the configured transports.
//!
//! The relay is the analyzer callback: it receives each frame on the
//! analyzer thread and passes the bytes, untouched, to every transport.

use crate::analysis::LumaTracker;
use crate::capture::Frame;
use crate::config::{ConfigError, TransportConfig};
use crate::transport::{
    FrameTransport, HttpTransport, HttpTransportConfig, TransportCounts, UdpSender,
};

/// Sends every frame through a fixed set of transports.
pub struct Relay {
    transports: Vec<Box<dyn FrameTransport>>,
    luma: Option<LumaTracker>,
}

impl Relay {
    /// Creates a relay over explicit transports.
    pub fn new(transports: Vec<Box<dyn FrameTransport>>) -> Self {
        Self {
            transports,
            luma: None,
        }
    }

    /// Builds the transports selected by `config.mode`.
    pub fn from_config(config: &TransportConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut transports: Vec<Box<dyn FrameTransport>> = Vec::new();

        if config.mode.uses_http() {
            let http = HttpTransport::with_config(HttpTransportConfig {
                url: config.http_url.clone(),
                timeout: config.http_timeout(),
            })
            .map_err(|e| ConfigError::InvalidUrl {
                url: config.http_url.clone(),
                reason: e.to_string(),
            })?;
            tracing::info!(url = %http.url(), "HTTP transport enabled");
            transports.push(Box::new(http));
        }

        if config.mode.uses_udp() {
            let udp = UdpSender::new(config.udp_target()?, config.udp_queue_depth)
                .map_err(|e| ConfigError::InvalidTarget(e.to_string()))?;
            transports.push(Box::new(udp));
        }

        Ok(Self::new(transports))
    }

    /// Enables mean-luma tracking for every relayed frame.
    pub fn with_luma_tracking(mut self) -> Self {
        self.luma = Some(LumaTracker::new());
        self
    }

    /// Passes the frame's bytes to each transport in turn.
    ///
    /// Transport failures are handled inside each transport, so a failing
    /// transport never prevents the others from sending.
    pub fn handle_frame(&self, frame: &Frame) {
        if let Some(luma) = self.luma.as_ref().and_then(|tracker| tracker.observe(frame)) {
            tracing::trace!(sequence = frame.sequence(), luma, "Frame luma");
        }

        for transport in &self.transports {
            transport.send_frame(frame.data());
        }
    }

    /// Returns each transport's name and counters.
    pub fn counts(&self) -> Vec<(&'static str, TransportCounts)> {
        self.transports
            .iter()
            .map(|t| (t.name(), t.counts()))
            .collect()
    }

    /// Returns the counters of the named transport, if configured.
    pub fn counts_for(&self, name: &str) -> Option<TransportCounts> {
        self.transports
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.counts())
    }

    /// Returns the last recorded mean luma.
    pub fn last_luma(&self) -> Option<f64> {
        self.luma.as_ref().and_then(LumaTracker::last)
    }

    /// Closes every transport, flushing queued frames.
    pub fn close(&self) {
        for transport in &self.transports {
            transport.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportMode;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recording {
        payloads: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl FrameTransport for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn send_frame(&self, payload: &[u8]) {
            self.payloads.lock().unwrap().push(payload.to_vec());
        }

        fn counts(&self) -> TransportCounts {
            let sent = self.payloads.lock().unwrap().len() as u64;
            TransportCounts {
                sent,
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_frame_bytes_pass_through_unchanged() {
        let recording = Recording::default();
        let relay = Relay::new(vec![Box::new(recording.clone())]);

        let data: Vec<u8> = (0..=255).collect();
        relay.handle_frame(&Frame::new(data.clone(), 16, 16, 1));

        assert_eq!(*recording.payloads.lock().unwrap(), vec![data]);
    }

    #[test]
    fn test_every_transport_receives_frame() {
        let first = Recording::default();
        let second = Recording::default();
        let relay = Relay::new(vec![Box::new(first.clone()), Box::new(second.clone())]);

        relay.handle_frame(&Frame::new(vec![9u8; 4], 2, 2, 1));
        relay.handle_frame(&Frame::new(vec![8u8; 4], 2, 2, 2));

        assert_eq!(first.payloads.lock().unwrap().len(), 2);
        assert_eq!(second.payloads.lock().unwrap().len(), 2);
        assert_eq!(relay.counts_for("recording").unwrap().sent, 2);
    }

    #[test]
    fn test_luma_tracking() {
        let relay = Relay::new(Vec::new()).with_luma_tracking();
        assert_eq!(relay.last_luma(), None);

        relay.handle_frame(&Frame::new(vec![64u8; 4], 2, 2, 1));
        assert_eq!(relay.last_luma(), Some(64.0));
    }

    #[test]
    fn test_from_config_selects_transports() {
        let config = TransportConfig {
            mode: TransportMode::Both,
            udp_target: "127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let relay = Relay::from_config(&config).unwrap();

        let names: Vec<_> = relay.counts().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["http", "udp"]);
        relay.close();
    }

    #[test]
    fn test_from_config_rejects_bad_target() {
        let config = TransportConfig {
            mode: TransportMode::Udp,
            udp_target: "nowhere".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Relay::from_config(&config),
            Err(ConfigError::InvalidTarget(_))
        ));
    }
}
