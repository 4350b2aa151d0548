//! Configuration file format.
//!
//! Every field has a default, and the defaults reproduce the relay's
//! built-in endpoints, so the program runs without a file.

use crate::capture::CaptureConfig;
use crate::transport::TransportTarget;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default upload endpoint.
pub const DEFAULT_HTTP_URL: &str = "http://192.168.100.3:5000/receive_image";

/// Default datagram destination.
pub const DEFAULT_UDP_TARGET: &str = "192.168.100.3:5005";

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Frame rate is zero or above the maximum.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// The upload endpoint is not a usable http(s) URL.
    #[error("invalid http url {url:?}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The datagram destination is not `host:port`.
    #[error("invalid udp target: {0}")]
    InvalidTarget(String),
    /// UDP queue depth is zero.
    #[error("udp queue depth must be at least 1")]
    InvalidQueueDepth,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Which transports each frame is sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// One POST per frame.
    #[default]
    Http,
    /// One datagram per frame.
    Udp,
    /// A POST and a datagram per frame.
    Both,
}

impl TransportMode {
    /// Returns true if frames are posted over HTTP.
    pub fn uses_http(self) -> bool {
        matches!(self, TransportMode::Http | TransportMode::Both)
    }

    /// Returns true if frames are sent as datagrams.
    pub fn uses_udp(self) -> bool {
        matches!(self, TransportMode::Udp | TransportMode::Both)
    }
}

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Transports to send each frame through.
    pub mode: TransportMode,
    /// Endpoint receiving HTTP POST uploads.
    pub http_url: String,
    /// Round-trip timeout for one upload in milliseconds (0 for none).
    pub http_timeout_ms: u64,
    /// Datagram destination as `host:port`.
    pub udp_target: String,
    /// Frames the UDP worker may hold before new ones are dropped.
    pub udp_queue_depth: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Http,
            http_url: DEFAULT_HTTP_URL.to_string(),
            http_timeout_ms: 10_000,
            udp_target: DEFAULT_UDP_TARGET.to_string(),
            udp_queue_depth: 64,
        }
    }
}

impl TransportConfig {
    /// Returns the upload timeout, if one is set.
    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_ms > 0).then(|| Duration::from_millis(self.http_timeout_ms))
    }

    /// Parses the UDP destination.
    pub fn udp_target(&self) -> Result<TransportTarget, ConfigError> {
        self.udp_target
            .parse()
            .map_err(|e: crate::transport::TransportError| ConfigError::InvalidTarget(e.to_string()))
    }

    /// Validates the fields used by the configured mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode.uses_http() {
            let url = url::Url::parse(&self.http_url).map_err(|e| ConfigError::InvalidUrl {
                url: self.http_url.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl {
                    url: self.http_url.clone(),
                    reason: format!("unsupported scheme {}", url.scheme()),
                });
            }
        }
        if self.mode.uses_udp() {
            self.udp_target()?;
            if self.udp_queue_depth == 0 {
                return Err(ConfigError::InvalidQueueDepth);
            }
        }
        Ok(())
    }
}

/// Output and lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Run until interrupted (true) or stop after `frame_count` frames.
    pub continuous: bool,
    /// Frames to relay if not continuous.
    pub frame_count: u64,
    /// Record the mean luma of each frame.
    pub track_luma: bool,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
    /// Seconds between progress log lines.
    pub report_interval_secs: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            frame_count: 100,
            track_luma: true,
            metrics_port: 9090,
            report_interval_secs: 5,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Camera settings.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Where and how frames are sent.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Run length and reporting.
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.transport.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelFormat;

    #[test]
    fn test_defaults_are_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transport.http_url, DEFAULT_HTTP_URL);
        assert_eq!(config.transport.mode, TransportMode::Http);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [transport]
            mode = "both"
            udp_target = "10.0.0.2:6000"

            [capture]
            fps = 15
            format = "yuv420"
            "#,
        )
        .unwrap();

        assert_eq!(config.transport.mode, TransportMode::Both);
        assert_eq!(config.transport.udp_target().unwrap().port(), 6000);
        assert_eq!(config.transport.http_url, DEFAULT_HTTP_URL);
        assert_eq!(config.capture.fps, 15);
        assert_eq!(config.capture.width, 640);
        assert_eq!(config.capture.format, PixelFormat::Yuv420);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(FileConfig::from_toml("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_invalid_udp_target_rejected_only_when_used() {
        let mut config = FileConfig::default();
        config.transport.udp_target = "no-port".to_string();
        assert!(config.validate().is_ok());

        config.transport.mode = TransportMode::Udp;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_udp_target_text_parses_to_target() {
        let config = FileConfig::from_toml(
            r#"
            [transport]
            mode = "udp"
            udp_target = "[::1]:5005"
            "#,
        )
        .unwrap();

        let target = config.transport.udp_target().unwrap();
        assert_eq!(target.host(), "::1");
        assert_eq!(target.port(), 5005);
        assert_eq!(target.to_string(), config.transport.udp_target);

        assert!(matches!(
            FileConfig::from_toml("[transport]\nmode = \"udp\"\nudp_target = \"::1:5005\""),
            Err(ConfigError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_invalid_http_url_rejected() {
        let mut config = FileConfig::default();
        config.transport.http_url = "udp://192.168.100.3:5000".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_unknown_field_type_is_parse_error() {
        assert!(matches!(
            FileConfig::from_toml("[capture]\nfps = \"fast\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let mut config = TransportConfig::default();
        assert_eq!(config.http_timeout(), Some(Duration::from_secs(10)));
        config.http_timeout_ms = 0;
        assert_eq!(config.http_timeout(), None);
    }
}
