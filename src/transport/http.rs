//! Blocking HTTP POST of raw frame bytes.

use super::{FrameTransport, TransportCounts, TransportError, TransportStats};
use std::time::Duration;
use url::Url;

/// Content type of every frame upload.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Endpoint that receives each frame as a POST body.
    pub url: String,
    /// Upper bound on one round trip. `None` leaves it to the client default.
    pub timeout: Option<Duration>,
}

impl HttpTransportConfig {
    /// Creates a config for `url` with no explicit timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }
}

/// Uploads each frame with a single POST on the calling thread.
///
/// One agent is kept for the transport's lifetime so connections are
/// reused across frames. Each call still issues exactly one request.
pub struct HttpTransport {
    agent: ureq::Agent,
    url: Url,
    stats: TransportStats,
}

impl HttpTransport {
    /// Creates a transport posting to `url` with client default timeouts.
    pub fn new(url: &str) -> Result<Self, TransportError> {
        Self::with_config(HttpTransportConfig::new(url))
    }

    /// Creates a transport from `config`.
    ///
    /// Fails if the URL is malformed or not http(s).
    pub fn with_config(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let url = Url::parse(&config.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::UnsupportedScheme(url.scheme().to_string()));
        }

        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            agent: builder.build(),
            url,
            stats: TransportStats::default(),
        })
    }

    /// Returns the endpoint frames are posted to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Posts `frame_bytes` and blocks until the server answers.
    ///
    /// Any failure is logged and counted; nothing is returned to the caller.
    pub fn send_over_http(&self, frame_bytes: &[u8]) {
        if let Err(e) = self.try_send(frame_bytes) {
            tracing::warn!(url = %self.url, bytes = frame_bytes.len(), "HTTP frame send failed: {}", e);
        }
    }

    /// Posts `frame_bytes`, returning the cause of any failure.
    pub fn try_send(&self, frame_bytes: &[u8]) -> Result<(), TransportError> {
        match self.post(frame_bytes) {
            Ok(()) => {
                self.stats.record_sent(frame_bytes.len());
                tracing::trace!(bytes = frame_bytes.len(), "Frame posted");
                Ok(())
            }
            Err(e) => {
                self.stats.record_failure();
                Err(e)
            }
        }
    }

    fn post(&self, frame_bytes: &[u8]) -> Result<(), TransportError> {
        let response = self
            .agent
            .post(self.url.as_str())
            .set("Content-Type", OCTET_STREAM)
            .send_bytes(frame_bytes)
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => TransportError::HttpStatus(code),
                other => TransportError::Http(other.to_string()),
            })?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(TransportError::HttpStatus(status));
        }
        Ok(())
    }
}

impl FrameTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn send_frame(&self, payload: &[u8]) {
        self.send_over_http(payload);
    }

    fn counts(&self) -> TransportCounts {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url.as_str())
            .field("counts", &self.stats.snapshot())
            .finish()
    }
}
