//! HTTP exporter for the Prometheus endpoint.

use crate::metrics::MetricsRegistry;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;

/// Errors that can occur while running the exporter.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address or runtime could not be set up.
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    /// The server failed while running.
    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    /// Listens on all interfaces at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// Serves `/metrics` and `/health` from a shared registry.
///
/// Prometheus metrics are internally synchronized, so the relay updates
/// the same registry the handlers read without extra locking.
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: Arc<MetricsRegistry>,
}

/// Handle to an exporter running on its own thread.
pub struct BackgroundServer {
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<Result<(), ServerError>>>,
}

impl MetricsServer {
    /// Creates a server reading from `registry`.
    pub fn new(config: MetricsServerConfig, registry: Arc<MetricsRegistry>) -> Self {
        Self { config, registry }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.registry))
    }

    /// Serves until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(addr = %listener.local_addr()?, "Metrics server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))
    }

    /// Starts the server on a dedicated thread with its own runtime.
    ///
    /// The relay itself is synchronous; this keeps the async runtime
    /// confined to the exporter.
    pub fn spawn(self) -> Result<BackgroundServer, ServerError> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name("metrics-server".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .enable_all()
                    .build()?;
                runtime.block_on(self.run_until(async move {
                    let _ = shutdown_rx.await;
                }))
            })?;

        Ok(BackgroundServer {
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }
}

impl BackgroundServer {
    /// Signals shutdown and waits for in-flight requests to finish.
    pub fn stop(mut self) -> Result<(), ServerError> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ServerError::Server("metrics thread panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for BackgroundServer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown_and_join() {
            tracing::warn!("Metrics server stopped with error: {}", e);
        }
    }
}

async fn metrics_handler(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    match registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    #[test]
    fn test_config_default() {
        assert_eq!(MetricsServerConfig::default().bind_addr.port(), 9090);
    }

    #[test]
    fn test_config_with_port() {
        assert_eq!(MetricsServerConfig::with_port(8080).bind_addr.port(), 8080);
    }

    #[test]
    fn test_background_server_serves_metrics() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        let server = MetricsServer::new(
            MetricsServerConfig {
                bind_addr: ([127, 0, 0, 1], port).into(),
            },
            Arc::clone(&registry),
        )
        .spawn()
        .unwrap();

        let mut stream = None;
        for _ in 0..50 {
            match TcpStream::connect(("127.0.0.1", port)) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(_) => thread::sleep(Duration::from_millis(20)),
            }
        }
        let mut stream = stream.expect("metrics server did not start");
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("frame_relay_frames_captured_total"));

        server.stop().unwrap();
    }
}
