//! Frame Relay CLI
//!
//! Captures frames and relays them to a remote server until the frame
//! budget is spent or the process is interrupted.

use clap::{Parser, ValueEnum};
use frame_relay::{
    capture::{CameraError, CaptureConfig, Frame, FrameProducer, MockCamera},
    config::{ConfigError, FileConfig, TransportMode},
    metrics::{MetricsRegistry, MetricsSnapshot},
    transport::MAX_DATAGRAM_PAYLOAD,
    Relay,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CameraKind {
    /// Synthetic frames, no hardware needed.
    Mock,
    /// Platform camera (requires the `camera` feature).
    Native,
}

/// Relay camera frames to a remote server over HTTP and UDP.
#[derive(Debug, Parser)]
#[command(name = "frame-relay", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frame source.
    #[arg(long, value_enum, default_value_t = CameraKind::Mock)]
    camera: CameraKind,

    /// Transports to send each frame through.
    #[arg(short, long, value_enum)]
    mode: Option<TransportMode>,

    /// Upload endpoint for HTTP mode.
    #[arg(long)]
    http_url: Option<String>,

    /// Datagram destination (`host:port`) for UDP mode.
    #[arg(long)]
    udp_target: Option<String>,

    /// Stop after relaying this many frames.
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// Run until interrupted.
    #[arg(long)]
    continuous: bool,

    /// Port for the Prometheus exporter (0 disables it).
    #[arg(long)]
    metrics_port: Option<u16>,
}

impl Cli {
    fn load_config(&self) -> Result<FileConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.transport.mode = mode;
        }
        if let Some(url) = &self.http_url {
            config.transport.http_url = url.clone();
        }
        if let Some(target) = &self.udp_target {
            config.transport.udp_target = target.clone();
        }
        if let Some(frames) = self.frames {
            config.output.frame_count = frames;
            config.output.continuous = false;
        }
        if self.continuous {
            config.output.continuous = true;
        }
        if let Some(port) = self.metrics_port {
            config.output.metrics_port = port;
        }

        config.validate()?;
        Ok(config)
    }
}

fn start_producer<A>(
    kind: CameraKind,
    config: CaptureConfig,
    analyzer: A,
) -> Result<FrameProducer, CameraError>
where
    A: FnMut(&Frame) + Send + 'static,
{
    match kind {
        CameraKind::Mock => FrameProducer::start(MockCamera::new, config, analyzer),
        #[cfg(feature = "camera")]
        CameraKind::Native => {
            FrameProducer::start(frame_relay::capture::NativeCamera::new, config, analyzer)
        }
        #[cfg(not(feature = "camera"))]
        CameraKind::Native => Err(CameraError::DeviceNotFound(
            "native camera support not compiled in (enable the `camera` feature)".to_string(),
        )),
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Frame Relay v{}", frame_relay::VERSION);

    let mut relay = match Relay::from_config(&config.transport) {
        Ok(relay) => relay,
        Err(e) => {
            eprintln!("Failed to set up transports: {}", e);
            std::process::exit(1);
        }
    };
    if config.output.track_luma {
        relay = relay.with_luma_tracking();
    }
    let relay = Arc::new(relay);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::Release)) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }
    }

    let registry = match MetricsRegistry::new() {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };

    #[cfg(feature = "metrics")]
    let exporter = if config.output.metrics_port != 0 {
        use frame_relay::metrics::{MetricsServer, MetricsServerConfig};
        let server = MetricsServer::new(
            MetricsServerConfig::with_port(config.output.metrics_port),
            Arc::clone(&registry),
        );
        match server.spawn() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Metrics server unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    if config.transport.mode.uses_udp() && config.capture.frame_len() > MAX_DATAGRAM_PAYLOAD {
        warn!(
            frame_bytes = config.capture.frame_len(),
            max = MAX_DATAGRAM_PAYLOAD,
            "Frames exceed the datagram limit; UDP sends will fail until the resolution is reduced"
        );
    }

    let limit = (!config.output.continuous).then_some(config.output.frame_count);
    let relayed = Arc::new(AtomicU64::new(0));

    let analyzer = {
        let relay = Arc::clone(&relay);
        let relayed = Arc::clone(&relayed);
        move |frame: &Frame| {
            if limit.map_or(false, |max| relayed.load(Ordering::Relaxed) >= max) {
                return;
            }
            relay.handle_frame(frame);
            relayed.fetch_add(1, Ordering::Relaxed);
        }
    };

    let mut producer = match start_producer(cli.camera, config.capture.clone(), analyzer) {
        Ok(producer) => producer,
        Err(e) => {
            eprintln!("Failed to open camera: {}", e);
            std::process::exit(1);
        }
    };

    match limit {
        Some(max) => info!("Relaying {} frames ({:?} mode)", max, config.transport.mode),
        None => info!("Relaying until interrupted ({:?} mode)", config.transport.mode),
    }

    let report_interval = Duration::from_secs(config.output.report_interval_secs.max(1));
    let mut last_report = Instant::now();

    while running.load(Ordering::Acquire) && producer.is_running() {
        if limit.map_or(false, |max| relayed.load(Ordering::Relaxed) >= max) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));

        if last_report.elapsed() >= report_interval {
            let stats = producer.stats();
            registry.update(&MetricsSnapshot::from_components(stats, &relay));
            info!(
                captured = stats.captured,
                dropped = stats.dropped,
                relayed = relayed.load(Ordering::Relaxed),
                "Relay progress"
            );
            last_report = Instant::now();
        }
    }

    producer.stop();
    relay.close();

    let stats = producer.stats();
    registry.update(&MetricsSnapshot::from_components(stats, &relay));

    info!(
        "Captured {} frames: {} relayed, {} dropped, {} capture failures",
        stats.captured,
        relayed.load(Ordering::Relaxed),
        stats.dropped,
        stats.capture_failures
    );
    for (name, counts) in relay.counts() {
        info!(
            "{}: {} sent, {} failed, {} dropped, {} bytes",
            name, counts.sent, counts.failed, counts.dropped, counts.bytes_sent
        );
    }
    if let Some(luma) = relay.last_luma() {
        info!("Last frame mean luma: {:.1}", luma);
    }

    #[cfg(feature = "metrics")]
    if let Some(handle) = exporter {
        if let Err(e) = handle.stop() {
            warn!("Metrics server stopped with error: {}", e);
        }
    }

    info!("Done.");
}
