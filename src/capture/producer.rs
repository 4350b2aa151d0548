//! Frame delivery on a dedicated analyzer thread.
//!
//! Capture and analysis run on separate threads joined by a single-slot
//! channel. A frame waiting in the slot is replaced when a newer one
//! arrives, so a slow analyzer sees only the latest frame and the
//! replaced frames are counted as dropped.

use super::{Camera, CameraError, CaptureConfig, Frame};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Consecutive capture failures after which the producer gives up.
pub const MAX_CONSECUTIVE_CAPTURE_FAILURES: u32 = 30;

/// How often the analyzer thread re-checks the stop flag while idle.
const ANALYZER_POLL: Duration = Duration::from_millis(100);

/// Counters shared between the producer threads.
#[derive(Debug, Default)]
pub struct ProducerStats {
    captured: AtomicU64,
    dropped: AtomicU64,
    analyzed: AtomicU64,
    capture_failures: AtomicU64,
}

/// Point-in-time copy of [`ProducerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerCounts {
    /// Frames successfully captured.
    pub captured: u64,
    /// Frames replaced in the slot before the analyzer took them.
    pub dropped: u64,
    /// Frames handed to the analyzer callback.
    pub analyzed: u64,
    /// Failed capture attempts.
    pub capture_failures: u64,
}

impl ProducerStats {
    /// Returns the current counter values.
    pub fn snapshot(&self) -> ProducerCounts {
        ProducerCounts {
            captured: self.captured.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            analyzed: self.analyzed.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
        }
    }
}

/// Single-slot hand-off that keeps only the most recent frame.
struct LatestSlot {
    tx: Sender<Frame>,
    // Held by the producing side so it can evict a stale frame.
    evict: Receiver<Frame>,
}

impl LatestSlot {
    fn new() -> (Self, Receiver<Frame>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let slot = Self {
            tx,
            evict: rx.clone(),
        };
        (slot, rx)
    }

    /// Offers a frame, replacing any pending one.
    ///
    /// Returns the number of frames dropped to make room.
    fn offer(&self, frame: Frame) -> u64 {
        let mut dropped = 0;
        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return dropped,
                Err(TrySendError::Full(returned)) => {
                    frame = returned;
                    // Empty means the analyzer took it between our two calls.
                    if let Ok(stale) = self.evict.try_recv() {
                        tracing::trace!(sequence = stale.sequence(), "Dropped stale frame");
                        dropped += 1;
                    }
                }
                // Unreachable while `evict` is held.
                Err(TrySendError::Disconnected(_)) => return dropped + 1,
            }
        }
    }
}

/// Drives a camera and delivers frames to an analyzer callback.
///
/// The camera is opened on the capture thread itself, so camera handles
/// that cannot cross threads are supported.
pub struct FrameProducer {
    running: Arc<AtomicBool>,
    stats: Arc<ProducerStats>,
    capture_thread: Option<JoinHandle<()>>,
    analyzer_thread: Option<JoinHandle<()>>,
}

impl FrameProducer {
    /// Opens a camera via `open_camera` and starts delivering frames.
    ///
    /// Returns once the camera has opened, or with the open error.
    pub fn start<C, O, A>(
        open_camera: O,
        config: CaptureConfig,
        mut analyzer: A,
    ) -> Result<Self, CameraError>
    where
        C: Camera + 'static,
        O: FnOnce() -> C + Send + 'static,
        A: FnMut(&Frame) + Send + 'static,
    {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;

        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(ProducerStats::default());
        let (slot, frames) = LatestSlot::new();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), CameraError>>(1);

        let capture_thread = {
            let running = Arc::clone(&running);
            let stats = Arc::clone(&stats);
            let config = config.clone();
            thread::Builder::new()
                .name("frame-capture".to_string())
                .spawn(move || {
                    let mut camera = open_camera();
                    if let Err(e) = camera.open(&config) {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                    let _ = ready_tx.send(Ok(()));
                    capture_loop(&mut camera, &config, &slot, &running, &stats);
                    camera.close();
                })
                .map_err(|e| CameraError::OpenFailed(format!("spawn capture thread: {}", e)))?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = capture_thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = capture_thread.join();
                return Err(CameraError::OpenFailed(
                    "capture thread exited before opening the camera".to_string(),
                ));
            }
        }

        let analyzer_thread = {
            let analyzer_running = Arc::clone(&running);
            let stats = Arc::clone(&stats);
            let spawned = thread::Builder::new()
                .name("frame-analyzer".to_string())
                .spawn(move || loop {
                    match frames.recv_timeout(ANALYZER_POLL) {
                        Ok(frame) => {
                            analyzer(&frame);
                            stats.analyzed.fetch_add(1, Ordering::Relaxed);
                            // `frame` is released here, before the next one is taken.
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if !analyzer_running.load(Ordering::Acquire) {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                });
            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    running.store(false, Ordering::Release);
                    let _ = capture_thread.join();
                    return Err(CameraError::OpenFailed(format!(
                        "spawn analyzer thread: {}",
                        e
                    )));
                }
            }
        };

        tracing::info!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            "Frame producer started"
        );

        Ok(Self {
            running,
            stats,
            capture_thread: Some(capture_thread),
            analyzer_thread: Some(analyzer_thread),
        })
    }

    /// Returns the current counters.
    pub fn stats(&self) -> ProducerCounts {
        self.stats.snapshot()
    }

    /// Returns true while the capture thread is still producing frames.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops capture, waits for the analyzer to finish its current frame,
    /// and closes the camera.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.capture_thread.take() {
            if handle.join().is_err() {
                tracing::error!("Capture thread panicked");
            }
        }
        if let Some(handle) = self.analyzer_thread.take() {
            if handle.join().is_err() {
                tracing::error!("Analyzer thread panicked");
            }
        }
    }
}

impl Drop for FrameProducer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop<C: Camera>(
    camera: &mut C,
    config: &CaptureConfig,
    slot: &LatestSlot,
    running: &AtomicBool,
    stats: &ProducerStats,
) {
    let interval = Duration::from_secs_f64(1.0 / f64::from(config.fps));
    let mut next_deadline = Instant::now();
    let mut consecutive_failures = 0u32;

    while running.load(Ordering::Acquire) {
        match camera.capture() {
            Ok(frame) => {
                consecutive_failures = 0;
                stats.captured.fetch_add(1, Ordering::Relaxed);
                let dropped = slot.offer(frame);
                stats.dropped.fetch_add(dropped, Ordering::Relaxed);
            }
            Err(e) => {
                consecutive_failures += 1;
                stats.capture_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Frame capture failed: {}", e);
                if consecutive_failures >= MAX_CONSECUTIVE_CAPTURE_FAILURES {
                    tracing::error!(
                        failures = consecutive_failures,
                        "Too many consecutive capture failures, stopping"
                    );
                    break;
                }
            }
        }

        next_deadline += interval;
        let now = Instant::now();
        if next_deadline > now {
            thread::sleep(next_deadline - now);
        } else {
            // Fell behind; pace from now instead of bursting to catch up.
            next_deadline = now;
        }
    }

    running.store(false, Ordering::Release);
    tracing::debug!("Capture loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockCamera;
    use std::sync::Mutex;

    fn small_config(fps: u32) -> CaptureConfig {
        CaptureConfig {
            width: 8,
            height: 8,
            fps,
            ..Default::default()
        }
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_latest_slot_replaces_pending_frame() {
        let (slot, rx) = LatestSlot::new();

        assert_eq!(slot.offer(Frame::new(vec![1], 1, 1, 1)), 0);
        assert_eq!(slot.offer(Frame::new(vec![2], 1, 1, 2)), 1);
        assert_eq!(slot.offer(Frame::new(vec![3], 1, 1, 3)), 1);

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.sequence(), 3);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_producer_delivers_frames_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut producer = FrameProducer::start(MockCamera::new, small_config(120), move |frame| {
            sink.lock().unwrap().push(frame.sequence());
        })
        .unwrap();

        wait_for(|| producer.stats().analyzed >= 5);
        producer.stop();

        let seen = seen.lock().unwrap();
        assert!(seen.len() >= 5);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));

        let stats = producer.stats();
        assert_eq!(stats.analyzed as usize, seen.len());
        assert!(stats.captured >= stats.analyzed);
    }

    #[test]
    fn test_slow_analyzer_drops_frames() {
        let mut producer = FrameProducer::start(MockCamera::new, small_config(120), |_frame| {
            thread::sleep(Duration::from_millis(50));
        })
        .unwrap();

        wait_for(|| producer.stats().dropped > 0);
        producer.stop();

        let stats = producer.stats();
        assert!(stats.dropped > 0);
        assert!(stats.analyzed < stats.captured);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = FrameProducer::start(MockCamera::new, small_config(0), |_frame| {});
        assert!(matches!(result, Err(CameraError::ConfigFailed(_))));
    }

    struct UnpluggedCamera;

    impl Camera for UnpluggedCamera {
        fn open(&mut self, _config: &CaptureConfig) -> Result<(), CameraError> {
            Err(CameraError::DeviceNotFound("camera 0".to_string()))
        }

        fn capture(&mut self) -> Result<Frame, CameraError> {
            Err(CameraError::NotInitialized)
        }

        fn is_open(&self) -> bool {
            false
        }

        fn close(&mut self) {}
    }

    #[test]
    fn test_camera_open_failure_is_reported() {
        let analyzed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&analyzed);

        let result = FrameProducer::start(|| UnpluggedCamera, small_config(30), move |_frame| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        match result {
            Err(CameraError::DeviceNotFound(device)) => assert_eq!(device, "camera 0"),
            other => panic!("expected DeviceNotFound, got {:?}", other.map(|_| ())),
        }
        assert_eq!(analyzed.load(Ordering::Relaxed), 0);
    }

    struct BrokenCamera;

    impl Camera for BrokenCamera {
        fn open(&mut self, _config: &CaptureConfig) -> Result<(), CameraError> {
            Ok(())
        }

        fn capture(&mut self) -> Result<Frame, CameraError> {
            Err(CameraError::CaptureFailed("sensor unplugged".to_string()))
        }

        fn is_open(&self) -> bool {
            true
        }

        fn close(&mut self) {}
    }

    #[test]
    fn test_repeated_capture_failures_stop_producer() {
        let mut producer =
            FrameProducer::start(|| BrokenCamera, small_config(120), |_frame| {}).unwrap();

        wait_for(|| !producer.is_running());
        producer.stop();

        let stats = producer.stats();
        assert_eq!(
            stats.capture_failures,
            u64::from(MAX_CONSECUTIVE_CAPTURE_FAILURES)
        );
        assert_eq!(stats.analyzed, 0);
    }
}
