//! Camera abstraction for frame capture.
//!
//! The camera is an external collaborator. This trait lets the producer
//! drive real hardware or a synthetic source interchangeably.

use super::{CaptureConfig, Frame};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// No camera matches the requested device.
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    /// The device exists but could not be opened.
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    /// The requested format or settings were rejected.
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    /// A single frame could not be read.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// `capture` was called before `open`.
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for camera implementations.
pub trait Camera {
    /// Opens and initializes the camera with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures a single frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

/// Synthetic camera producing deterministic frames.
///
/// Each frame is filled with a gradient shifted by its sequence number,
/// so consecutive frames differ and payloads are easy to check.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
}

impl MockCamera {
    /// Creates a closed mock camera.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!("MockCamera opened with config: {:?}", config);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;

        self.sequence += 1;
        let data: Vec<u8> = (0..config.frame_len())
            .map(|i| ((i as u64).wrapping_add(self.sequence) % 256) as u8)
            .collect();

        Ok(Frame::with_format(
            data,
            config.width,
            config.height,
            config.format,
            self.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            tracing::info!("MockCamera closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelFormat;

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig::default();

        assert!(!camera.is_open());

        camera.open(&config).unwrap();
        assert!(camera.is_open());

        let frame = camera.capture().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.capture().unwrap();
        assert_eq!(frame2.sequence(), 2);
        assert_ne!(frame.data(), frame2.data());

        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(camera.capture(), Err(CameraError::NotInitialized)));
    }

    #[test]
    fn test_mock_camera_honors_format() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig {
            width: 8,
            height: 4,
            format: PixelFormat::Yuv420,
            ..Default::default()
        };
        camera.open(&config).unwrap();

        let frame = camera.capture().unwrap();
        assert_eq!(frame.format(), PixelFormat::Yuv420);
        assert_eq!(frame.len(), 48);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig::with_dimensions(0, 480);
        assert!(matches!(
            camera.open(&config),
            Err(CameraError::ConfigFailed(_))
        ));
        assert!(!camera.is_open());
    }
}
