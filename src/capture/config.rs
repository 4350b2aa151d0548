//! Camera capture configuration.

use super::PixelFormat;
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Highest frame rate the producer will pace to.
pub const MAX_FPS: u32 = 120;

/// Configuration for camera capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index.
    pub device_id: u32,
    /// Target frame width in pixels.
    pub width: u32,
    /// Target frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Pixel format requested from the camera.
    pub format: PixelFormat,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
            format: PixelFormat::Luma8,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }

    /// Returns the expected buffer size of one frame.
    pub fn frame_len(&self) -> usize {
        self.format.buffer_len(self.width, self.height)
    }
}
