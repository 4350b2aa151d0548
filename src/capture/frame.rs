//! Frame type representing a captured image with metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// One byte per pixel, brightness only.
    Luma8,
    /// Three bytes per pixel, interleaved RGB.
    Rgb8,
    /// Planar YUV 4:2:0: a full-resolution Y plane followed by
    /// quarter-resolution U and V planes.
    Yuv420,
}

impl PixelFormat {
    /// Returns the buffer size in bytes for a frame of the given dimensions.
    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        let pixels = (width as usize) * (height as usize);
        match self {
            PixelFormat::Luma8 => pixels,
            PixelFormat::Rgb8 => pixels * 3,
            PixelFormat::Yuv420 => pixels + pixels / 2,
        }
    }
}

/// A single captured frame from the camera.
///
/// The analyzer owns a frame for the duration of one callback; the buffer
/// is released when the frame is dropped at the end of that callback.
#[derive(Clone)]
pub struct Frame {
    /// Raw frame bytes, laid out according to `format`.
    data: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Pixel layout of `data`.
    format: PixelFormat,
    /// Monotonic capture time.
    timestamp: Instant,
    /// Wall-clock capture time.
    captured_at: DateTime<Utc>,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new single-channel frame.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self::with_format(data, width, height, PixelFormat::Luma8, sequence)
    }

    /// Creates a new frame with an explicit pixel format.
    pub fn with_format(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        Self {
            data,
            width,
            height,
            format,
            timestamp: Instant::now(),
            captured_at: Utc::now(),
            sequence,
        }
    }

    /// Returns the raw frame bytes exactly as captured.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the frame and returns its buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel layout of the buffer.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the monotonic capture time.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the wall-clock capture time.
    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Returns the frame sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the number of bytes in the frame buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the frame buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the brightness plane, if the format carries one.
    ///
    /// For `Yuv420` this is the leading Y plane; `Rgb8` has no separate
    /// luma plane and yields `None`.
    pub fn luma_plane(&self) -> Option<&[u8]> {
        match self.format {
            PixelFormat::Luma8 => Some(&self.data),
            PixelFormat::Yuv420 => {
                let plane = (self.width as usize) * (self.height as usize);
                self.data.get(..plane)
            }
            PixelFormat::Rgb8 => None,
        }
    }

    /// Validates that the buffer size matches dimensions and format.
    pub fn is_valid(&self) -> bool {
        self.data.len() == self.format.buffer_len(self.width, self.height)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(vec![0u8; 640 * 480], 640, 480, 1);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.format(), PixelFormat::Luma8);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let frame = Frame::new(vec![0u8; 100], 640, 480, 1);
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_yuv_luma_plane() {
        let mut data = vec![7u8; 4 * 2];
        data.extend_from_slice(&[200u8; 4]);
        let frame = Frame::with_format(data, 4, 2, PixelFormat::Yuv420, 1);

        assert!(frame.is_valid());
        assert_eq!(frame.luma_plane(), Some(&[7u8; 8][..]));
    }

    #[test]
    fn test_rgb_has_no_luma_plane() {
        let frame = Frame::with_format(vec![0u8; 12], 2, 2, PixelFormat::Rgb8, 1);
        assert!(frame.is_valid());
        assert!(frame.luma_plane().is_none());
    }

    #[test]
    fn test_truncated_yuv_luma_plane() {
        let frame = Frame::with_format(vec![0u8; 3], 4, 2, PixelFormat::Yuv420, 1);
        assert!(frame.luma_plane().is_none());
    }
}
