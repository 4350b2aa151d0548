//! Hardware camera backed by `nokhwa`.

use super::{Camera, CameraError, CaptureConfig, Frame, PixelFormat};
use nokhwa::{
    pixel_format::{LumaFormat, RgbFormat},
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
        Resolution,
    },
};

/// A platform camera opened through the native backend.
///
/// The underlying device handle is not `Send`; open it on the thread
/// that captures from it (see [`super::FrameProducer::start`]).
#[derive(Default)]
pub struct NativeCamera {
    device: Option<nokhwa::Camera>,
    format: Option<PixelFormat>,
    sequence: u64,
}

impl NativeCamera {
    /// Creates a handle for the device chosen at `open`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Camera for NativeCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::MJPEG,
                config.fps,
            ),
        ));

        let mut device = nokhwa::Camera::new(CameraIndex::Index(config.device_id), requested)
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;
        device
            .open_stream()
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;

        tracing::info!(
            device = config.device_id,
            width = device.resolution().width(),
            height = device.resolution().height(),
            fps = device.frame_rate(),
            "Native camera opened"
        );

        self.device = Some(device);
        self.format = Some(config.format);
        self.sequence = 0;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let device = self.device.as_mut().ok_or(CameraError::NotInitialized)?;
        let format = self.format.unwrap_or(PixelFormat::Luma8);

        let buffer = device
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        let (data, width, height) = match format {
            PixelFormat::Luma8 => {
                let image = buffer
                    .decode_image::<LumaFormat>()
                    .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
                let (w, h) = (image.width(), image.height());
                (image.into_raw(), w, h)
            }
            PixelFormat::Rgb8 => {
                let image = buffer
                    .decode_image::<RgbFormat>()
                    .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
                let (w, h) = (image.width(), image.height());
                (image.into_raw(), w, h)
            }
            PixelFormat::Yuv420 => {
                return Err(CameraError::ConfigFailed(
                    "native backend does not decode yuv420".to_string(),
                ))
            }
        };

        self.sequence += 1;
        Ok(Frame::with_format(data, width, height, format, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.stop_stream() {
                tracing::warn!("Failed to stop camera stream: {}", e);
            }
            tracing::info!("Native camera closed");
        }
    }
}

impl Drop for NativeCamera {
    fn drop(&mut self) {
        self.close();
    }
}
