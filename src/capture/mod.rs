//! Camera input and frame delivery.
//!
//! This module wraps the external camera behind the [`Camera`] trait and
//! delivers captured frames to an analyzer callback on a dedicated thread.

mod camera;
mod config;
mod frame;
#[cfg(feature = "camera")]
mod native;
mod producer;

pub use camera::{Camera, CameraError, MockCamera};
pub use config::{CaptureConfig, MAX_FPS};
pub use frame::{Frame, PixelFormat};
#[cfg(feature = "camera")]
pub use native::NativeCamera;
pub use producer::{FrameProducer, ProducerCounts, ProducerStats, MAX_CONSECUTIVE_CAPTURE_FAILURES};
