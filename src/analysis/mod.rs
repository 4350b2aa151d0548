//! Per-frame image analysis.
//!
//! Lightweight measurements taken on the analyzer thread before a frame
//! is handed to the transports. They never modify the frame.

mod luma;

pub use luma::{mean_luma, LumaTracker};
