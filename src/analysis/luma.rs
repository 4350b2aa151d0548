//! Mean luminosity of captured frames.

use crate::capture::Frame;
use std::sync::atomic::{AtomicU64, Ordering};

/// Returns the average brightness (0-255) of the frame's luma plane.
///
/// `None` when the frame has no luma plane or it is empty.
pub fn mean_luma(frame: &Frame) -> Option<f64> {
    let plane = frame.luma_plane()?;
    if plane.is_empty() {
        return None;
    }
    let sum: u64 = plane.iter().map(|&b| u64::from(b)).sum();
    Some(sum as f64 / plane.len() as f64)
}

/// Holds the most recent luma reading, readable from any thread.
#[derive(Debug)]
pub struct LumaTracker {
    // f64 bits; NaN until the first reading.
    last: AtomicU64,
    samples: AtomicU64,
}

impl Default for LumaTracker {
    fn default() -> Self {
        Self {
            last: AtomicU64::new(f64::NAN.to_bits()),
            samples: AtomicU64::new(0),
        }
    }
}

impl LumaTracker {
    /// Creates a tracker with no samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes and records the luma of `frame`, returning it.
    pub fn observe(&self, frame: &Frame) -> Option<f64> {
        let luma = mean_luma(frame)?;
        self.last.store(luma.to_bits(), Ordering::Relaxed);
        self.samples.fetch_add(1, Ordering::Relaxed);
        Some(luma)
    }

    /// Returns the last recorded luma, if any frame has been observed.
    pub fn last(&self) -> Option<f64> {
        let value = f64::from_bits(self.last.load(Ordering::Relaxed));
        (!value.is_nan()).then_some(value)
    }

    /// Number of frames observed.
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}
