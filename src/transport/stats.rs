//! Per-transport send counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated from the sending thread.
#[derive(Debug, Default)]
pub struct TransportStats {
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    bytes_sent: AtomicU64,
}

/// Point-in-time copy of [`TransportStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportCounts {
    /// Frames delivered to the network stack (UDP) or acknowledged (HTTP).
    pub sent: u64,
    /// Send attempts that failed.
    pub failed: u64,
    /// Frames discarded before a send was attempted.
    pub dropped: u64,
    /// Payload bytes of successful sends.
    pub bytes_sent: u64,
}

impl TransportStats {
    /// Records a successful send of `bytes` payload bytes.
    pub fn record_sent(&self, bytes: usize) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Records a failed send.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame discarded without a send attempt.
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    pub fn snapshot(&self) -> TransportCounts {
        TransportCounts {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

impl TransportCounts {
    /// Total frames handed to the transport.
    pub fn attempted(&self) -> u64 {
        self.sent + self.failed + self.dropped
    }
}

impl std::ops::Add for TransportCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            sent: self.sent + other.sent,
            failed: self.failed + other.failed,
            dropped: self.dropped + other.dropped,
            bytes_sent: self.bytes_sent + other.bytes_sent,
        }
    }
}
