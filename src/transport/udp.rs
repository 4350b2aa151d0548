//! Fire-and-forget UDP datagrams, one per frame.
//!
//! Frames are queued to a single worker thread per sender. The queue is
//! bounded: when it is full the frame is dropped and counted, so a slow
//! network never stalls the caller and never piles up threads.

use super::{FrameTransport, TransportCounts, TransportError, TransportStats, TransportTarget};
use crossbeam_channel::{Sender, TrySendError};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Largest payload a single IPv4 UDP datagram can carry.
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

/// Sends `payload` as one datagram to `destination`.
///
/// Resolves the destination, binds a fresh unconnected socket on the
/// matching address family, sends once, and closes the socket on return.
/// Payloads are never split across datagrams.
pub fn send_datagram(payload: &[u8], destination: &TransportTarget) -> Result<usize, TransportError> {
    if payload.len() > MAX_DATAGRAM_PAYLOAD {
        return Err(TransportError::DatagramTooLarge {
            size: payload.len(),
            max: MAX_DATAGRAM_PAYLOAD,
        });
    }

    let addr = destination.resolve()?;
    let local: SocketAddr = match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let socket = UdpSocket::bind(local)?;
    let sent = socket.send_to(payload, addr)?;
    if sent != payload.len() {
        return Err(TransportError::ShortSend {
            sent,
            expected: payload.len(),
        });
    }
    Ok(sent)
}

struct Datagram {
    payload: Vec<u8>,
    destination: TransportTarget,
}

/// Queues frames for a background worker that sends them as datagrams.
pub struct UdpSender {
    target: TransportTarget,
    queue: Mutex<Option<Sender<Datagram>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<TransportStats>,
}

impl UdpSender {
    /// Starts a sender whose worker accepts up to `queue_depth` pending frames.
    ///
    /// `target` is where [`FrameTransport::send_frame`] sends; explicit
    /// destinations go through [`UdpSender::send_over_udp`].
    pub fn new(target: TransportTarget, queue_depth: usize) -> Result<Self, TransportError> {
        let (tx, rx) = crossbeam_channel::bounded::<Datagram>(queue_depth.max(1));
        let stats = Arc::new(TransportStats::default());

        let worker = {
            let stats = Arc::clone(&stats);
            thread::Builder::new()
                .name("udp-sender".to_string())
                .spawn(move || {
                    for datagram in rx.iter() {
                        match send_datagram(&datagram.payload, &datagram.destination) {
                            Ok(sent) => stats.record_sent(sent),
                            Err(e) => {
                                stats.record_failure();
                                tracing::warn!(
                                    destination = %datagram.destination,
                                    bytes = datagram.payload.len(),
                                    "UDP frame send failed: {}",
                                    e
                                );
                            }
                        }
                    }
                    tracing::debug!("UDP sender worker exited");
                })?
        };

        tracing::info!(target = %target, queue_depth, "UDP sender started");

        Ok(Self {
            target,
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            stats,
        })
    }

    /// Returns the default destination.
    pub fn target(&self) -> &TransportTarget {
        &self.target
    }

    /// Queues one datagram carrying `frame_bytes` for `destination`.
    ///
    /// Never blocks. If the queue is full or the sender is closed the
    /// frame is dropped and counted.
    pub fn send_over_udp(&self, frame_bytes: &[u8], destination: &TransportTarget) {
        let queue = match self.queue.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let Some(queue) = queue else {
            self.stats.record_dropped();
            tracing::debug!("UDP sender closed, dropping frame");
            return;
        };

        let datagram = Datagram {
            payload: frame_bytes.to_vec(),
            destination: destination.clone(),
        };
        match queue.try_send(datagram) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.stats.record_dropped();
                tracing::debug!("UDP send queue full, dropping frame");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.stats.record_dropped();
                tracing::warn!("UDP sender worker is gone, dropping frame");
            }
        }
    }

    /// Stops accepting frames, sends everything already queued, and joins
    /// the worker. Safe to call more than once.
    pub fn close(&self) {
        let queue = match self.queue.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(queue);

        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = worker {
            if handle.join().is_err() {
                tracing::error!("UDP sender worker panicked");
            }
        }
    }
}

impl FrameTransport for UdpSender {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn send_frame(&self, payload: &[u8]) {
        self.send_over_udp(payload, &self.target);
    }

    fn counts(&self) -> TransportCounts {
        self.stats.snapshot()
    }

    fn close(&self) {
        UdpSender::close(self);
    }
}

impl Drop for UdpSender {
    fn drop(&mut self) {
        self.close();
    }
}
