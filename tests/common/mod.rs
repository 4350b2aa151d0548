//! Loopback receivers shared by the integration tests.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use std::net::{SocketAddr, UdpSocket};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// One request as seen by the test receiver.
#[derive(Debug, Clone)]
pub struct ReceivedPost {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Clone)]
struct ReceiverState {
    posts: Arc<Mutex<Vec<ReceivedPost>>>,
    status: StatusCode,
}

/// An HTTP server on 127.0.0.1 that records every `POST /receive_image`.
pub struct HttpReceiver {
    pub addr: SocketAddr,
    posts: Arc<Mutex<Vec<ReceivedPost>>>,
}

impl HttpReceiver {
    /// Starts a receiver that answers every upload with `status`.
    pub fn start(status: StatusCode) -> Self {
        let posts = Arc::new(Mutex::new(Vec::new()));
        let state = ReceiverState {
            posts: Arc::clone(&posts),
            status,
        };
        let (addr_tx, addr_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let app = Router::new()
                    .route("/receive_image", post(receive_image))
                    .with_state(state);
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        let addr = addr_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("receiver did not start");
        Self { addr, posts }
    }

    pub fn url(&self) -> String {
        format!("http://{}/receive_image", self.addr)
    }

    pub fn posts(&self) -> Vec<ReceivedPost> {
        self.posts.lock().unwrap().clone()
    }
}

async fn receive_image(
    State(state): State<ReceiverState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.posts.lock().unwrap().push(ReceivedPost {
        content_type,
        body: body.to_vec(),
    });
    state.status
}

/// A UDP socket on 127.0.0.1 with a short read timeout.
pub fn udp_listener() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let addr = socket.local_addr().unwrap();
    (socket, addr)
}

/// Receives one datagram, or `None` on timeout.
pub fn recv_datagram(socket: &UdpSocket) -> Option<Vec<u8>> {
    let mut buf = vec![0u8; 65_536];
    match socket.recv_from(&mut buf) {
        Ok((len, _)) => {
            buf.truncate(len);
            Some(buf)
        }
        Err(_) => None,
    }
}

/// Asserts no further datagram arrives within a short window.
pub fn assert_no_more_datagrams(socket: &UdpSocket) {
    socket
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    assert!(recv_datagram(socket).is_none(), "unexpected extra datagram");
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
}
