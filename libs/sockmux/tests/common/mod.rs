//! Common test utilities for sockmux integration tests
//!
//! - [`MockWsServer`]: a real WebSocket server on localhost (echo + scripted close)
//! - [`MockTransport`]: an in-memory transport whose sockets the test drives by hand

#![allow(dead_code)]

use parking_lot::Mutex;
use sockmux::core::connection_state::ReadyState;
use sockmux::{
    CloseCode, ConnectRequest, Result, SignalSink, SocketHandle, SocketSignal, SockmuxError,
    Transport, WsMessage,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// A simple mock WebSocket server for testing
///
/// Echoes text and binary frames. A text frame `close:<code>` makes the
/// server close the socket with that code.
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = shutdown_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self { addr, shutdown }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, shutdown: Arc<Notify>) {
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WireCloseCode;
        use tokio_tungstenite::tungstenite::protocol::CloseFrame;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(code) = text.strip_prefix("close:") {
                                let code: u16 = code.parse().unwrap_or(1000);
                                let frame = CloseFrame {
                                    code: WireCloseCode::from(code),
                                    reason: "scripted".into(),
                                };
                                let _ = write.send(Message::Close(Some(frame))).await;
                                // Wait for the client's reply before dropping
                                while let Some(Ok(msg)) = read.next().await {
                                    if msg.is_close() {
                                        break;
                                    }
                                }
                                break;
                            }
                            if write.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if write.send(Message::Binary(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            // tungstenite queues the close reply; flush it
                            let _ = write.flush().await;
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Default)]
struct SocketLog {
    ready: Option<ReadyState>,
    sent: Vec<WsMessage>,
    close_requests: Vec<(CloseCode, String)>,
}

/// Test-side controller for one in-memory socket
#[derive(Clone)]
pub struct MockSocket {
    pub request: ConnectRequest,
    sink: SignalSink,
    log: Arc<Mutex<SocketLog>>,
}

impl MockSocket {
    pub fn identity(&self) -> &str {
        &self.request.identity
    }

    /// Complete the handshake
    pub fn open(&self) {
        self.log.lock().ready = Some(ReadyState::Open);
        self.sink.emit(SocketSignal::Opened);
    }

    /// Deliver a text frame from the peer
    pub fn text(&self, text: &str) {
        self.sink.emit(SocketSignal::Text(text.to_string()));
    }

    /// Deliver a binary frame from the peer
    pub fn binary(&self, data: &[u8]) {
        self.sink.emit(SocketSignal::Binary(data.to_vec()));
    }

    pub fn error(&self, message: &str) {
        self.sink.emit(SocketSignal::Error(message.to_string()));
    }

    /// The socket closes on its own (peer close or network drop)
    pub fn drop_with(&self, code: CloseCode, reason: &str, was_clean: bool) {
        self.log.lock().ready = Some(ReadyState::Closed);
        self.sink.emit(SocketSignal::Closed {
            code,
            reason: reason.to_string(),
            was_clean,
        });
    }

    /// Frames the manager sent through this socket
    pub fn sent(&self) -> Vec<WsMessage> {
        self.log.lock().sent.clone()
    }

    /// Close requests the manager issued to this socket
    pub fn close_requests(&self) -> Vec<(CloseCode, String)> {
        self.log.lock().close_requests.clone()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.log.lock().ready.unwrap_or(ReadyState::Connecting)
    }
}

struct MockHandle {
    sink: SignalSink,
    log: Arc<Mutex<SocketLog>>,
    auto_close: bool,
}

impl SocketHandle for MockHandle {
    fn ready_state(&self) -> ReadyState {
        self.log.lock().ready.unwrap_or(ReadyState::Connecting)
    }

    fn send(&self, message: WsMessage) -> Result<()> {
        let mut log = self.log.lock();
        if log.ready != Some(ReadyState::Open) {
            return Err(SockmuxError::ConnectionClosed("mock socket is not open".into()));
        }
        log.sent.push(message);
        Ok(())
    }

    fn close(&self, code: CloseCode, reason: &str) {
        let mut log = self.log.lock();
        log.close_requests.push((code, reason.to_string()));
        if matches!(log.ready, Some(ReadyState::Closing) | Some(ReadyState::Closed)) {
            return;
        }

        if self.auto_close {
            log.ready = Some(ReadyState::Closed);
            drop(log);
            self.sink.emit(SocketSignal::Closed {
                code,
                reason: reason.to_string(),
                was_clean: true,
            });
        } else {
            log.ready = Some(ReadyState::Closing);
        }
    }
}

/// In-memory [`Transport`]; every socket it creates is handed to the test
#[derive(Clone)]
pub struct MockTransport {
    created: mpsc::UnboundedSender<MockSocket>,
    requests: Arc<Mutex<Vec<ConnectRequest>>>,
    auto_close: bool,
}

/// Receiving end for sockets created by a [`MockTransport`]
pub struct MockSockets {
    rx: mpsc::UnboundedReceiver<MockSocket>,
}

impl MockSockets {
    /// Wait for the next socket the manager creates
    pub async fn next(&mut self) -> MockSocket {
        self.rx.recv().await.expect("mock transport dropped")
    }

    /// A socket created since the last call, if any
    pub fn try_next(&mut self) -> Option<MockSocket> {
        self.rx.try_recv().ok()
    }
}

impl MockTransport {
    /// Sockets confirm close requests immediately with a clean `Closed`
    pub fn new() -> (Self, MockSockets) {
        Self::build(true)
    }

    /// Sockets stay `Closing` after a close request until the test drops them
    pub fn manual_close() -> (Self, MockSockets) {
        Self::build(false)
    }

    fn build(auto_close: bool) -> (Self, MockSockets) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                created: tx,
                requests: Arc::new(Mutex::new(Vec::new())),
                auto_close,
            },
            MockSockets { rx },
        )
    }

    /// Every connect request seen so far
    pub fn requests(&self) -> Vec<ConnectRequest> {
        self.requests.lock().clone()
    }
}

impl Transport for MockTransport {
    fn connect(&self, request: ConnectRequest, sink: SignalSink) -> Box<dyn SocketHandle> {
        let log = Arc::new(Mutex::new(SocketLog::default()));
        self.requests.lock().push(request.clone());

        let _ = self.created.send(MockSocket {
            request,
            sink: sink.clone(),
            log: Arc::clone(&log),
        });

        Box::new(MockHandle {
            sink,
            log,
            auto_close: self.auto_close,
        })
    }
}

/// Receive the next event or panic after a (virtual) minute
pub async fn next_event(events: &mut sockmux::EventReceiver) -> sockmux::Event {
    tokio::time::timeout(std::time::Duration::from_secs(60), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

/// Assert no event arrives within `window`
pub async fn assert_quiet(events: &mut sockmux::EventReceiver, window: std::time::Duration) {
    if let Ok(Some(event)) = tokio::time::timeout(window, events.recv()).await {
        panic!("unexpected event: {:?}", event);
    }
}
