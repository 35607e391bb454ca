//! [`Transport`] backed by tokio-tungstenite
//!
//! Each socket runs in its own tokio task. The handle talks to the task over
//! an unbounded command channel; the task reports back through the
//! [`SignalSink`] and always finishes with exactly one `Closed` signal.

use crate::core::connection_state::{AtomicReadyState, ReadyState};
use crate::traits::*;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WireCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

/// How long to wait for the peer's close frame after sending ours
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens sockets with `tokio_tungstenite::connect_async`; the identity is the URL
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    close_timeout: Duration,
}

impl Default for TungsteniteTransport {
    fn default() -> Self {
        Self {
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the closing handshake
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

impl Transport for TungsteniteTransport {
    fn connect(&self, request: ConnectRequest, sink: SignalSink) -> Box<dyn SocketHandle> {
        let state = Arc::new(AtomicReadyState::new(ReadyState::Connecting));
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket(
            request,
            sink,
            Arc::clone(&state),
            command_rx,
            self.close_timeout,
        ));

        Box::new(TungsteniteSocket {
            state,
            commands: command_tx,
        })
    }
}

#[derive(Debug)]
enum SocketCommand {
    Send(WsMessage),
    Close(CloseCode, String),
}

struct TungsteniteSocket {
    state: Arc<AtomicReadyState>,
    commands: UnboundedSender<SocketCommand>,
}

impl SocketHandle for TungsteniteSocket {
    fn ready_state(&self) -> ReadyState {
        self.state.get()
    }

    fn send(&self, message: WsMessage) -> Result<()> {
        if !self.state.is_open() {
            return Err(SockmuxError::ConnectionClosed("socket is not open".into()));
        }
        self.commands
            .send(SocketCommand::Send(message))
            .map_err(|_| SockmuxError::ConnectionClosed("socket task has exited".into()))
    }

    fn close(&self, code: CloseCode, reason: &str) {
        if self.state.begin_closing() {
            let _ = self
                .commands
                .send(SocketCommand::Close(code, reason.to_string()));
        }
    }
}

/// How a socket ended
struct Closure {
    code: CloseCode,
    reason: String,
    was_clean: bool,
}

impl Closure {
    fn abnormal() -> Self {
        Self {
            code: CloseCode::AbnormalClosure,
            reason: String::new(),
            was_clean: false,
        }
    }
}

/// Socket task: connect, pump frames, report the close
async fn run_socket(
    request: ConnectRequest,
    sink: SignalSink,
    state: Arc<AtomicReadyState>,
    mut commands: UnboundedReceiver<SocketCommand>,
    close_timeout: Duration,
) {
    let url = request.identity.clone();

    let client_request = match build_request(&request) {
        Ok(client_request) => client_request,
        Err(e) => {
            warn!("Invalid WebSocket request for {}: {}", url, e);
            sink.emit(SocketSignal::Error(e.to_string()));
            finish(&sink, &state, Closure::abnormal());
            return;
        }
    };

    let connected = tokio::select! {
        result = connect_async(client_request) => result,
        request = wait_for_close(&mut commands) => {
            debug!("Close requested while connecting to {}", url);
            let closure = match request {
                Some((code, reason)) => Closure { code, reason, was_clean: false },
                None => Closure::abnormal(),
            };
            finish(&sink, &state, closure);
            return;
        }
    };

    let ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            warn!("Failed to connect to {}: {}", url, e);
            sink.emit(SocketSignal::Error(e.to_string()));
            finish(&sink, &state, Closure::abnormal());
            return;
        }
    };

    // A close may have been requested just as the handshake finished
    if state.get() == ReadyState::Connecting {
        state.set(ReadyState::Open);
    }
    info!("Connected to {}", url);
    sink.emit(SocketSignal::Opened);

    let (mut write, mut read) = ws_stream.split();
    let closure = message_loop(&mut write, &mut read, &sink, &state, &mut commands, close_timeout).await;

    debug!(
        "Socket to {} closed (code {}, clean: {})",
        url, closure.code, closure.was_clean
    );
    finish(&sink, &state, closure);
}

/// Main frame pump for an open socket
async fn message_loop(
    write: &mut WsWrite,
    read: &mut WsRead,
    sink: &SignalSink,
    state: &AtomicReadyState,
    commands: &mut UnboundedReceiver<SocketCommand>,
    close_timeout: Duration,
) -> Closure {
    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        sink.emit(SocketSignal::Text(text));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        sink.emit(SocketSignal::Binary(data));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        // Peer initiated; tungstenite answers while we drain the stream
                        state.begin_closing();
                        let (code, reason) = close_parts(frame);
                        let _ = tokio::time::timeout(close_timeout, drain(read)).await;
                        return Closure { code, reason, was_clean: true };
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                        // Pong replies are sent automatically by tungstenite
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error on {}: {}", sink.identity(), e);
                        sink.emit(SocketSignal::Error(e.to_string()));
                        return Closure::abnormal();
                    }
                    None => {
                        debug!("WebSocket stream for {} ended without a close frame", sink.identity());
                        return Closure::abnormal();
                    }
                }
            }

            command = commands.recv() => {
                match command {
                    Some(SocketCommand::Send(message)) => {
                        if let Err(e) = write.send(to_tungstenite(message)).await {
                            warn!("Send failed on {}: {}", sink.identity(), e);
                            sink.emit(SocketSignal::Error(e.to_string()));
                            return Closure::abnormal();
                        }
                    }
                    Some(SocketCommand::Close(code, reason)) => {
                        return close_handshake(write, read, code, reason, close_timeout).await;
                    }
                    None => {
                        // Handle dropped without an explicit close
                        state.begin_closing();
                        return close_handshake(write, read, CloseCode::GoingAway, String::new(), close_timeout).await;
                    }
                }
            }
        }
    }
}

/// Send our close frame and wait (bounded) for the peer's
async fn close_handshake(
    write: &mut WsWrite,
    read: &mut WsRead,
    code: CloseCode,
    reason: String,
    close_timeout: Duration,
) -> Closure {
    let frame = CloseFrame {
        code: WireCloseCode::from(code.as_u16()),
        reason: reason.clone().into(),
    };

    if let Err(e) = write.send(Message::Close(Some(frame))).await {
        debug!("Failed to send close frame: {}", e);
        return Closure {
            code,
            reason,
            was_clean: false,
        };
    }

    match tokio::time::timeout(close_timeout, await_peer_close(read)).await {
        Ok(Some((peer_code, peer_reason))) => Closure {
            code: peer_code,
            reason: peer_reason,
            was_clean: true,
        },
        Ok(None) => Closure {
            code,
            reason,
            was_clean: true,
        },
        Err(_) => {
            debug!("Timed out waiting for the peer's close frame");
            Closure {
                code,
                reason,
                was_clean: false,
            }
        }
    }
}

/// Read until the peer's close frame; `None` if the stream ends first
async fn await_peer_close(read: &mut WsRead) -> Option<(CloseCode, String)> {
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Close(frame)) => return Some(close_parts(frame)),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

async fn drain(read: &mut WsRead) {
    while let Some(Ok(_)) = read.next().await {}
}

/// Wait for a close request while the handshake is in flight
///
/// `None` means the handle was dropped.
async fn wait_for_close(commands: &mut UnboundedReceiver<SocketCommand>) -> Option<(CloseCode, String)> {
    loop {
        match commands.recv().await? {
            SocketCommand::Close(code, reason) => return Some((code, reason)),
            // The handle refuses to send before the socket is open
            SocketCommand::Send(_) => continue,
        }
    }
}

fn finish(sink: &SignalSink, state: &AtomicReadyState, closure: Closure) {
    state.set(ReadyState::Closed);
    sink.emit(SocketSignal::Closed {
        code: closure.code,
        reason: closure.reason,
        was_clean: closure.was_clean,
    });
}

fn close_parts(frame: Option<CloseFrame<'_>>) -> (CloseCode, String) {
    match frame {
        Some(frame) => (
            CloseCode::from_u16(u16::from(frame.code)),
            frame.reason.into_owned(),
        ),
        None => (CloseCode::NoStatusReceived, String::new()),
    }
}

/// Build the handshake request, advertising sub-protocols when given
fn build_request(request: &ConnectRequest) -> Result<Request> {
    let mut client_request = request
        .identity
        .as_str()
        .into_client_request()
        .map_err(|e| SockmuxError::WebSocket(e.to_string()))?;

    if !request.protocols.is_empty() {
        let value = http::HeaderValue::from_str(&request.protocols.join(", "))
            .map_err(|e| SockmuxError::Configuration(format!("invalid sub-protocol: {}", e)))?;
        client_request
            .headers_mut()
            .insert(http::header::SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(client_request)
}

/// Convert WsMessage to tungstenite Message
fn to_tungstenite(msg: WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}
