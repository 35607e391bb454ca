use crate::core::bridge::BinaryBridge;
use crate::core::connection_state::{ConnectionState, ReadyState};
use crate::traits::{CloseCode, Identity, ReconnectPolicy, SocketHandle, SocketId};
use tokio::task::JoinHandle;

/// A scheduled reconnection, canceled when dropped
#[derive(Debug)]
pub struct ReconnectTimer {
    token: u64,
    handle: JoinHandle<()>,
}

impl ReconnectTimer {
    pub(crate) fn new(token: u64, handle: JoinHandle<()>) -> Self {
        Self { token, handle }
    }

    /// Token the timer reports back with when it fires
    pub fn token(&self) -> u64 {
        self.token
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The socket currently attached to an entry
pub(crate) struct ActiveSocket {
    pub id: SocketId,
    pub handle: Box<dyn SocketHandle>,
}

/// State tracked for one identity
///
/// Owned exclusively by the [`Registry`](crate::core::registry::Registry).
pub struct ConnectionEntry {
    pub(crate) identity: Identity,
    pub(crate) protocols: Vec<String>,
    pub(crate) reconnect: Option<ReconnectPolicy>,
    /// Consecutive reconnection attempts since the last successful open
    pub(crate) retry_count: u32,
    /// Set while a close was explicitly requested; suppresses auto-reconnect
    pub(crate) intentional_close: bool,
    /// Present only while a reconnection is pending
    pub(crate) reconnect_timer: Option<ReconnectTimer>,
    pub(crate) socket: Option<ActiveSocket>,
    pub(crate) state: ConnectionState,
    /// The current socket was opened by the reconnection scheduler
    pub(crate) reopening: bool,
    pub(crate) binary: BinaryBridge,
}

impl ConnectionEntry {
    pub fn new(
        identity: impl Into<Identity>,
        protocols: Vec<String>,
        reconnect: Option<ReconnectPolicy>,
    ) -> Self {
        Self {
            identity: identity.into(),
            protocols,
            reconnect,
            retry_count: 0,
            intentional_close: false,
            reconnect_timer: None,
            socket: None,
            state: ConnectionState::Closed,
            reopening: false,
            binary: BinaryBridge::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    pub fn reconnect_policy(&self) -> Option<&ReconnectPolicy> {
        self.reconnect.as_ref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_intentional_close(&self) -> bool {
        self.intentional_close
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn has_socket(&self) -> bool {
        self.socket.is_some()
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    /// Whether the attached socket reports itself open
    pub fn is_open(&self) -> bool {
        self.socket
            .as_ref()
            .map_or(false, |socket| socket.handle.ready_state() == ReadyState::Open)
    }

    /// Generation of the attached socket, if any
    pub fn socket_id(&self) -> Option<SocketId> {
        self.socket.as_ref().map(|socket| socket.id)
    }

    /// Cancel a pending reconnection; returns `true` if one was pending
    pub(crate) fn cancel_reconnect(&mut self) -> bool {
        self.reconnect_timer.take().is_some()
    }

    /// Shut this entry down on purpose
    ///
    /// Marks the close as intentional, cancels any pending reconnection,
    /// releases a parked binary receiver and asks the socket to close.
    /// The socket stays attached so its `Closed` signal can still be
    /// observed. Returns `true` if a socket was attached.
    pub(crate) fn begin_close(&mut self, code: CloseCode, reason: &str) -> bool {
        self.intentional_close = true;
        self.cancel_reconnect();
        self.binary.terminate();

        match self.socket.as_ref() {
            Some(socket) => {
                socket.handle.close(code, reason);
                self.state = ConnectionState::Closing;
                true
            }
            None => {
                if self.state == ConnectionState::ReconnectPending {
                    self.state = ConnectionState::Closed;
                }
                false
            }
        }
    }

    /// Point-in-time view for status queries
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            identity: self.identity.clone(),
            state: self.state,
            retry_count: self.retry_count,
            has_policy: self.reconnect.is_some(),
            intentional_close: self.intentional_close,
            buffered_frames: self.binary.buffered(),
            receiver_parked: self.binary.has_pending(),
        }
    }
}

impl std::fmt::Debug for ConnectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEntry")
            .field("identity", &self.identity)
            .field("state", &self.state)
            .field("retry_count", &self.retry_count)
            .field("intentional_close", &self.intentional_close)
            .field("socket", &self.socket_id())
            .finish()
    }
}

/// Point-in-time status of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub identity: Identity,
    pub state: ConnectionState,
    pub retry_count: u32,
    pub has_policy: bool,
    pub intentional_close: bool,
    pub buffered_frames: usize,
    pub receiver_parked: bool,
}
