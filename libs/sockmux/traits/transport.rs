//! Socket primitive seam
//!
//! The manager never speaks WebSocket framing itself. A [`Transport`] opens
//! sockets on its behalf and reports everything that happens to them as
//! [`SocketSignal`]s through a [`SignalSink`]. Each sink is bound to one
//! identity and one socket generation, so signals from a superseded socket
//! can be told apart from those of its replacement.

use crate::core::connection_state::ReadyState;
use crate::traits::close_code::CloseCode;
use crate::traits::error::Result;
use crate::traits::message::WsMessage;
use crate::manager::manager::Inbound;
use crate::traits::Identity;
use tokio::sync::mpsc::WeakUnboundedSender;

/// Generation number of a socket, unique per manager
pub type SocketId = u64;

/// What the transport needs to open a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Connection identity (the URL for [`TungsteniteTransport`](crate::core::tungstenite::TungsteniteTransport))
    pub identity: Identity,
    /// Requested sub-protocols, in preference order
    pub protocols: Vec<String>,
}

/// Raw notification from a socket
#[derive(Debug, Clone, PartialEq)]
pub enum SocketSignal {
    /// Handshake completed
    Opened,
    /// Text frame received
    Text(String),
    /// Binary frame received
    Binary(Vec<u8>),
    /// Transport-level error (non-fatal; a `Closed` usually follows)
    Error(String),
    /// Socket closed; no further signals follow
    Closed {
        code: CloseCode,
        reason: String,
        was_clean: bool,
    },
}

/// A signal tagged with the socket that produced it
#[derive(Debug)]
pub(crate) struct SocketNotice {
    pub identity: Identity,
    pub socket: SocketId,
    pub signal: SocketSignal,
}

/// Where a socket reports its signals
///
/// Signals share the manager's inbox with handle commands, so they are
/// applied in the order they were posted. The sink holds a weak sender and
/// does not keep the manager alive on its own.
#[derive(Clone)]
pub struct SignalSink {
    identity: Identity,
    socket: SocketId,
    inbox: WeakUnboundedSender<Inbound>,
}

impl SignalSink {
    pub(crate) fn new(identity: Identity, socket: SocketId, inbox: WeakUnboundedSender<Inbound>) -> Self {
        Self {
            identity,
            socket,
            inbox,
        }
    }

    /// Report a signal to the manager
    ///
    /// Returns `false` once the manager is gone.
    pub fn emit(&self, signal: SocketSignal) -> bool {
        let Some(inbox) = self.inbox.upgrade() else {
            return false;
        };
        inbox
            .send(Inbound::Signal(SocketNotice {
                identity: self.identity.clone(),
                socket: self.socket,
                signal,
            }))
            .is_ok()
    }

    /// Identity this sink reports for
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Socket generation this sink reports for
    pub fn socket_id(&self) -> SocketId {
        self.socket
    }
}

impl std::fmt::Debug for SignalSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalSink")
            .field("identity", &self.identity)
            .field("socket", &self.socket)
            .finish()
    }
}

/// Handle to one open (or opening) socket
pub trait SocketHandle: Send {
    /// Current ready state of the socket
    fn ready_state(&self) -> ReadyState;

    /// Queue a frame for sending
    fn send(&self, message: WsMessage) -> Result<()>;

    /// Start the closing handshake
    ///
    /// Calling this more than once has no further effect. The socket reports
    /// `SocketSignal::Closed` when it is done.
    fn close(&self, code: CloseCode, reason: &str);
}

/// Factory for sockets
///
/// `connect` must not block: it starts the socket in the background and
/// returns immediately. Every socket it creates must eventually report
/// exactly one `SocketSignal::Closed` unless the manager drops its handle
/// first.
pub trait Transport: Send + Sync + 'static {
    fn connect(&self, request: ConnectRequest, sink: SignalSink) -> Box<dyn SocketHandle>;
}
