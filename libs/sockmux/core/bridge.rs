//! Binary side channel
//!
//! Binary frames do not travel through the event stream. Each connection
//! keeps a FIFO buffer of frames nobody asked for yet and at most one parked
//! receiver (a long-poll). A frame that arrives while a receiver is parked
//! goes straight to it; otherwise it is buffered. Close or replacement
//! resolves the parked receiver with [`BinaryRecv::Terminated`].
//!
//! [`BridgeRoute`] and [`BridgeResponse`] expose the same contract as
//! `"send/<id>"` / `"recv/<id>"` request routes with HTTP-like status codes,
//! for callers that can only speak request/response.

use crate::traits::{Identity, Result, SockmuxError};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::oneshot;

/// Frame forwarded / frame delivered
pub const STATUS_OK: u16 = 200;
/// Receive ended because the connection closed or was replaced
pub const STATUS_TERMINATED: u16 = 499;
/// Send refused because the socket is not open
pub const STATUS_NOT_OPEN: u16 = 503;

/// Characters escaped in the identity segment of a route (everything but RFC 3986 unreserved)
const IDENTITY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Result of a binary receive request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryRecv {
    /// Oldest pending frame (may be empty)
    Frame(Vec<u8>),
    /// The connection closed or was replaced while waiting; carries no payload
    Terminated,
}

impl BinaryRecv {
    pub fn status_code(&self) -> u16 {
        match self {
            BinaryRecv::Frame(_) => STATUS_OK,
            BinaryRecv::Terminated => STATUS_TERMINATED,
        }
    }

    pub fn into_response(self) -> BridgeResponse {
        let status = self.status_code();
        let body = match self {
            BinaryRecv::Frame(bytes) => bytes,
            BinaryRecv::Terminated => Vec::new(),
        };
        BridgeResponse { status, body }
    }
}

/// Result of a binary send request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarySendStatus {
    /// Handed to an open socket
    Forwarded,
    /// No open socket for that identity; nothing was sent
    NotOpen,
}

impl BinarySendStatus {
    pub fn status_code(self) -> u16 {
        match self {
            BinarySendStatus::Forwarded => STATUS_OK,
            BinarySendStatus::NotOpen => STATUS_NOT_OPEN,
        }
    }

    pub fn into_response(self) -> BridgeResponse {
        BridgeResponse {
            status: self.status_code(),
            body: Vec::new(),
        }
    }
}

/// Per-connection binary buffer and parked receiver
///
/// Invariant: a parked receiver and a non-empty buffer never coexist.
#[derive(Debug, Default)]
pub struct BinaryBridge {
    pending: Option<oneshot::Sender<BinaryRecv>>,
    buffer: VecDeque<Vec<u8>>,
}

impl BinaryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand an incoming frame to the parked receiver, or buffer it
    pub fn deliver(&mut self, frame: Vec<u8>) {
        if let Some(receiver) = self.pending.take() {
            match receiver.send(BinaryRecv::Frame(frame)) {
                Ok(()) => return,
                // Caller gave up waiting; keep the frame for the next request
                Err(BinaryRecv::Frame(frame)) => self.buffer.push_back(frame),
                Err(BinaryRecv::Terminated) => {}
            }
        } else {
            self.buffer.push_back(frame);
        }
    }

    /// Serve a receive request
    ///
    /// A buffered frame resolves it immediately. Otherwise it is parked when
    /// `park` is true (superseding any receiver already parked), or resolved
    /// as terminated when false.
    pub fn request(&mut self, reply: oneshot::Sender<BinaryRecv>, park: bool) {
        if let Some(frame) = self.buffer.pop_front() {
            let _ = reply.send(BinaryRecv::Frame(frame));
            return;
        }
        if !park {
            let _ = reply.send(BinaryRecv::Terminated);
            return;
        }
        if let Some(previous) = self.pending.replace(reply) {
            let _ = previous.send(BinaryRecv::Terminated);
        }
    }

    /// Resolve the parked receiver (if any) with the terminated sentinel
    ///
    /// Returns `true` if a receiver was waiting.
    pub fn terminate(&mut self) -> bool {
        match self.pending.take() {
            Some(receiver) => {
                let _ = receiver.send(BinaryRecv::Terminated);
                true
            }
            None => false,
        }
    }

    /// Number of buffered frames
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a live receiver is parked
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().map_or(false, |tx| !tx.is_closed())
    }
}

/// Direction of a bridge route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Recv,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Send => "send",
            Direction::Recv => "recv",
        }
    }
}

/// A parsed `"<direction>/<percent-encoded identity>"` route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRoute {
    pub direction: Direction,
    pub identity: Identity,
}

impl BridgeRoute {
    pub fn send(identity: impl Into<Identity>) -> Self {
        Self {
            direction: Direction::Send,
            identity: identity.into(),
        }
    }

    pub fn recv(identity: impl Into<Identity>) -> Self {
        Self {
            direction: Direction::Recv,
            identity: identity.into(),
        }
    }

    /// Parse a route string
    pub fn parse(route: &str) -> Result<Self> {
        let (direction, encoded) = route
            .split_once('/')
            .ok_or_else(|| SockmuxError::InvalidRoute(format!("missing '/' in '{}'", route)))?;

        let direction = match direction {
            "send" => Direction::Send,
            "recv" => Direction::Recv,
            other => {
                return Err(SockmuxError::InvalidRoute(format!(
                    "unknown direction '{}'",
                    other
                )))
            }
        };

        if encoded.is_empty() {
            return Err(SockmuxError::InvalidRoute(format!(
                "empty identity in '{}'",
                route
            )));
        }

        let identity = percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|e| SockmuxError::InvalidRoute(format!("identity is not UTF-8: {}", e)))?
            .into_owned();

        Ok(Self { direction, identity })
    }

    /// Render the route string
    pub fn to_path(&self) -> String {
        format!(
            "{}/{}",
            self.direction.as_str(),
            utf8_percent_encode(&self.identity, IDENTITY_SEGMENT)
        )
    }
}

impl fmt::Display for BridgeRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

/// Response of the request/response facade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeResponse {
    pub status: u16,
    pub body: Vec<u8>,
}
