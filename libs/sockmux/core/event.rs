use crate::traits::{CloseCode, Identity};

/// Lifecycle event of one connection
///
/// Events are built without an identity; the dispatcher attaches it
/// (see [`TaggedEvent`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Socket handshake completed
    Opened,
    /// Text frame received
    MessageReceived(String),
    /// Binary frame received (only with `BinaryDelivery::Event`)
    BinaryReceived(Vec<u8>),
    /// Socket closed
    Closed {
        code: CloseCode,
        reason: String,
        was_clean: bool,
    },
    /// Transport error; the connection is not necessarily closed
    Error(String),
    /// A reconnection attempt is scheduled
    Reconnecting {
        attempt: u32,
        next_delay_ms: u64,
        max_retries: Option<u32>,
    },
    /// A scheduled reconnection attempt opened successfully
    Reconnected,
    /// Retry budget spent; the connection stays closed until reopened
    ReconnectFailed,
}

impl Event {
    /// Wire tag of this event
    pub fn tag(&self) -> &'static str {
        match self {
            Event::Opened => "opened",
            Event::MessageReceived(_) => "message",
            Event::BinaryReceived(_) => "binary",
            Event::Closed { .. } => "closed",
            Event::Error(_) => "error",
            Event::Reconnecting { .. } => "reconnecting",
            Event::Reconnected => "reconnected",
            Event::ReconnectFailed => "reconnectFailed",
        }
    }

    /// Attach an identity
    pub fn tagged(self, id: impl Into<Identity>) -> TaggedEvent {
        TaggedEvent {
            id: id.into(),
            event: self,
        }
    }
}

/// An event together with the identity of the connection that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub id: Identity,
    pub event: Event,
}
