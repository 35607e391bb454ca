use crate::core::event::{Event, TaggedEvent};
use crate::traits::{CloseCode, Identity, Result, SockmuxError};
use serde::{Deserialize, Serialize};

/// Wire form of a [`TaggedEvent`]
///
/// ```json
/// {"tag":"closed","id":"wss://example.com/feed","code":1006,"reason":"","wasClean":false}
/// {"tag":"reconnecting","id":"wss://example.com/feed","attempt":1,"nextDelayMs":1000,"maxRetries":2}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WireEvent {
    Opened {
        id: Identity,
    },
    Message {
        id: Identity,
        data: String,
    },
    Binary {
        id: Identity,
        data: Vec<u8>,
    },
    Closed {
        id: Identity,
        code: CloseCode,
        #[serde(default)]
        reason: String,
        was_clean: bool,
    },
    Error {
        id: Identity,
        message: String,
    },
    Reconnecting {
        id: Identity,
        attempt: u32,
        next_delay_ms: u64,
        max_retries: Option<u32>,
    },
    Reconnected {
        id: Identity,
    },
    ReconnectFailed {
        id: Identity,
    },
}

impl WireEvent {
    pub fn id(&self) -> &str {
        match self {
            WireEvent::Opened { id }
            | WireEvent::Message { id, .. }
            | WireEvent::Binary { id, .. }
            | WireEvent::Closed { id, .. }
            | WireEvent::Error { id, .. }
            | WireEvent::Reconnecting { id, .. }
            | WireEvent::Reconnected { id }
            | WireEvent::ReconnectFailed { id } => id,
        }
    }
}

impl From<TaggedEvent> for WireEvent {
    fn from(tagged: TaggedEvent) -> Self {
        let id = tagged.id;
        match tagged.event {
            Event::Opened => WireEvent::Opened { id },
            Event::MessageReceived(data) => WireEvent::Message { id, data },
            Event::BinaryReceived(data) => WireEvent::Binary { id, data },
            Event::Closed {
                code,
                reason,
                was_clean,
            } => WireEvent::Closed {
                id,
                code,
                reason,
                was_clean,
            },
            Event::Error(message) => WireEvent::Error { id, message },
            Event::Reconnecting {
                attempt,
                next_delay_ms,
                max_retries,
            } => WireEvent::Reconnecting {
                id,
                attempt,
                next_delay_ms,
                max_retries,
            },
            Event::Reconnected => WireEvent::Reconnected { id },
            Event::ReconnectFailed => WireEvent::ReconnectFailed { id },
        }
    }
}

impl From<WireEvent> for TaggedEvent {
    fn from(wire: WireEvent) -> Self {
        match wire {
            WireEvent::Opened { id } => Event::Opened.tagged(id),
            WireEvent::Message { id, data } => Event::MessageReceived(data).tagged(id),
            WireEvent::Binary { id, data } => Event::BinaryReceived(data).tagged(id),
            WireEvent::Closed {
                id,
                code,
                reason,
                was_clean,
            } => Event::Closed {
                code,
                reason,
                was_clean,
            }
            .tagged(id),
            WireEvent::Error { id, message } => Event::Error(message).tagged(id),
            WireEvent::Reconnecting {
                id,
                attempt,
                next_delay_ms,
                max_retries,
            } => Event::Reconnecting {
                attempt,
                next_delay_ms,
                max_retries,
            }
            .tagged(id),
            WireEvent::Reconnected { id } => Event::Reconnected.tagged(id),
            WireEvent::ReconnectFailed { id } => Event::ReconnectFailed.tagged(id),
        }
    }
}

impl TaggedEvent {
    /// Encode as one JSON object
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&WireEvent::from(self.clone()))?)
    }

    /// Decode one JSON event
    pub fn from_json(json: &str) -> Result<Self> {
        let wire: WireEvent = serde_json::from_str(json)
            .map_err(|e| SockmuxError::Protocol(format!("invalid event: {}", e)))?;
        Ok(wire.into())
    }
}
