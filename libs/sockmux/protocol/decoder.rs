//! Collaborator-side event routing
//!
//! A component that only understands a few connections registers a mapping
//! per identity and feeds raw JSON events through [`EventDecoder`]. Events
//! for identities it did not register come back as
//! [`Decoded::Unmatched`] rather than being dropped.

use crate::core::event::{Event, TaggedEvent};
use crate::protocol::event::WireEvent;
use crate::traits::{Identity, Result, SockmuxError};
use serde_json::Value;

/// Outcome of decoding one inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<M> {
    /// A registered identity matched and produced a message
    Matched(M),
    /// No registered identity matched; carries the event's id if it had one
    Unmatched(Option<Identity>),
}

type Mapper<M> = Box<dyn Fn(Event) -> M + Send + Sync>;

/// Per-identity decoders mapping events to application messages
pub struct EventDecoder<M> {
    mappers: Vec<(Identity, Mapper<M>)>,
}

impl<M> Default for EventDecoder<M> {
    fn default() -> Self {
        Self {
            mappers: Vec::new(),
        }
    }
}

impl<M> EventDecoder<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapping for `identity` (builder form)
    pub fn on<F>(mut self, identity: impl Into<Identity>, map: F) -> Self
    where
        F: Fn(Event) -> M + Send + Sync + 'static,
    {
        self.register(identity, map);
        self
    }

    /// Register a mapping for `identity`
    pub fn register<F>(&mut self, identity: impl Into<Identity>, map: F)
    where
        F: Fn(Event) -> M + Send + Sync + 'static,
    {
        self.mappers.push((identity.into(), Box::new(map)));
    }

    /// Number of registered mappings
    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Decode a raw JSON event
    pub fn decode_str(&self, json: &str) -> Result<Decoded<M>> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| SockmuxError::Protocol(format!("invalid event: {}", e)))?;
        self.decode_value(value)
    }

    /// Decode an already-parsed JSON event
    pub fn decode_value(&self, value: Value) -> Result<Decoded<M>> {
        let id = match value.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => return Ok(Decoded::Unmatched(None)),
        };

        let Some((_, map)) = self.mappers.iter().find(|(identity, _)| *identity == id) else {
            return Ok(Decoded::Unmatched(Some(id)));
        };

        let wire: WireEvent = serde_json::from_value(value)
            .map_err(|e| SockmuxError::Protocol(format!("malformed event for '{}': {}", id, e)))?;
        Ok(Decoded::Matched(map(TaggedEvent::from(wire).event)))
    }
}

impl<M> std::fmt::Debug for EventDecoder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let identities: Vec<&str> = self.mappers.iter().map(|(id, _)| id.as_str()).collect();
        f.debug_struct("EventDecoder")
            .field("identities", &identities)
            .finish()
    }
}
