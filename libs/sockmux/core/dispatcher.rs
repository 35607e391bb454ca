//! Event routing (manager side)
//!
//! Every event leaves the manager tagged with its identity. Subscribers bind
//! to one identity and are tried in registration order; the first live one
//! consumes the event. Events nobody claims go to the unclaimed stream so
//! the application can log or ignore them instead of losing them silently.

use crate::core::event::{Event, TaggedEvent};
use crate::traits::Identity;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// Events for one subscribed identity
pub type EventReceiver = UnboundedReceiver<Event>;

/// Tagged events no subscriber claimed
pub type UnclaimedEvents = UnboundedReceiver<TaggedEvent>;

/// Where a dispatched event ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A subscriber bound to the identity received it
    Claimed,
    /// No subscriber matched; sent to the unclaimed stream
    Unclaimed,
    /// No subscriber matched and the unclaimed stream is gone
    Dropped,
}

struct Route {
    identity: Identity,
    tx: UnboundedSender<Event>,
}

/// Routes events to the consumers registered for their identity
pub struct Dispatcher {
    routes: Vec<Route>,
    unclaimed: UnboundedSender<TaggedEvent>,
}

impl Dispatcher {
    /// Create a dispatcher and the receiving end of its unclaimed stream
    pub fn new() -> (Self, UnclaimedEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                routes: Vec::new(),
                unclaimed: tx,
            },
            rx,
        )
    }

    /// Register interest in one identity
    pub fn subscribe(&mut self, identity: impl Into<Identity>) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe_with(identity, tx);
        rx
    }

    /// Register a sender created elsewhere (the manager handle side)
    pub fn subscribe_with(&mut self, identity: impl Into<Identity>, tx: UnboundedSender<Event>) {
        self.routes.push(Route {
            identity: identity.into(),
            tx,
        });
    }

    /// Deliver `event` for `identity`
    pub fn dispatch(&mut self, identity: &str, event: Event) -> Delivery {
        self.routes.retain(|route| !route.tx.is_closed());

        let mut event = event;
        for route in self.routes.iter().filter(|route| route.identity == identity) {
            match route.tx.send(event) {
                Ok(()) => return Delivery::Claimed,
                // Receiver dropped between the prune and now; try the next one
                Err(mpsc::error::SendError(returned)) => event = returned,
            }
        }

        trace!("No subscriber for '{}', event '{}' is unclaimed", identity, event.tag());
        match self.unclaimed.send(event.tagged(identity)) {
            Ok(()) => Delivery::Unclaimed,
            Err(_) => Delivery::Dropped,
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.routes.iter().filter(|route| !route.tx.is_closed()).count()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
