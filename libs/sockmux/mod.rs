//! # Sockmux
//!
//! A manager for many concurrent WebSocket connections, each addressed by a
//! stable identity (usually its URL).
//!
//! ## Features
//!
//! - **Single-owner registry**: one task owns every connection; handles are cheap clones
//! - **Automatic reconnection**: exponential backoff with jitter, retry caps and skip codes
//! - **Replacement**: reopening an identity closes the old socket and carries its retry count
//! - **Binary bridge**: per-connection FIFO buffer with a long-poll receive
//! - **Event routing**: identity-bound subscribers plus an unclaimed stream
//! - **JSON wire protocol**: tagged commands and events for out-of-process consumers

pub mod traits;
pub mod core;
pub mod manager;
pub mod protocol;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use crate::core::{
    bridge::{BinaryRecv, BinarySendStatus, BridgeResponse, BridgeRoute, Direction},
    config::{BinaryDelivery, ManagerConfig},
    connection_state::{ConnectionState, ReadyState},
    dispatcher::{EventReceiver, UnclaimedEvents},
    entry::ConnectionSnapshot,
    event::{Event, TaggedEvent},
    tungstenite::TungsteniteTransport,
};

// Re-export manager
pub use manager::{BinaryFrames, ConnectionManager};

// Re-export wire protocol
pub use protocol::{Command, Decoded, EventDecoder, WireEvent};
