//! # Sockmux Traits
//!
//! Core types and seams shared by the connection manager:
//!
//! - **CloseCode**: RFC 6455 close-code catalog with an escape variant
//! - **ReconnectPolicy**: backoff computation and the reconnect decision
//! - **Transport / SocketHandle**: the socket primitive the manager drives
//! - **SockmuxError**: the crate error type

pub mod close_code;
pub mod error;
pub mod message;
pub mod reconnect;
pub mod transport;

/// Stable name of one logical connection (for WebSocket URLs, the URL itself)
pub type Identity = String;

// Re-export commonly used types
pub use close_code::CloseCode;
pub use error::{Result, SockmuxError};
pub use message::WsMessage;
pub use reconnect::{ReconnectDecision, ReconnectPolicy, JITTER_FACTOR};
pub use transport::{ConnectRequest, SignalSink, SocketHandle, SocketId, SocketSignal, Transport};
