//! Connection manager
//!
//! [`ConnectionManager`] is the public handle; the registry, dispatcher and
//! reconnection timers all live on one task behind it.

mod lifecycle;
pub mod manager;
mod scheduler;

pub use manager::{BinaryFrames, ConnectionManager, SHUTDOWN_REASON};
