//! JSON wire protocol
//!
//! Commands flow from the application to the manager and events flow back,
//! one JSON object per message, discriminated by a `tag` field and always
//! carrying the connection `id`.

pub mod command;
pub mod decoder;
pub mod event;

pub use command::Command;
pub use decoder::{Decoded, EventDecoder};
pub use event::WireEvent;
