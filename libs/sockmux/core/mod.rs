pub mod bridge;
pub mod config;
pub mod connection_state;
pub mod dispatcher;
pub mod entry;
pub mod event;
pub mod registry;
pub mod tungstenite;

pub use bridge::{
    BinaryBridge, BinaryRecv, BinarySendStatus, BridgeResponse, BridgeRoute, Direction,
    STATUS_NOT_OPEN, STATUS_OK, STATUS_TERMINATED,
};
pub use config::{BinaryDelivery, ManagerConfig};
pub use connection_state::{AtomicReadyState, ConnectionState, ReadyState};
pub use dispatcher::{Delivery, Dispatcher, EventReceiver, UnclaimedEvents};
pub use entry::{ConnectionEntry, ConnectionSnapshot, ReconnectTimer};
pub use event::{Event, TaggedEvent};
pub use registry::{Registry, Replaced, REPLACED_REASON};
pub use tungstenite::{TungsteniteTransport, DEFAULT_CLOSE_TIMEOUT};
