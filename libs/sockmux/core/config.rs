use serde::{Deserialize, Serialize};

/// How incoming binary frames reach the application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryDelivery {
    /// Through the binary bridge (buffer + long-poll receive)
    #[default]
    Bridge,
    /// As `Event::BinaryReceived` on the event stream
    Event,
}

/// Configuration for a [`ConnectionManager`](crate::manager::ConnectionManager)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Where binary frames go
    #[serde(default)]
    pub binary_delivery: BinaryDelivery,
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how binary frames are delivered
    pub fn binary_delivery(mut self, delivery: BinaryDelivery) -> Self {
        self.binary_delivery = delivery;
        self
    }
}
