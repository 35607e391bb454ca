use thiserror::Error;

/// Main error type for sockmux
#[derive(Error, Debug)]
pub enum SockmuxError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Malformed or unrecognized wire payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (invalid policy, bad settings)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Binary bridge route could not be parsed
    #[error("Invalid bridge route: {0}")]
    InvalidRoute(String),

    /// The manager task is gone (shut down or dropped)
    #[error("Connection manager is closed")]
    ManagerClosed,
}

/// Result type for sockmux operations
pub type Result<T> = std::result::Result<T, SockmuxError>;
