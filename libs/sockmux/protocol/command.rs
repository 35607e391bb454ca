use crate::traits::{CloseCode, Identity, ReconnectPolicy, Result, SockmuxError};
use serde::{Deserialize, Serialize};

/// Command from the application to the manager
///
/// ```json
/// {"tag":"open","id":"wss://example.com/feed","protocols":["v1"],"reconnect":{"maxRetries":3}}
/// {"tag":"send","id":"wss://example.com/feed","data":"ping"}
/// {"tag":"close","id":"wss://example.com/feed","code":1000,"reason":"bye"}
/// {"tag":"configureReconnect","id":"wss://example.com/feed","reconnect":null}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    /// Create or replace a connection
    Open {
        id: Identity,
        #[serde(default)]
        protocols: Vec<String>,
        #[serde(default)]
        reconnect: Option<ReconnectPolicy>,
    },
    /// Send a text frame
    Send { id: Identity, data: String },
    /// Close on purpose
    Close {
        id: Identity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<CloseCode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Replace the reconnect policy
    ConfigureReconnect {
        id: Identity,
        #[serde(default)]
        reconnect: Option<ReconnectPolicy>,
    },
}

impl Command {
    /// Identity the command targets
    pub fn id(&self) -> &str {
        match self {
            Command::Open { id, .. }
            | Command::Send { id, .. }
            | Command::Close { id, .. }
            | Command::ConfigureReconnect { id, .. } => id,
        }
    }

    /// Wire tag of this command
    pub fn tag(&self) -> &'static str {
        match self {
            Command::Open { .. } => "open",
            Command::Send { .. } => "send",
            Command::Close { .. } => "close",
            Command::ConfigureReconnect { .. } => "configureReconnect",
        }
    }

    /// Parse and validate one command
    pub fn decode(json: &str) -> Result<Self> {
        let command: Command = serde_json::from_str(json)
            .map_err(|e| SockmuxError::Protocol(format!("invalid command: {}", e)))?;

        match &command {
            Command::Open {
                reconnect: Some(policy),
                ..
            }
            | Command::ConfigureReconnect {
                reconnect: Some(policy),
                ..
            } => policy.validate()?,
            _ => {}
        }

        Ok(command)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
