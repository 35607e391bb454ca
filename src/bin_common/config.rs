//! Bridge configuration (YAML)

use serde::{Deserialize, Serialize};
use sockmux::{BinaryDelivery, ManagerConfig, ReconnectPolicy};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// A connection opened when the bridge starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Identity (the WebSocket URL)
    pub id: String,
    #[serde(default)]
    pub protocols: Vec<String>,
    /// Overrides `default_reconnect` when set
    #[serde(default)]
    pub reconnect: Option<ReconnectPolicy>,
}

/// Configuration of the `sockmux-bridge` binary
///
/// ```yaml
/// log_level: info
/// binary_delivery: event
/// heartbeat_interval_secs: 300
/// default_reconnect:
///   max_retries: 5
///   initial_delay_ms: 1000
/// connections:
///   - id: wss://stream.example.com/feed
///     protocols: [v1.json]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub log_level: String,
    /// Must be `event`: stdio has no request/response channel to drain the
    /// binary bridge, so frames are written as `binary` events
    pub binary_delivery: BinaryDelivery,
    pub heartbeat_interval_secs: u64,
    /// Policy for startup connections that do not set their own
    pub default_reconnect: Option<ReconnectPolicy>,
    pub connections: Vec<ConnectionConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            binary_delivery: BinaryDelivery::Event,
            heartbeat_interval_secs: 300,
            default_reconnect: None,
            connections: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a YAML file
    ///
    /// A missing file yields the defaults; `.env` is loaded first so
    /// `RUST_LOG` and friends can live there.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        dotenv::dotenv().ok(); // Don't fail if .env doesn't exist

        let path = config_path.as_ref();
        let config = if path.exists() {
            let yaml_content = std::fs::read_to_string(path)?;
            Self::from_yaml(&yaml_content)?
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse without touching the filesystem or validating
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document is valid and means "all defaults"
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        if self.binary_delivery != BinaryDelivery::Event {
            return Err(ConfigError::ValidationError(
                "binary_delivery must be 'event' for the stdio bridge".to_string(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "heartbeat_interval_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(policy) = &self.default_reconnect {
            policy
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("default_reconnect: {}", e)))?;
        }

        let mut seen = HashSet::new();
        for connection in &self.connections {
            if connection.id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "connection id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(connection.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate connection id: {}",
                    connection.id
                )));
            }
            if let Some(policy) = &connection.reconnect {
                policy.validate().map_err(|e| {
                    ConfigError::ValidationError(format!("{}: {}", connection.id, e))
                })?;
            }
        }

        Ok(())
    }

    /// Reconnect policy a startup connection is opened with
    pub fn policy_for(&self, connection: &ConnectionConfig) -> Option<ReconnectPolicy> {
        connection
            .reconnect
            .clone()
            .or_else(|| self.default_reconnect.clone())
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig::new().binary_delivery(self.binary_delivery)
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Log level: {}", self.log_level);
        info!("  Binary delivery: {:?}", self.binary_delivery);
        info!("  Heartbeat interval: {} seconds", self.heartbeat_interval_secs);
        info!(
            "  Default reconnect: {}",
            if self.default_reconnect.is_some() { "enabled" } else { "disabled" }
        );
        info!("  Startup connections: {}", self.connections.len());
        for connection in &self.connections {
            info!("    - {}", connection.id);
        }
    }
}
