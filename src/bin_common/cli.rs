//! CLI utilities for binaries
//!
//! Handles configuration path resolution and environment variables
//! for the binary executables.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Bridge configuration (config/bridge.yaml)
    Bridge,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Bridge => "config/bridge.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Bridge => "SOCKMUX_CONFIG_PATH",
            ConfigType::Custom(_) => "SOCKMUX_CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// A `Custom` path always wins over the environment.
///
/// # Examples
/// ```
/// use sockmux_bridge::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Custom("bridge.yaml".into()));
/// assert_eq!(path.to_str(), Some("bridge.yaml"));
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return PathBuf::from(path);
    }
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Config type from the first command line argument, if any
pub fn config_type_from_args(args: &[String]) -> ConfigType {
    match args.first() {
        Some(path) => ConfigType::Custom(path.clone()),
        None => ConfigType::Bridge,
    }
}
