//! Sockmux bridge - Main Library
//!
//! ## Architecture
//!
//! - **sockmux**: the connection manager library (re-exported from workspace)
//! - **bin_common**: shared utilities for the binaries (CLI, config, logging, runner)
//!
//! ## Usage in Binaries
//!
//! ```rust,no_run
//! use sockmux_bridge::bin_common::{load_config_from_env, BridgeConfig, ConfigType};
//!
//! let path = load_config_from_env(ConfigType::Bridge);
//! let config = BridgeConfig::load(path).unwrap();
//! ```

// Re-export workspace library for convenience
pub use sockmux;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod bridge;
    pub mod cli;
    pub mod config;
    pub mod logging;
    pub mod runner;
    pub mod shutdown;

    pub use bridge::{BridgeApp, BridgeStats};
    pub use cli::{config_type_from_args, load_config_from_env, parse_args, ConfigType};
    pub use config::{BridgeConfig, ConfigError, ConnectionConfig};
    pub use logging::init_tracing_with_level;
    pub use runner::{BinaryRunner, RunConfig};
    pub use shutdown::ShutdownManager;
}
