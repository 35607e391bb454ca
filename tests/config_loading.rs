//! Integration test: Configuration utilities
//!
//! Tests config path resolution and YAML loading for the bridge binary.

use sockmux_bridge::bin_common::{load_config_from_env, BridgeConfig, ConfigError, ConfigType};
use sockmux_bridge::sockmux::{BinaryDelivery, CloseCode};
use std::env;
use std::path::PathBuf;

fn temp_config(name: &str, contents: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("sockmux-{}-{}.yaml", name, std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_bridge_config_path() {
    // Default when unset, env var when set
    env::remove_var("SOCKMUX_CONFIG_PATH");
    let config_path = load_config_from_env(ConfigType::Bridge);
    assert_eq!(config_path.to_str().unwrap(), "config/bridge.yaml");

    env::set_var("SOCKMUX_CONFIG_PATH", "elsewhere/bridge.yaml");
    let config_path = load_config_from_env(ConfigType::Bridge);
    assert_eq!(config_path.to_str().unwrap(), "elsewhere/bridge.yaml");
    env::remove_var("SOCKMUX_CONFIG_PATH");
}

#[test]
fn test_custom_config() {
    let custom = ConfigType::Custom("custom/path.yaml".to_string());
    let config_path = load_config_from_env(custom);

    assert_eq!(config_path.to_str().unwrap(), "custom/path.yaml");
}

#[test]
fn test_config_type_default_paths() {
    assert_eq!(ConfigType::Bridge.default_path(), "config/bridge.yaml");

    let custom = ConfigType::Custom("test.yaml".to_string());
    assert_eq!(custom.default_path(), "test.yaml");
}

#[test]
fn test_missing_file_uses_defaults() {
    let config = BridgeConfig::load("definitely/not/here.yaml").unwrap();
    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn test_load_full_config() {
    let path = temp_config(
        "full",
        r#"
log_level: debug
binary_delivery: event
heartbeat_interval_secs: 60
default_reconnect:
  max_retries: 4
  initial_delay_ms: 500
  max_delay_ms: 8000
  backoff_multiplier: 1.5
  jitter: false
  skip_codes: [1000, 4403]
connections:
  - id: wss://stream.example.com/feed
    protocols: [v2.json]
  - id: wss://stream.example.com/quiet
    reconnect: null
"#,
    );

    let config = BridgeConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.binary_delivery, BinaryDelivery::Event);
    assert_eq!(config.heartbeat_interval_secs, 60);
    assert_eq!(config.connections.len(), 2);
    assert_eq!(config.connections[0].protocols, vec!["v2.json".to_string()]);

    let policy = config.default_reconnect.clone().unwrap();
    assert_eq!(policy.max_retries, Some(4));
    assert_eq!(policy.initial_delay_ms, 500);
    assert_eq!(policy.backoff_multiplier, 1.5);
    assert!(!policy.jitter);
    assert!(policy.skip_codes.contains(&CloseCode::Normal));
    assert!(policy.skip_codes.contains(&CloseCode::Custom(4403)));
}

#[test]
fn test_invalid_policy_is_rejected() {
    let path = temp_config(
        "invalid",
        r#"
default_reconnect:
  initial_delay_ms: 5000
  max_delay_ms: 1000
"#,
    );

    let result = BridgeConfig::load(&path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_bridge_delivery_is_rejected() {
    let path = temp_config("bridge-delivery", "binary_delivery: bridge\n");

    let result = BridgeConfig::load(&path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_malformed_yaml_is_rejected() {
    let path = temp_config("malformed", "connections: [ {id: ");

    let result = BridgeConfig::load(&path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(ConfigError::YamlError(_))));
}
