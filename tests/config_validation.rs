//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use room_intercept::config::{InterceptorConfig, LoggingConfig, ProxyConfig, MAX_FRAME_SIZE};
use room_intercept::protocol::ClientType;
use std::collections::HashMap;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = InterceptorConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert_eq!(config.proxy.max_frame_size, MAX_FRAME_SIZE);
}

#[test]
fn test_invalid_listen_address() {
    let mut config = InterceptorConfig::default();
    config.proxy.listen_address = "invalid_address".to_string();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Invalid listen address")));
}

#[test]
fn test_empty_remote_address() {
    let mut config = InterceptorConfig::default();
    config.proxy.remote_address = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Remote address cannot be empty")));
}

#[test]
fn test_listen_and_remote_must_differ() {
    let proxy = ProxyConfig {
        remote_address: ProxyConfig::default().listen_address,
        ..ProxyConfig::default()
    };
    assert!(proxy.validate().iter().any(|e| e.contains("must differ")));
}

#[test]
fn test_frame_size_bounds() {
    let mut config = InterceptorConfig::default();
    config.proxy.max_frame_size = 100;
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Max frame size too small")));

    config.proxy.max_frame_size = 64 * 1024 * 1024;
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Max frame size too large")));
}

#[test]
fn test_connect_timeout_bounds() {
    let mut config = InterceptorConfig::default();
    config.proxy.connect_timeout = Duration::from_millis(10);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Connect timeout too short")));
}

#[test]
fn test_zero_response_timeout() {
    let mut config = InterceptorConfig::default();
    config.correlator.default_timeout = Duration::ZERO;
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Response timeout cannot be 0")));
}

#[test]
fn test_logging_requires_an_output() {
    let logging = LoggingConfig {
        log_to_console: false,
        log_to_file: false,
        ..LoggingConfig::default()
    };
    assert!(logging
        .validate()
        .iter()
        .any(|e| e.contains("At least one logging output")));

    let logging = LoggingConfig {
        log_to_file: true,
        log_file_path: None,
        ..LoggingConfig::default()
    };
    assert!(logging
        .validate()
        .iter()
        .any(|e| e.contains("log_file_path must be specified")));
}

#[test]
fn test_validate_strict_joins_errors() {
    let mut config = InterceptorConfig::default();
    config.proxy.listen_address = String::new();
    config.logging.app_name = String::new();

    let err = config.validate_strict().unwrap_err().to_string();
    assert!(err.contains("Listen address cannot be empty"));
    assert!(err.contains("Application name cannot be empty"));
}

#[test]
fn test_toml_roundtrip_and_partial_sections() {
    let text = InterceptorConfig::example_config();
    let parsed = InterceptorConfig::from_toml(&text).expect("example config parses");
    assert_eq!(parsed.proxy.client, ClientType::Flash);
    assert_eq!(parsed.logging.log_level, Level::INFO);

    let partial = r#"
        [proxy]
        listen_address = "127.0.0.1:40000"
        remote_address = "10.0.0.2:30000"
        client = "unity"
        client_version = "UNITY1"
        max_frame_size = 65536
        connect_timeout = 2000
        shutdown_timeout = 1000

        [logging]
        app_name = "intercept"
        log_level = "debug"
        log_to_console = true
        log_to_file = false
        json_format = true

        [mimic]
        whisper = false
    "#;
    let config = InterceptorConfig::from_toml(partial).unwrap();
    assert_eq!(config.proxy.client, ClientType::Unity);
    assert_eq!(config.proxy.connect_timeout, Duration::from_secs(2));
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(!config.mimic.whisper);
    assert!(config.mimic.figure);
    assert_eq!(
        config.correlator.default_timeout,
        Duration::from_millis(3000)
    );
    assert!(config.validate().is_empty());
}

#[test]
fn test_invalid_toml_is_a_config_error() {
    let err = InterceptorConfig::from_toml("[proxy\nlisten_address = 1").unwrap_err();
    assert!(err.to_string().contains("Failed to parse TOML"));
}

#[test]
fn test_env_overrides() {
    let vars: HashMap<&str, &str> = [
        ("ROOM_INTERCEPT_CLIENT", "shockwave"),
        ("ROOM_INTERCEPT_REMOTE_ADDRESS", "10.1.1.1:30000"),
        ("ROOM_INTERCEPT_RESPONSE_TIMEOUT_MS", "750"),
        ("ROOM_INTERCEPT_LOG_LEVEL", "warn"),
    ]
    .into_iter()
    .collect();

    let mut config = InterceptorConfig::default();
    config
        .apply_env(|key| vars.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.proxy.client, ClientType::Shockwave);
    assert_eq!(config.proxy.remote_address, "10.1.1.1:30000");
    assert_eq!(config.correlator.default_timeout, Duration::from_millis(750));
    assert_eq!(config.logging.log_level, Level::WARN);
}

#[test]
fn test_env_rejects_unknown_client() {
    let mut config = InterceptorConfig::default();
    let result = config.apply_env(|key| {
        (key == "ROOM_INTERCEPT_CLIENT").then(|| "dreamcast".to_string())
    });
    assert!(result.is_err());
}

#[test]
fn test_default_with_overrides() {
    let config = InterceptorConfig::default_with_overrides(|c| {
        c.proxy.client = ClientType::Unity;
        c.mimic.dance = false;
    });
    assert_eq!(config.proxy.client, ClientType::Unity);
    assert!(!config.mimic.dance);
}
