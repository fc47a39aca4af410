// crates/query-gate-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Bound enforcement and fail-closed parsing.
// Purpose: Ensure invalid configuration never reaches the gateway.
// Dependencies: query-gate-config, tempfile
// ============================================================================

//! ## Overview
//! Exercises TOML parsing, unknown-field rejection, numeric bounds, and
//! environment-sourced credentials.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    unsafe_code,
    reason = "Test-only assertions; env mutation is confined to one test."
)]

use query_gate_config::ConfigError;
use query_gate_config::ConnectSettings;
use query_gate_config::PASSWORD_ENV_VAR;
use query_gate_config::QueryGateConfig;
use query_gate_config::USER_ENV_VAR;

/// Asserts that validation fails with a message containing `needle`.
fn assert_invalid(result: Result<QueryGateConfig, ConfigError>, needle: &str) {
    match result {
        Err(error) => {
            let message = error.to_string();
            assert!(message.contains(needle), "error '{message}' did not contain '{needle}'");
        }
        Ok(_) => panic!("expected invalid config for '{needle}'"),
    }
}

#[test]
fn defaults_are_valid() {
    let config = QueryGateConfig::default();
    config.validate().unwrap();
    assert_eq!(config.gate.max_complexity, 50);
    assert_eq!(config.gate.max_rows, 10_000);
    assert!(!config.gate.allow_cross_joins);
    assert_eq!(config.limits.rate_max, 60);
    assert_eq!(config.limits.rate_window_seconds, 60);
    assert_eq!(config.approval.ttl_seconds, 300);
    assert_eq!(config.pool.size, 2);
    assert_eq!(config.pool.acquire_timeout_seconds, 30);
    assert_eq!(config.pool.query_timeout_seconds, 5);
    assert_eq!(config.pool.fetch_chunk, 1_000);
    assert_eq!(config.circuit.failure_threshold, 5);
    assert_eq!(config.circuit.recovery_timeout_seconds, 60);
    assert_eq!(config.circuit.success_threshold, 2);
}

#[test]
fn overrides_parse_from_toml() {
    let config = QueryGateConfig::from_toml(
        r#"
        [gate]
        max_complexity = 30
        max_rows = 500
        allow_cross_joins = true

        [pool]
        size = 4
        acquire_timeout_seconds = 10

        [circuit]
        failure_threshold = 3
        "#,
    )
    .unwrap();
    assert_eq!(config.gate.max_complexity, 30);
    assert_eq!(config.gate.max_rows, 500);
    assert!(config.gate.allow_cross_joins);
    assert_eq!(config.pool.size, 4);
    assert_eq!(config.pool.acquire_timeout_seconds, 10);
    assert_eq!(config.circuit.failure_threshold, 3);
    // Untouched sections keep their defaults.
    assert_eq!(config.approval.ttl_seconds, 300);
}

#[test]
fn unknown_fields_are_rejected() {
    let result = QueryGateConfig::from_toml(
        r#"
        [gate]
        max_complexitty = 30
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn unknown_sections_are_rejected() {
    let result = QueryGateConfig::from_toml("[observability]\nenabled = true\n");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn zero_pool_size_is_rejected() {
    assert_invalid(QueryGateConfig::from_toml("[pool]\nsize = 0\n"), "pool.size");
}

#[test]
fn oversized_pool_is_rejected() {
    assert_invalid(QueryGateConfig::from_toml("[pool]\nsize = 33\n"), "pool.size");
}

#[test]
fn zero_rate_window_is_rejected() {
    assert_invalid(
        QueryGateConfig::from_toml("[limits]\nrate_window_seconds = 0\n"),
        "limits.rate_window_seconds",
    );
}

#[test]
fn approval_ttl_bounds_are_enforced() {
    assert_invalid(
        QueryGateConfig::from_toml("[approval]\nttl_seconds = 5\n"),
        "approval.ttl_seconds",
    );
    assert_invalid(
        QueryGateConfig::from_toml("[approval]\nttl_seconds = 7200\n"),
        "approval.ttl_seconds",
    );
}

#[test]
fn zero_fetch_chunk_is_rejected() {
    assert_invalid(QueryGateConfig::from_toml("[pool]\nfetch_chunk = 0\n"), "pool.fetch_chunk");
}

#[test]
fn zero_complexity_ceiling_is_rejected() {
    assert_invalid(QueryGateConfig::from_toml("[gate]\nmax_complexity = 0\n"), "gate.max_complexity");
}

#[test]
fn file_sink_requires_a_path() {
    assert_invalid(QueryGateConfig::from_toml("[audit]\nsink = \"file\"\n"), "audit.path");
}

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = QueryGateConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config.pool.size, 2);
}

#[test]
fn present_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("query-gate.toml");
    std::fs::write(&path, "[gate]\nmax_rows = 250\n").unwrap();
    let config = QueryGateConfig::load(Some(&path)).unwrap();
    assert_eq!(config.gate.max_rows, 250);
}

#[test]
fn present_but_invalid_config_file_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("query-gate.toml");
    std::fs::write(&path, "[pool]\nsize = 0\n").unwrap();
    assert!(QueryGateConfig::load(Some(&path)).is_err());
}

#[test]
fn connection_credentials_come_from_the_environment() {
    // SAFETY: this test is the only one in the binary touching these vars.
    unsafe {
        std::env::remove_var(USER_ENV_VAR);
        std::env::remove_var(PASSWORD_ENV_VAR);
    }
    assert!(matches!(ConnectSettings::from_env(), Err(ConfigError::MissingEnv(_))));

    unsafe {
        std::env::set_var(USER_ENV_VAR, "app_reader");
        std::env::set_var(PASSWORD_ENV_VAR, "hunter2-secret");
    }
    let settings = ConnectSettings::from_env().unwrap();
    assert_eq!(settings.user, "app_reader");

    // The password never leaks through Debug.
    let debugged = format!("{settings:?}");
    assert!(!debugged.contains("hunter2-secret"));
    assert!(debugged.contains("<redacted>"));

    unsafe {
        std::env::remove_var(USER_ENV_VAR);
        std::env::remove_var(PASSWORD_ENV_VAR);
    }
}
