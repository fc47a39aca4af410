// crates/query-gate-config/src/config.rs
// ============================================================================
// Module: Query Gate Configuration
// Description: Configuration loading and validation for the query gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, secrecy
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits and
//! unknown-field rejection. Every numeric option is validated against hard
//! bounds; an invalid file fails closed rather than running with surprising
//! limits. Database credentials are read only from the process environment so
//! they never appear on command lines or in config files.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "query-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "QUERY_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Environment variable carrying the connect descriptor.
pub const CONNECT_ENV_VAR: &str = "ORACLE_CONNECT";
/// Environment variable carrying the database user.
pub const USER_ENV_VAR: &str = "ORACLE_USER";
/// Environment variable carrying the database password.
pub const PASSWORD_ENV_VAR: &str = "ORACLE_PASSWORD";

/// Maximum accepted complexity ceiling.
pub const MAX_MAX_COMPLEXITY: u32 = 10_000;
/// Maximum accepted row cap.
pub const MAX_MAX_ROWS: u32 = 1_000_000;
/// Maximum requests per rate window.
pub const MAX_RATE_MAX: u32 = 100_000;
/// Minimum rate window in seconds.
pub const MIN_RATE_WINDOW_SECONDS: u64 = 1;
/// Maximum rate window in seconds.
pub const MAX_RATE_WINDOW_SECONDS: u64 = 3_600;
/// Minimum approval TTL in seconds.
pub const MIN_APPROVAL_TTL_SECONDS: u64 = 10;
/// Maximum approval TTL in seconds.
pub const MAX_APPROVAL_TTL_SECONDS: u64 = 3_600;
/// Maximum pool size.
pub const MAX_POOL_SIZE: usize = 32;
/// Minimum acquire timeout in seconds.
pub const MIN_ACQUIRE_TIMEOUT_SECONDS: u64 = 1;
/// Maximum acquire timeout in seconds.
pub const MAX_ACQUIRE_TIMEOUT_SECONDS: u64 = 300;
/// Minimum per-statement timeout in seconds.
pub const MIN_QUERY_TIMEOUT_SECONDS: u64 = 1;
/// Maximum per-statement timeout in seconds.
pub const MAX_QUERY_TIMEOUT_SECONDS: u64 = 600;
/// Maximum fetch chunk in rows.
pub const MAX_FETCH_CHUNK: u32 = 100_000;
/// Maximum failure threshold.
pub const MAX_FAILURE_THRESHOLD: u32 = 1_000;
/// Minimum recovery timeout in seconds.
pub const MIN_RECOVERY_TIMEOUT_SECONDS: u64 = 1;
/// Maximum recovery timeout in seconds.
pub const MAX_RECOVERY_TIMEOUT_SECONDS: u64 = 3_600;
/// Maximum success threshold.
pub const MAX_SUCCESS_THRESHOLD: u32 = 100;
/// Maximum audit buffer capacity.
pub const MAX_AUDIT_BUFFER: usize = 65_536;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation failure.
///
/// # Invariants
/// - Variants are stable for startup error classification.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {message}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Config file exceeds the size limit.
    #[error("config {path} exceeds {MAX_CONFIG_FILE_SIZE} bytes")]
    TooLarge {
        /// Path that exceeded the limit.
        path: PathBuf,
    },
    /// Config file failed to parse.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// A config value violates its bounds.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// A required credential environment variable is missing or empty.
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Query gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QueryGateConfig {
    /// Validator options.
    pub gate: GateConfig,
    /// Rate limiter options.
    pub limits: LimitsConfig,
    /// Approval token options.
    pub approval: ApprovalConfig,
    /// Session pool options.
    pub pool: PoolConfig,
    /// Circuit breaker options.
    pub circuit: CircuitConfig,
    /// Audit emitter options.
    pub audit: AuditConfig,
}

/// Validator options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GateConfig {
    /// Reject statements scoring above this ceiling.
    pub max_complexity: u32,
    /// Row cap applied when a statement carries no bound.
    pub max_rows: u32,
    /// Permit comma-separated FROM entries and explicit CROSS JOIN.
    pub allow_cross_joins: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_complexity: 50,
            max_rows: 10_000,
            allow_cross_joins: false,
        }
    }
}

/// Rate limiter options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LimitsConfig {
    /// Maximum admitted requests per window.
    pub rate_max: u32,
    /// Window length in seconds.
    pub rate_window_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_max: 60,
            rate_window_seconds: 60,
        }
    }
}

/// Approval token options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ApprovalConfig {
    /// Token validity window in seconds.
    pub ttl_seconds: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
        }
    }
}

/// Session pool options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PoolConfig {
    /// Number of long-lived sessions.
    pub size: usize,
    /// Seconds to wait for an idle session.
    pub acquire_timeout_seconds: u64,
    /// Per-statement timeout in seconds (server- and client-side).
    pub query_timeout_seconds: u64,
    /// Fetch chunk configured on every session, in rows.
    pub fetch_chunk: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 2,
            acquire_timeout_seconds: 30,
            query_timeout_seconds: 5,
            fetch_chunk: 1_000,
        }
    }
}

/// Circuit breaker options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CircuitConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Cool-down before a probe is admitted, in seconds.
    pub recovery_timeout_seconds: u64,
    /// Consecutive probe successes that close the circuit.
    pub success_threshold: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_seconds: 60,
            success_threshold: 2,
        }
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines to stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events (test and embedding use only).
    Noop,
}

/// Audit emitter options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AuditConfig {
    /// Destination sink.
    pub sink: AuditSinkKind,
    /// Log path when the file sink is selected.
    pub path: Option<PathBuf>,
    /// Bounded emitter capacity in events.
    pub buffer: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: AuditSinkKind::Stderr,
            path: None,
            buffer: 256,
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl QueryGateConfig {
    /// Loads configuration from the given path, the `QUERY_GATE_CONFIG`
    /// environment variable, or the default filename, in that order. A
    /// missing file yields defaults; a present file must parse and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, oversized,
    /// unparsable, or out of bounds.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path.map_or_else(
            || env::var(CONFIG_ENV_VAR).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from),
            Path::to_path_buf,
        );
        if !resolved.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let metadata = fs::metadata(&resolved).map_err(|err| ConfigError::Io {
            path: resolved.clone(),
            message: err.to_string(),
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                path: resolved,
            });
        }
        let text = fs::read_to_string(&resolved).map_err(|err| ConfigError::Io {
            path: resolved.clone(),
            message: err.to_string(),
        })?;
        Self::from_toml(&text)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every option against its hard bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        bound_u32("gate.max_complexity", self.gate.max_complexity, 1, MAX_MAX_COMPLEXITY)?;
        bound_u32("gate.max_rows", self.gate.max_rows, 1, MAX_MAX_ROWS)?;
        bound_u32("limits.rate_max", self.limits.rate_max, 1, MAX_RATE_MAX)?;
        bound_u64(
            "limits.rate_window_seconds",
            self.limits.rate_window_seconds,
            MIN_RATE_WINDOW_SECONDS,
            MAX_RATE_WINDOW_SECONDS,
        )?;
        bound_u64(
            "approval.ttl_seconds",
            self.approval.ttl_seconds,
            MIN_APPROVAL_TTL_SECONDS,
            MAX_APPROVAL_TTL_SECONDS,
        )?;
        bound_usize("pool.size", self.pool.size, 1, MAX_POOL_SIZE)?;
        bound_u64(
            "pool.acquire_timeout_seconds",
            self.pool.acquire_timeout_seconds,
            MIN_ACQUIRE_TIMEOUT_SECONDS,
            MAX_ACQUIRE_TIMEOUT_SECONDS,
        )?;
        bound_u64(
            "pool.query_timeout_seconds",
            self.pool.query_timeout_seconds,
            MIN_QUERY_TIMEOUT_SECONDS,
            MAX_QUERY_TIMEOUT_SECONDS,
        )?;
        bound_u32("pool.fetch_chunk", self.pool.fetch_chunk, 1, MAX_FETCH_CHUNK)?;
        bound_u32(
            "circuit.failure_threshold",
            self.circuit.failure_threshold,
            1,
            MAX_FAILURE_THRESHOLD,
        )?;
        bound_u64(
            "circuit.recovery_timeout_seconds",
            self.circuit.recovery_timeout_seconds,
            MIN_RECOVERY_TIMEOUT_SECONDS,
            MAX_RECOVERY_TIMEOUT_SECONDS,
        )?;
        bound_u32(
            "circuit.success_threshold",
            self.circuit.success_threshold,
            1,
            MAX_SUCCESS_THRESHOLD,
        )?;
        bound_usize("audit.buffer", self.audit.buffer, 1, MAX_AUDIT_BUFFER)?;
        if self.audit.sink == AuditSinkKind::File && self.audit.path.is_none() {
            return Err(ConfigError::Invalid(
                "audit.path is required when audit.sink is file".to_string(),
            ));
        }
        Ok(())
    }
}

/// Checks a `u32` option against inclusive bounds.
fn bound_u32(name: &str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{name} must be between {min} and {max}")));
    }
    Ok(())
}

/// Checks a `u64` option against inclusive bounds.
fn bound_u64(name: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{name} must be between {min} and {max}")));
    }
    Ok(())
}

/// Checks a `usize` option against inclusive bounds.
fn bound_usize(name: &str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{name} must be between {min} and {max}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Connection Settings
// ============================================================================

/// Database connection settings read once at startup from the environment.
///
/// # Invariants
/// - The password never appears in `Debug` output or serialized forms.
pub struct ConnectSettings {
    /// Connect descriptor, e.g. `host:port/service`.
    pub connect: String,
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: SecretString,
}

impl fmt::Debug for ConnectSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectSettings")
            .field("connect", &self.connect)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectSettings {
    /// Reads connection settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] when the user or password is
    /// missing or empty; a missing connect descriptor falls back to the
    /// local loopback listener.
    pub fn from_env() -> Result<Self, ConfigError> {
        let connect =
            env::var(CONNECT_ENV_VAR).unwrap_or_else(|_| String::from("127.0.0.1:1521/XEPDB1"));
        let user = required_env(USER_ENV_VAR)?;
        let password = required_env(PASSWORD_ENV_VAR)?;
        Ok(Self {
            connect,
            user,
            password: SecretString::from(password),
        })
    }
}

/// Reads a required, non-empty environment variable.
fn required_env(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}
