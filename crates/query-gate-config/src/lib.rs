// crates/query-gate-config/src/lib.rs
// ============================================================================
// Module: Query Gate Config Library
// Description: Public API surface for gateway configuration.
// Purpose: Expose strict config loading with a single source of truth.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Fail-closed configuration for the query gateway: a TOML file with hard
//! bounds on every option, and database credentials read once from the
//! process environment. Missing credentials are a fatal startup error.
//!
//! Security posture: configuration is untrusted input and must be validated.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::config::ApprovalConfig;
pub use crate::config::AuditConfig;
pub use crate::config::AuditSinkKind;
pub use crate::config::CONFIG_ENV_VAR;
pub use crate::config::CONNECT_ENV_VAR;
pub use crate::config::CircuitConfig;
pub use crate::config::ConfigError;
pub use crate::config::ConnectSettings;
pub use crate::config::GateConfig;
pub use crate::config::LimitsConfig;
pub use crate::config::PASSWORD_ENV_VAR;
pub use crate::config::PoolConfig;
pub use crate::config::QueryGateConfig;
pub use crate::config::USER_ENV_VAR;
