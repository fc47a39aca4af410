// crates/query-gate-pool/src/session.rs
// ============================================================================
// Module: Session Boundary
// Description: Opaque driver session and factory traits.
// Purpose: Keep the pool independent of any concrete Oracle driver.
// Dependencies: query-gate-core, thiserror
// ============================================================================

//! ## Overview
//! The raw driver is an external collaborator: an opaque session that accepts
//! SQL text and returns tabular rows or an error. Sessions are blocking and
//! single-threaded; the pool serializes use per slot and runs statements on
//! blocking threads. Implementations must honor the per-statement timeout
//! server-side and apply the fetch chunk so result transfer stays bounded
//! even before the row cap applies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use query_gate_core::TableRows;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Health probe statement run before a re-established slot returns to IDLE.
pub const HEALTH_PROBE_SQL: &str = "SELECT 1 FROM DUAL";

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Per-statement execution limits handed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementLimits {
    /// Server-side statement timeout.
    pub timeout: Duration,
    /// Fetch chunk in rows.
    pub fetch_chunk: u32,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Session failure.
///
/// # Invariants
/// - `Statement` leaves the session usable; `Transport` means the underlying
///   connection is gone and the slot must be re-established.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The statement failed server-side; the session remains usable.
    #[error("statement failed: {0}")]
    Statement(String),
    /// The connection failed; the session must be re-established.
    #[error("session transport failed: {0}")]
    Transport(String),
}

impl SessionError {
    /// Returns true when the underlying connection is broken.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// One long-lived, blocking database session.
pub trait OracleSession: Send {
    /// Runs a statement and returns its tabular result.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Statement`] for server-side statement errors
    /// and [`SessionError::Transport`] when the connection is broken.
    fn run(&mut self, sql: &str, limits: StatementLimits) -> Result<TableRows, SessionError>;

    /// Runs the health probe.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the probe fails.
    fn probe(&mut self) -> Result<(), SessionError>;
}

/// Connects new sessions for pool initialization and slot re-establishment.
pub trait SessionFactory: Send + Sync {
    /// Opens a new session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the connection cannot be established.
    fn connect(&self) -> Result<Box<dyn OracleSession>, SessionError>;
}
