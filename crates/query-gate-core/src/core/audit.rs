// crates/query-gate-core/src/core/audit.rs
// ============================================================================
// Module: Audit Event Values
// Description: Structured lifecycle records for every gateway request branch.
// Purpose: Produce audit events as values handed to sinks, not log calls.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each request branch produces one or more [`AuditEvent`] values which the
//! dispatcher hands to a sink. Components never write logs themselves; they
//! return outcomes and the dispatcher translates them into events, keeping
//! the audit stream complete and ordered per request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::time::Timestamp;
use crate::tooling::ToolName;

// ============================================================================
// SECTION: Audit Kinds
// ============================================================================

/// Lifecycle classification of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    /// Request entered the pipeline.
    Attempt,
    /// Request was rejected by validation or identifier checks.
    Block,
    /// Statement executed and rows were returned.
    Success,
    /// Statement execution failed.
    Failure,
    /// Preview issued an approval token.
    ApprovalIssue,
    /// Execute consumed a matching approval token.
    ApprovalConsume,
    /// Execute presented a missing, stale, or mismatched token.
    ApprovalReject,
    /// Request exceeded the rate limit.
    RateLimit,
    /// Circuit breaker opened or refused a call while open.
    CircuitOpen,
    /// Circuit breaker closed after recovery.
    CircuitClose,
    /// Circuit breaker entered the probing state.
    CircuitHalfOpen,
}

// ============================================================================
// SECTION: Audit Event
// ============================================================================

/// Structured audit record, serialized as one JSON object per line.
///
/// # Invariants
/// - `ts` is RFC-3339 with millisecond precision.
/// - `token_id` carries only the truncated audit prefix, never a full token.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Event timestamp.
    pub ts: String,
    /// Lifecycle classification.
    pub kind: AuditKind,
    /// Operation that produced the event.
    pub op: ToolName,
    /// Human-readable reason for blocks, rejections, and failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Complexity score when validation ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u32>,
    /// Row count on successful executions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    /// Truncated approval token prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    /// Pool slot index that ran the statement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
    /// Circuit phase label for circuit events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<&'static str>,
}

impl AuditEvent {
    /// Creates an event with the required fields and no optional detail.
    #[must_use]
    pub fn new(ts: Timestamp, kind: AuditKind, op: ToolName) -> Self {
        Self {
            ts: ts.to_rfc3339_millis(),
            kind,
            op,
            reason: None,
            complexity: None,
            rows: None,
            token_id: None,
            slot: None,
            phase: None,
        }
    }

    /// Attaches a reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a complexity score.
    #[must_use]
    pub const fn with_complexity(mut self, complexity: u32) -> Self {
        self.complexity = Some(complexity);
        self
    }

    /// Attaches a row count.
    #[must_use]
    pub const fn with_rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Attaches a truncated token prefix.
    #[must_use]
    pub fn with_token_prefix(mut self, prefix: &str) -> Self {
        self.token_id = Some(prefix.to_string());
        self
    }

    /// Attaches a pool slot index.
    #[must_use]
    pub const fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Attaches a circuit phase label.
    #[must_use]
    pub const fn with_phase(mut self, phase: &'static str) -> Self {
        self.phase = Some(phase);
        self
    }
}
