// crates/query-gate-core/src/lib.rs
// ============================================================================
// Module: Query Gate Core Library
// Description: Public API surface for the query gateway admission pipeline.
// Purpose: Expose the validator, limiters, approvals, and shared value types.
// Dependencies: crate::{admission, core, tooling}
// ============================================================================

//! ## Overview
//! Query Gate core provides the defense-in-depth admission pipeline that sits
//! in front of a small pool of database sessions: canonical SQL form,
//! statement validation with complexity scoring, the preview-then-approve
//! token workflow, a shared rate limiter, and a circuit breaker. It is
//! driver-agnostic and integrates through explicit interfaces; clocks and
//! entropy are injected so every TTL and token is testable.
//!
//! Security posture: all statement text and identifiers are untrusted input
//! and must pass validation before reaching a session.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod admission;
pub mod core;
pub mod tooling;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::admission::ApprovalError;
pub use crate::admission::ApprovalRegistry;
pub use crate::admission::ApprovalSettings;
pub use crate::admission::ApprovalTicket;
pub use crate::admission::CircuitBreaker;
pub use crate::admission::CircuitOpen;
pub use crate::admission::CircuitPhase;
pub use crate::admission::CircuitSettings;
pub use crate::admission::CircuitSnapshot;
pub use crate::admission::CircuitTransition;
pub use crate::admission::ComplexityBreakdown;
pub use crate::admission::QueryValidator;
pub use crate::admission::RateLimitSettings;
pub use crate::admission::RateLimited;
pub use crate::admission::RateLimiter;
pub use crate::admission::ValidatorConfig;
pub use crate::admission::Verdict;
pub use crate::core::AuditEvent;
pub use crate::core::AuditKind;
pub use crate::core::CanonicalHash;
pub use crate::core::CanonicalSql;
pub use crate::core::Clock;
pub use crate::core::ColumnInfo;
pub use crate::core::Entropy;
pub use crate::core::IdentifierError;
pub use crate::core::ManualClock;
pub use crate::core::OsEntropy;
pub use crate::core::Row;
pub use crate::core::SequenceEntropy;
pub use crate::core::SharedClock;
pub use crate::core::SharedEntropy;
pub use crate::core::SqlIdentifier;
pub use crate::core::SystemClock;
pub use crate::core::TableRows;
pub use crate::core::Timestamp;
pub use crate::core::TokenId;
pub use crate::tooling::ToolName;
