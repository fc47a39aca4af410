// crates/query-gate-mcp/src/config.rs
// ============================================================================
// Module: MCP Configuration (Re-export)
// Description: Re-export canonical query gateway config types.
// Purpose: Preserve the dispatcher's public API while centralizing config.
// Dependencies: query-gate-config
// ============================================================================

//! ## Overview
//! This module re-exports the canonical configuration model from
//! `query-gate-config` to keep dispatcher callers stable while enforcing a
//! single source of truth.

/// Re-export canonical config types and helpers.
pub use query_gate_config::*;
