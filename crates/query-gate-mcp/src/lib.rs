// crates/query-gate-mcp/src/lib.rs
// ============================================================================
// Module: Query Gate MCP Library
// Description: Operation dispatcher and audit emitter for the gateway.
// Purpose: Expose the tool router over the admission pipeline and pool.
// Dependencies: query-gate-core, query-gate-pool, query-gate-config
// ============================================================================

//! ## Overview
//! The dispatcher exposes four operations to the tool-invocation protocol:
//! `preview_query`, `query_oracle`, `describe_table`, and `list_tables`. It
//! orders the admission pipeline (rate limiter, approval registry,
//! validator, circuit breaker, pool) and emits structured audit events for
//! every request branch. The protocol transport itself is an external
//! collaborator; embedders call [`ToolRouter::handle_call`] with a name and
//! payload.
//!
//! Security posture: the dispatcher is a trust boundary; all inputs are
//! untrusted and must pass validation before any session is touched.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod config;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::audit::AuditSink;
pub use crate::audit::BufferedAuditEmitter;
pub use crate::audit::FileAuditSink;
pub use crate::audit::NoopAuditSink;
pub use crate::audit::StderrAuditSink;
pub use crate::audit::sink_from_config;
pub use crate::config::QueryGateConfig;
pub use crate::tools::ApprovalGrant;
pub use crate::tools::DescribeTableRequest;
pub use crate::tools::DescribeTableResponse;
pub use crate::tools::ListTablesRequest;
pub use crate::tools::ListTablesResponse;
pub use crate::tools::OracleQueryRequest;
pub use crate::tools::OracleQueryResponse;
pub use crate::tools::PreviewQueryRequest;
pub use crate::tools::PreviewQueryResponse;
pub use crate::tools::RouterParams;
pub use crate::tools::TableColumn;
pub use crate::tools::ToolError;
pub use crate::tools::ToolRouter;
pub use crate::tools::ValidationReport;
pub use crate::tools::pool_settings;
