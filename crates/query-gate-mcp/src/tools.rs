// crates/query-gate-mcp/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Operation dispatch for the guarded query gateway.
// Purpose: Order the admission pipeline and emit audit events per branch.
// Dependencies: query-gate-core, query-gate-pool
// ============================================================================

//! ## Overview
//! The tool router owns one instance each of the validator, rate limiter,
//! approval registry, and circuit breaker, and dispatches the four exposed
//! operations over them. Every request emits an ATTEMPT event first and
//! exactly one outcome event per branch, in pipeline order.
//! Security posture: all operation inputs are untrusted; statement text and
//! identifiers must pass validation before any session is touched.
//!
//! ## Layer Responsibilities
//! - Route named operations to typed handlers.
//! - Enforce rate limiting, approval consumption, validation, and the
//!   circuit breaker, in that order.
//! - Emit audit events for every request branch.
//!
//! ## Invariants
//! - A missing, wrong, expired, or mismatched token rejects before any
//!   database call.
//! - Driver detail reaches the audit stream; callers see sanitized reasons.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use query_gate_core::ApprovalError;
use query_gate_core::ApprovalRegistry;
use query_gate_core::ApprovalSettings;
use query_gate_core::AuditEvent;
use query_gate_core::AuditKind;
use query_gate_core::CanonicalSql;
use query_gate_core::CircuitBreaker;
use query_gate_core::CircuitOpen;
use query_gate_core::CircuitSettings;
use query_gate_core::CircuitSnapshot;
use query_gate_core::CircuitTransition;
use query_gate_core::ColumnInfo;
use query_gate_core::IdentifierError;
use query_gate_core::OsEntropy;
use query_gate_core::QueryValidator;
use query_gate_core::RateLimitSettings;
use query_gate_core::RateLimited;
use query_gate_core::RateLimiter;
use query_gate_core::Row;
use query_gate_core::SharedClock;
use query_gate_core::SharedEntropy;
use query_gate_core::SqlIdentifier;
use query_gate_core::SystemClock;
use query_gate_core::Timestamp;
use query_gate_core::TokenId;
use query_gate_core::ToolName;
use query_gate_core::ValidatorConfig;
use query_gate_core::Verdict;
use query_gate_pool::PoolError;
use query_gate_pool::PoolHealth;
use query_gate_pool::PoolSettings;
use query_gate_pool::RunOutcome;
use query_gate_pool::SessionPool;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::audit::BufferedAuditEmitter;
use crate::config::PoolConfig;
use crate::config::QueryGateConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum driver error length returned to callers.
const MAX_DRIVER_REASON_LENGTH: usize = 200;

// ============================================================================
// SECTION: Tool Errors
// ============================================================================

/// Operation failure surfaced to the protocol layer.
///
/// # Invariants
/// - `kind` labels are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Operation name not recognized.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Request payload failed to deserialize.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Response payload failed to serialize.
    #[error("serialization failure")]
    Serialization,
    /// Shared rate limit exceeded.
    #[error(transparent)]
    RateLimited(#[from] RateLimited),
    /// Statement rejected by the validator.
    #[error("statement rejected: {reason}")]
    ValidationRejected {
        /// Rejection reason.
        reason: String,
        /// Complexity score at rejection time.
        complexity: u32,
    },
    /// Approval token missing, stale, or mismatched.
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    /// Circuit breaker refused the call.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpen),
    /// No idle session within the acquire timeout.
    #[error("no idle session within {waited_ms}ms")]
    PoolTimeout {
        /// Milliseconds waited before giving up.
        waited_ms: u64,
    },
    /// Statement failed at the driver; reason is sanitized.
    #[error("driver error: {0}")]
    Driver(String),
    /// Identifier failed the whitelist check.
    #[error("invalid identifier: {0}")]
    BadIdentifier(#[from] IdentifierError),
}

impl ToolError {
    /// Returns the stable error kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidParams(_) => "invalid_params",
            Self::Serialization => "serialization",
            Self::RateLimited(_) => "rate_limited",
            Self::ValidationRejected {
                ..
            } => "validation_rejected",
            Self::Approval(ApprovalError::Required) => "approval_required",
            Self::Approval(ApprovalError::Invalid) => "approval_invalid",
            Self::Approval(ApprovalError::Expired) => "approval_expired",
            Self::Approval(ApprovalError::Mismatch) => "approval_mismatch",
            Self::CircuitOpen(_) => "circuit_open",
            Self::PoolTimeout {
                ..
            } => "pool_timeout",
            Self::Driver(_) => "driver_error",
            Self::BadIdentifier(_) => "bad_identifier",
        }
    }

    /// Returns the retry-after hint in milliseconds, when meaningful.
    #[must_use]
    pub const fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited(limited) => Some(limited.retry_after_ms),
            Self::CircuitOpen(open) => Some(open.retry_after_ms),
            _ => None,
        }
    }

    /// Returns true when the caller may retry later without changes.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_)
                | Self::CircuitOpen(_)
                | Self::PoolTimeout {
                    ..
                }
        )
    }
}

// ============================================================================
// SECTION: Request and Response Types
// ============================================================================

/// Preview request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewQueryRequest {
    /// Statement to validate.
    pub query: String,
}

/// Validation summary included in preview and execute responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the statement was admitted.
    pub admitted: bool,
    /// Rejection reason when not admitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Advisory warnings.
    pub warnings: Vec<String>,
    /// Weighted complexity score.
    pub complexity: u32,
    /// Configured ceiling, for caller-side headroom display.
    pub max_complexity: u32,
    /// Row cap applied by rewrite, when the statement had no bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_row_cap: Option<u32>,
}

impl ValidationReport {
    /// Builds a report from a verdict and the configured ceiling.
    fn from_verdict(verdict: &Verdict, max_complexity: u32) -> Self {
        Self {
            admitted: verdict.admitted,
            reason: verdict.reason.clone(),
            warnings: verdict.warnings.clone(),
            complexity: verdict.complexity,
            max_complexity,
            applied_row_cap: verdict.applied_row_cap,
        }
    }
}

/// Approval grant returned by an admitted preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalGrant {
    /// Token to present at execute time.
    pub token: TokenId,
    /// Validity window in seconds.
    pub expires_in_seconds: u64,
}

/// Preview response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewQueryResponse {
    /// Validation summary.
    pub validation: ValidationReport,
    /// Approval grant when the statement was admitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalGrant>,
    /// Statement as it would execute, including any row-cap rewrite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_sql: Option<String>,
}

/// Execute request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleQueryRequest {
    /// Statement to execute; must match the previewed statement.
    pub query: String,
    /// Approval token from the preview.
    #[serde(default)]
    pub approval_token: String,
}

/// Execute response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleQueryResponse {
    /// Always true; failures surface as errors.
    pub success: bool,
    /// Number of rows returned.
    pub row_count: usize,
    /// Columns as declared in the result metadata.
    pub columns: Vec<ColumnInfo>,
    /// Rows as ordered column-to-value maps.
    pub rows: Vec<Row>,
    /// Validation summary from the execute-time re-check.
    pub validation: ValidationReport,
}

/// Describe request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeTableRequest {
    /// Table to describe.
    pub table: String,
    /// Optional owning schema.
    #[serde(default)]
    pub schema: Option<String>,
}

/// One described column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name.
    pub name: String,
    /// Declared data type.
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub pk: bool,
}

/// Describe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeTableResponse {
    /// Upper-cased table name actually queried.
    pub table: String,
    /// Upper-cased schema name actually queried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Described columns in declaration order.
    pub columns: Vec<TableColumn>,
}

/// List request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTablesRequest {
    /// Optional owning schema.
    #[serde(default)]
    pub schema: Option<String>,
}

/// List response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTablesResponse {
    /// Upper-cased schema name actually queried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Visible table names.
    pub tables: Vec<String>,
}

// ============================================================================
// SECTION: Router Construction
// ============================================================================

/// Everything the router needs, passed explicitly.
pub struct RouterParams {
    /// Validator settings.
    pub gate: ValidatorConfig,
    /// Rate limiter settings.
    pub rate_limit: RateLimitSettings,
    /// Approval registry settings.
    pub approval: ApprovalSettings,
    /// Circuit breaker settings.
    pub circuit: CircuitSettings,
    /// Session pool.
    pub pool: SessionPool,
    /// Audit emitter.
    pub audit: BufferedAuditEmitter,
    /// Clock shared by every time-dependent component.
    pub clock: SharedClock,
    /// Entropy source for approval tokens.
    pub entropy: SharedEntropy,
}

impl RouterParams {
    /// Builds params from loaded configuration with production capabilities.
    #[must_use]
    pub fn from_config(
        config: &QueryGateConfig,
        pool: SessionPool,
        audit: BufferedAuditEmitter,
    ) -> Self {
        Self {
            gate: ValidatorConfig {
                max_complexity: config.gate.max_complexity,
                max_rows: config.gate.max_rows,
                allow_cross_joins: config.gate.allow_cross_joins,
            },
            rate_limit: RateLimitSettings {
                max_requests: config.limits.rate_max,
                window_seconds: config.limits.rate_window_seconds,
            },
            approval: ApprovalSettings {
                ttl_seconds: config.approval.ttl_seconds,
            },
            circuit: CircuitSettings {
                failure_threshold: config.circuit.failure_threshold,
                recovery_timeout_seconds: config.circuit.recovery_timeout_seconds,
                success_threshold: config.circuit.success_threshold,
            },
            pool,
            audit,
            clock: Arc::new(SystemClock),
            entropy: Arc::new(OsEntropy),
        }
    }
}

/// Maps pool configuration onto pool settings.
#[must_use]
pub fn pool_settings(config: &PoolConfig) -> PoolSettings {
    PoolSettings {
        size: config.size,
        acquire_timeout: std::time::Duration::from_secs(config.acquire_timeout_seconds),
        query_timeout: std::time::Duration::from_secs(config.query_timeout_seconds),
        fetch_chunk: config.fetch_chunk,
    }
}

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Operation dispatcher over the admission pipeline.
pub struct ToolRouter {
    /// Statement validator.
    validator: QueryValidator,
    /// Shared rate limiter over all operations.
    rate_limiter: RateLimiter,
    /// Approval token registry.
    approvals: ApprovalRegistry,
    /// Circuit breaker guarding every database call.
    circuit: CircuitBreaker,
    /// Session pool.
    pool: SessionPool,
    /// Audit emitter.
    audit: BufferedAuditEmitter,
    /// Clock for event timestamps.
    clock: SharedClock,
}

impl ToolRouter {
    /// Creates a router owning one instance of each pipeline component.
    #[must_use]
    pub fn new(params: RouterParams) -> Self {
        let clock = Arc::clone(&params.clock);
        Self {
            validator: QueryValidator::new(params.gate),
            rate_limiter: RateLimiter::new(params.rate_limit, Arc::clone(&params.clock)),
            approvals: ApprovalRegistry::new(
                params.approval,
                Arc::clone(&params.clock),
                params.entropy,
            ),
            circuit: CircuitBreaker::new(params.circuit, Arc::clone(&params.clock)),
            pool: params.pool,
            audit: params.audit,
            clock,
        }
    }

    /// Dispatches a named operation with a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for unknown names, bad payloads, and every
    /// pipeline rejection.
    pub async fn handle_call(&self, name: &str, payload: Value) -> Result<Value, ToolError> {
        let Some(tool) = ToolName::parse(name) else {
            return Err(ToolError::UnknownTool(name.to_string()));
        };
        match tool {
            ToolName::PreviewQuery => encode(&self.preview_query(decode(payload)?).await?),
            ToolName::QueryOracle => encode(&self.query_oracle(decode(payload)?).await?),
            ToolName::DescribeTable => encode(&self.describe_table(decode(payload)?).await?),
            ToolName::ListTables => encode(&self.list_tables(decode(payload)?).await?),
        }
    }

    /// Validates a statement and issues an approval token without executing.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::RateLimited`] when the shared window is full.
    /// A rejected statement is reported in the response, not as an error.
    pub async fn preview_query(
        &self,
        request: PreviewQueryRequest,
    ) -> Result<PreviewQueryResponse, ToolError> {
        let op = ToolName::PreviewQuery;
        self.emit(AuditEvent::new(self.now(), AuditKind::Attempt, op)).await;
        self.check_rate(op).await?;

        let canonical = CanonicalSql::of(&request.query);
        let verdict = self.validator.validate_canonical(&request.query, &canonical);
        let validation = ValidationReport::from_verdict(&verdict, self.validator.max_complexity());
        if !verdict.admitted {
            let reason = verdict.reason.clone().unwrap_or_default();
            self.emit(
                AuditEvent::new(self.now(), AuditKind::Block, op)
                    .with_reason(reason)
                    .with_complexity(verdict.complexity),
            )
            .await;
            return Ok(PreviewQueryResponse {
                validation,
                approval: None,
                effective_sql: None,
            });
        }

        let ticket = self.approvals.issue(&verdict, &canonical);
        self.emit(
            AuditEvent::new(self.now(), AuditKind::ApprovalIssue, op)
                .with_complexity(verdict.complexity)
                .with_token_prefix(ticket.token.audit_prefix()),
        )
        .await;
        Ok(PreviewQueryResponse {
            validation,
            approval: Some(ApprovalGrant {
                token: ticket.token,
                expires_in_seconds: self.approvals.ttl_seconds(),
            }),
            effective_sql: Some(verdict.effective_sql),
        })
    }

    /// Executes a previewed statement under its approval token.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for every pipeline rejection: rate limit,
    /// approval, re-validation, circuit, pool, and driver failures.
    pub async fn query_oracle(
        &self,
        request: OracleQueryRequest,
    ) -> Result<OracleQueryResponse, ToolError> {
        let op = ToolName::QueryOracle;
        self.emit(AuditEvent::new(self.now(), AuditKind::Attempt, op)).await;
        self.check_rate(op).await?;

        let token = TokenId::new(request.approval_token.clone());
        let canonical = CanonicalSql::of(&request.query);
        if let Err(error) = self.approvals.consume(&token, &canonical) {
            self.emit(
                AuditEvent::new(self.now(), AuditKind::ApprovalReject, op)
                    .with_reason(error.to_string())
                    .with_token_prefix(token.audit_prefix()),
            )
            .await;
            return Err(ToolError::Approval(error));
        }
        self.emit(
            AuditEvent::new(self.now(), AuditKind::ApprovalConsume, op)
                .with_token_prefix(token.audit_prefix()),
        )
        .await;

        // Defense in depth: re-validate in case config changed or the
        // statement was tampered with between preview and execute.
        let verdict = self.validator.validate_canonical(&request.query, &canonical);
        if !verdict.admitted {
            let reason = verdict.reason.clone().unwrap_or_default();
            self.emit(
                AuditEvent::new(self.now(), AuditKind::Block, op)
                    .with_reason(reason.clone())
                    .with_complexity(verdict.complexity),
            )
            .await;
            return Err(ToolError::ValidationRejected {
                reason,
                complexity: verdict.complexity,
            });
        }

        self.permit_database(op).await?;
        let outcome = self.run_statement(op, &verdict.effective_sql).await?;
        self.emit(
            AuditEvent::new(self.now(), AuditKind::Success, op)
                .with_rows(outcome.rows.row_count())
                .with_complexity(verdict.complexity)
                .with_slot(outcome.slot),
        )
        .await;
        Ok(OracleQueryResponse {
            success: true,
            row_count: outcome.rows.row_count(),
            columns: outcome.rows.columns,
            rows: outcome.rows.rows,
            validation: ValidationReport::from_verdict(&verdict, self.validator.max_complexity()),
        })
    }

    /// Describes the columns of a whitelisted table.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for rate limits, bad identifiers, and database
    /// failures.
    pub async fn describe_table(
        &self,
        request: DescribeTableRequest,
    ) -> Result<DescribeTableResponse, ToolError> {
        let op = ToolName::DescribeTable;
        self.emit(AuditEvent::new(self.now(), AuditKind::Attempt, op)).await;
        self.check_rate(op).await?;

        let table = self.identifier(op, &request.table).await?;
        let schema = match request.schema.as_deref() {
            Some(raw) => Some(self.identifier(op, raw).await?),
            None => None,
        };

        self.permit_database(op).await?;
        let column_rows = self.run_statement(op, &columns_statement(&table, schema.as_ref())).await?;
        let pk_rows = self.run_statement(op, &primary_key_statement(&table, schema.as_ref())).await?;

        let pk_columns: BTreeSet<String> = pk_rows
            .rows
            .rows
            .iter()
            .filter_map(|row| row.get("COLUMN_NAME").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        let columns: Vec<TableColumn> = column_rows
            .rows
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.get("COLUMN_NAME").and_then(Value::as_str)?.to_string();
                let data_type =
                    row.get("DATA_TYPE").and_then(Value::as_str).unwrap_or_default().to_string();
                let nullable = row.get("NULLABLE").and_then(Value::as_str) == Some("Y");
                let pk = pk_columns.contains(&name);
                Some(TableColumn {
                    name,
                    data_type,
                    nullable,
                    pk,
                })
            })
            .collect();

        self.emit(AuditEvent::new(self.now(), AuditKind::Success, op).with_rows(columns.len()))
            .await;
        Ok(DescribeTableResponse {
            table: table.as_str().to_string(),
            schema: schema.map(|name| name.as_str().to_string()),
            columns,
        })
    }

    /// Lists tables visible to the session, optionally per schema.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for rate limits, bad identifiers, and database
    /// failures.
    pub async fn list_tables(
        &self,
        request: ListTablesRequest,
    ) -> Result<ListTablesResponse, ToolError> {
        let op = ToolName::ListTables;
        self.emit(AuditEvent::new(self.now(), AuditKind::Attempt, op)).await;
        self.check_rate(op).await?;

        let schema = match request.schema.as_deref() {
            Some(raw) => Some(self.identifier(op, raw).await?),
            None => None,
        };

        self.permit_database(op).await?;
        let outcome = self.run_statement(op, &tables_statement(schema.as_ref())).await?;
        let tables: Vec<String> = outcome
            .rows
            .rows
            .iter()
            .filter_map(|row| row.get("TABLE_NAME").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        self.emit(
            AuditEvent::new(self.now(), AuditKind::Success, op)
                .with_rows(tables.len())
                .with_slot(outcome.slot),
        )
        .await;
        Ok(ListTablesResponse {
            schema: schema.map(|name| name.as_str().to_string()),
            tables,
        })
    }

    /// Returns the pool health view.
    #[must_use]
    pub fn pool_health(&self) -> PoolHealth {
        self.pool.health()
    }

    /// Returns a read-only circuit breaker snapshot.
    #[must_use]
    pub fn circuit_snapshot(&self) -> CircuitSnapshot {
        self.circuit.snapshot()
    }

    /// Returns the number of live approvals.
    #[must_use]
    pub fn pending_approvals(&self) -> usize {
        self.approvals.pending()
    }

    // ------------------------------------------------------------------
    // Pipeline helpers
    // ------------------------------------------------------------------

    /// Admits or rejects the request against the shared rate limiter.
    async fn check_rate(&self, op: ToolName) -> Result<(), ToolError> {
        if let Err(limited) = self.rate_limiter.check() {
            self.emit(
                AuditEvent::new(self.now(), AuditKind::RateLimit, op)
                    .with_reason(limited.to_string()),
            )
            .await;
            return Err(ToolError::RateLimited(limited));
        }
        Ok(())
    }

    /// Validates an identifier, emitting a BLOCK event on failure.
    async fn identifier(&self, op: ToolName, raw: &str) -> Result<SqlIdentifier, ToolError> {
        match SqlIdentifier::parse(raw) {
            Ok(identifier) => Ok(identifier),
            Err(error) => {
                self.emit(
                    AuditEvent::new(self.now(), AuditKind::Block, op)
                        .with_reason(error.to_string()),
                )
                .await;
                Err(ToolError::BadIdentifier(error))
            }
        }
    }

    /// Requests circuit permission, emitting transition and refusal events.
    async fn permit_database(&self, op: ToolName) -> Result<(), ToolError> {
        match self.circuit.permit() {
            Ok(Some(CircuitTransition::HalfOpened)) => {
                self.emit(
                    AuditEvent::new(self.now(), AuditKind::CircuitHalfOpen, op)
                        .with_phase("half_open"),
                )
                .await;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(open) => {
                self.emit(
                    AuditEvent::new(self.now(), AuditKind::CircuitOpen, op)
                        .with_reason(open.to_string())
                        .with_phase("open"),
                )
                .await;
                Err(ToolError::CircuitOpen(open))
            }
        }
    }

    /// Runs one statement through the pool, recording the circuit outcome.
    async fn run_statement(&self, op: ToolName, sql: &str) -> Result<RunOutcome, ToolError> {
        match self.pool.run(sql).await {
            Ok(outcome) => {
                if let Some(CircuitTransition::Closed) = self.circuit.record_success() {
                    self.emit(
                        AuditEvent::new(self.now(), AuditKind::CircuitClose, op)
                            .with_phase("closed"),
                    )
                    .await;
                }
                Ok(outcome)
            }
            Err(error) => Err(self.database_failure(op, error).await),
        }
    }

    /// Translates a pool failure into the caller-facing error, emitting
    /// FAILURE and circuit events.
    async fn database_failure(&self, op: ToolName, error: PoolError) -> ToolError {
        match error {
            PoolError::AcquireTimeout {
                waited_ms,
            } => {
                // The database was never touched; the circuit stays as is.
                self.emit(
                    AuditEvent::new(self.now(), AuditKind::Failure, op)
                        .with_reason(format!("no idle session within {waited_ms}ms")),
                )
                .await;
                ToolError::PoolTimeout {
                    waited_ms,
                }
            }
            PoolError::QueryTimeout {
                timeout_ms,
            } => {
                self.record_database_failure(op, &format!("statement timed out after {timeout_ms}ms"))
                    .await;
                ToolError::Driver(format!("statement timed out after {timeout_ms}ms"))
            }
            PoolError::Statement(message) | PoolError::Internal(message) => {
                self.record_database_failure(op, &message).await;
                ToolError::Driver(sanitize_driver_reason(&message))
            }
        }
    }

    /// Records a database failure on the circuit and emits events.
    async fn record_database_failure(&self, op: ToolName, detail: &str) {
        // Full driver detail stays in the audit stream only.
        self.emit(AuditEvent::new(self.now(), AuditKind::Failure, op).with_reason(detail)).await;
        if let Some(CircuitTransition::Opened) = self.circuit.record_failure() {
            self.emit(
                AuditEvent::new(self.now(), AuditKind::CircuitOpen, op)
                    .with_reason("circuit opened after consecutive failures")
                    .with_phase("open"),
            )
            .await;
        }
    }

    /// Emits one audit event.
    async fn emit(&self, event: AuditEvent) {
        self.audit.emit(event).await;
    }

    /// Reads the injected clock.
    fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

// ============================================================================
// SECTION: Metadata Statements
// ============================================================================

/// Builds the column metadata statement from validated identifiers.
fn columns_statement(table: &SqlIdentifier, schema: Option<&SqlIdentifier>) -> String {
    match schema {
        Some(schema) => format!(
            "SELECT column_name, data_type, nullable FROM all_tab_columns WHERE owner = \
             '{schema}' AND table_name = '{table}' ORDER BY column_id"
        ),
        None => format!(
            "SELECT column_name, data_type, nullable FROM user_tab_columns WHERE table_name = \
             '{table}' ORDER BY column_id"
        ),
    }
}

/// Builds the primary-key metadata statement from validated identifiers.
fn primary_key_statement(table: &SqlIdentifier, schema: Option<&SqlIdentifier>) -> String {
    match schema {
        Some(schema) => format!(
            "SELECT column_name FROM all_cons_columns WHERE owner = '{schema}' AND \
             constraint_name = (SELECT constraint_name FROM all_constraints WHERE owner = \
             '{schema}' AND table_name = '{table}' AND constraint_type = 'P')"
        ),
        None => format!(
            "SELECT column_name FROM user_cons_columns WHERE constraint_name = (SELECT \
             constraint_name FROM user_constraints WHERE table_name = '{table}' AND \
             constraint_type = 'P')"
        ),
    }
}

/// Builds the table listing statement from a validated schema identifier.
fn tables_statement(schema: Option<&SqlIdentifier>) -> String {
    match schema {
        Some(schema) => format!(
            "SELECT table_name FROM all_tables WHERE owner = '{schema}' ORDER BY table_name"
        ),
        None => String::from("SELECT table_name FROM user_tables ORDER BY table_name"),
    }
}

// ============================================================================
// SECTION: Payload Helpers
// ============================================================================

/// Decodes a JSON value into a typed request payload.
fn decode<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, ToolError> {
    serde_json::from_value(payload).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

/// Encodes a typed response payload into a JSON value.
fn encode<T: Serialize>(response: &T) -> Result<Value, ToolError> {
    serde_json::to_value(response).map_err(|_| ToolError::Serialization)
}

/// Reduces a driver message to a single bounded line for callers.
fn sanitize_driver_reason(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default();
    first_line.chars().take(MAX_DRIVER_REASON_LENGTH).collect()
}
