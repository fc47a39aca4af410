// crates/query-gate-pool/src/lib.rs
// ============================================================================
// Module: Query Gate Pool Library
// Description: Public API surface for the bounded session pool.
// Purpose: Expose the session traits and the pool over them.
// Dependencies: crate::{pool, session}
// ============================================================================

//! ## Overview
//! A bounded pool of long-lived database sessions behind an opaque driver
//! boundary. At most one statement is in flight per slot; broken slots are
//! re-established out of band and return to rotation only after the health
//! probe passes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod pool;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::pool::DEFAULT_ACQUIRE_TIMEOUT;
pub use crate::pool::DEFAULT_FETCH_CHUNK;
pub use crate::pool::DEFAULT_POOL_SIZE;
pub use crate::pool::DEFAULT_QUERY_TIMEOUT;
pub use crate::pool::PoolError;
pub use crate::pool::PoolHealth;
pub use crate::pool::PoolSettings;
pub use crate::pool::RunOutcome;
pub use crate::pool::SessionPool;
pub use crate::pool::SlotPhase;
pub use crate::session::HEALTH_PROBE_SQL;
pub use crate::session::OracleSession;
pub use crate::session::SessionError;
pub use crate::session::SessionFactory;
pub use crate::session::StatementLimits;
