// crates/query-gate-pool/tests/pool.rs
// ============================================================================
// Module: Session Pool Tests
// Description: Pool behavior over scripted in-memory sessions.
// Purpose: Validate serialization, saturation, timeouts, and recovery.
// Dependencies: query-gate-pool, tokio
// ============================================================================

//! ## Overview
//! Drives the pool with scripted sessions: statements containing `SLOW`
//! sleep, `BOOM` fail server-side, and `KILL` break the transport. Session
//! ids are logged per statement so fairness and serialization are
//! observable.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use query_gate_core::ColumnInfo;
use query_gate_core::TableRows;
use query_gate_pool::OracleSession;
use query_gate_pool::PoolError;
use query_gate_pool::PoolSettings;
use query_gate_pool::SessionError;
use query_gate_pool::SessionFactory;
use query_gate_pool::SessionPool;
use query_gate_pool::StatementLimits;
use serde_json::Value;

/// How long a `SLOW` statement blocks its session.
const SLOW_STATEMENT: Duration = Duration::from_millis(400);

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Scripted session that reacts to markers in the statement text.
struct ScriptedSession {
    /// Identifier assigned at connect time.
    id: usize,
    /// Shared log of `(session_id, sql)` executions.
    log: Arc<Mutex<Vec<(usize, String)>>>,
}

impl OracleSession for ScriptedSession {
    fn run(&mut self, sql: &str, _limits: StatementLimits) -> Result<TableRows, SessionError> {
        self.log.lock().unwrap().push((self.id, sql.to_string()));
        if sql.contains("SLOW") {
            std::thread::sleep(SLOW_STATEMENT);
        }
        if sql.contains("BOOM") {
            return Err(SessionError::Statement("ORA-00904: invalid identifier".to_string()));
        }
        if sql.contains("KILL") {
            return Err(SessionError::Transport("connection reset".to_string()));
        }
        let mut row = serde_json::Map::new();
        row.insert("SESSION_ID".to_string(), Value::from(self.id));
        Ok(TableRows {
            columns: vec![ColumnInfo {
                name: "SESSION_ID".to_string(),
                data_type: "NUMBER".to_string(),
            }],
            rows: vec![row],
        })
    }

    fn probe(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Factory handing out scripted sessions with sequential ids.
struct ScriptedFactory {
    /// Next session id.
    next_id: AtomicUsize,
    /// Connect attempts that fail before the first success.
    failing_connects: AtomicUsize,
    /// Shared execution log.
    log: Arc<Mutex<Vec<(usize, String)>>>,
}

impl ScriptedFactory {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicUsize::new(0),
            failing_connects: AtomicUsize::new(0),
            log: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn sessions_used(&self) -> Vec<usize> {
        self.log.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }
}

impl SessionFactory for ScriptedFactory {
    fn connect(&self) -> Result<Box<dyn OracleSession>, SessionError> {
        let failing = self
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| value.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SessionError::Transport("listener unreachable".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            id,
            log: Arc::clone(&self.log),
        }))
    }
}

fn settings(size: usize) -> PoolSettings {
    PoolSettings {
        size,
        acquire_timeout: Duration::from_millis(100),
        query_timeout: Duration::from_secs(2),
        fetch_chunk: 1_000,
    }
}

async fn wait_until_healthy(pool: &SessionPool) {
    for _ in 0..40 {
        if pool.health().all_healthy {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("pool never became healthy: {:?}", pool.health());
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn statements_run_and_slots_rotate() {
    let factory = ScriptedFactory::new();
    let pool = SessionPool::connect(settings(2), factory.clone()).await;

    let first = pool.run("SELECT 1 FROM DUAL").await.unwrap();
    let second = pool.run("SELECT 2 FROM DUAL").await.unwrap();
    assert_eq!(first.rows.row_count(), 1);
    assert_eq!(second.rows.row_count(), 1);

    // Round-robin rotation uses both sessions for back-to-back statements.
    assert_eq!(factory.sessions_used(), vec![0, 1]);
    assert_ne!(first.slot, second.slot);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn saturated_pool_times_out_the_extra_caller() {
    let factory = ScriptedFactory::new();
    let pool = SessionPool::connect(settings(2), factory.clone()).await;

    let slow_a = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.run("SELECT 'SLOW A' FROM DUAL").await })
    };
    let slow_b = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.run("SELECT 'SLOW B' FROM DUAL").await })
    };
    // Let both slow statements occupy the two slots first.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let third = pool.run("SELECT 3 FROM DUAL").await;
    assert!(matches!(
        third,
        Err(PoolError::AcquireTimeout {
            ..
        })
    ));
    assert!(slow_a.await.unwrap().is_ok());
    assert!(slow_b.await.unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn statement_failure_keeps_the_slot_usable() {
    let factory = ScriptedFactory::new();
    let pool = SessionPool::connect(settings(1), factory.clone()).await;

    let failed = pool.run("SELECT BOOM FROM DUAL").await;
    assert!(matches!(failed, Err(PoolError::Statement(_))));
    assert!(pool.health().all_healthy);

    assert!(pool.run("SELECT 1 FROM DUAL").await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn transport_failure_breaks_and_recovers_the_slot() {
    let factory = ScriptedFactory::new();
    let pool = SessionPool::connect(settings(2), factory.clone()).await;

    let broken = pool.run("SELECT KILL FROM DUAL").await;
    assert!(matches!(broken, Err(PoolError::Statement(_))));
    assert_eq!(pool.health().total, 2);

    wait_until_healthy(&pool).await;
    // Re-establishment opened a third session for the broken slot.
    assert_eq!(factory.next_id.load(Ordering::SeqCst), 3);
    assert!(pool.run("SELECT 1 FROM DUAL").await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn client_timeout_returns_the_slot_after_completion() {
    let factory = ScriptedFactory::new();
    let mut config = settings(1);
    config.query_timeout = Duration::from_millis(100);
    let pool = SessionPool::connect(config, factory.clone()).await;

    let timed_out = pool.run("SELECT 'SLOW' FROM DUAL").await;
    assert!(matches!(
        timed_out,
        Err(PoolError::QueryTimeout {
            ..
        })
    ));

    // The abandoned statement finishes on its own; the slot then returns.
    tokio::time::sleep(SLOW_STATEMENT + Duration::from_millis(100)).await;
    assert!(pool.run("SELECT 1 FROM DUAL").await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_startup_connects_recover_out_of_band() {
    let factory = ScriptedFactory::new();
    factory.failing_connects.store(2, Ordering::SeqCst);
    let pool = SessionPool::connect(settings(2), factory.clone()).await;

    let health = pool.health();
    assert_eq!(health.total, 2);
    assert!(health.unhealthy > 0);

    wait_until_healthy(&pool).await;
    assert!(pool.run("SELECT 1 FROM DUAL").await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn zero_healthy_slots_surface_as_acquire_timeout() {
    let factory = ScriptedFactory::new();
    // Both startup connects and several recovery attempts fail.
    factory.failing_connects.store(20, Ordering::SeqCst);
    let pool = SessionPool::connect(settings(2), factory.clone()).await;

    let outcome = pool.run("SELECT 1 FROM DUAL").await;
    assert!(matches!(
        outcome,
        Err(PoolError::AcquireTimeout {
            ..
        })
    ));
}
