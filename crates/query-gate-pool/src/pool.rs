// crates/query-gate-pool/src/pool.rs
// ============================================================================
// Module: Session Pool
// Description: Bounded pool of long-lived sessions with per-slot serialization.
// Purpose: Multiplex concurrent callers onto N serial database sessions.
// Dependencies: query-gate-core, tokio
// ============================================================================

//! ## Overview
//! The pool owns N slots, each wrapping one long-lived session. Acquire waits
//! FIFO on a semaphore with a timeout; idle slots rotate round-robin for
//! fairness. Statements run on blocking threads under a client-side timeout
//! equal to the server-side one. A caller that abandons leaves the statement
//! running; the slot returns to IDLE only when the statement finishes. A
//! transport failure marks the slot BROKEN and re-establishment runs out of
//! band, returning the slot to rotation only after the health probe passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::Instant;

use query_gate_core::TableRows;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::session::OracleSession;
use crate::session::SessionFactory;
use crate::session::StatementLimits;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default pool size.
pub const DEFAULT_POOL_SIZE: usize = 2;
/// Default acquire timeout.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default per-statement timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
/// Default fetch chunk in rows.
pub const DEFAULT_FETCH_CHUNK: u32 = 1_000;

/// Delay between re-establishment attempts for a broken slot.
const RECONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// Pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Number of long-lived sessions.
    pub size: usize,
    /// Maximum wait for an idle slot.
    pub acquire_timeout: Duration,
    /// Per-statement timeout (server- and client-side).
    pub query_timeout: Duration,
    /// Fetch chunk configured on every statement, in rows.
    pub fetch_chunk: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            fetch_chunk: DEFAULT_FETCH_CHUNK,
        }
    }
}

// ============================================================================
// SECTION: Errors and Views
// ============================================================================

/// Pool-level failure.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No slot became idle within the acquire timeout.
    #[error("no idle session within {waited_ms}ms")]
    AcquireTimeout {
        /// Milliseconds waited before giving up.
        waited_ms: u64,
    },
    /// The statement exceeded the client-side timeout.
    #[error("statement timed out after {timeout_ms}ms")]
    QueryTimeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },
    /// The statement failed.
    #[error("{0}")]
    Statement(String),
    /// Pool bookkeeping failed.
    #[error("pool internal error: {0}")]
    Internal(String),
}

/// Slot phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPhase {
    /// Ready for a statement.
    Idle,
    /// Running a statement.
    Busy,
    /// Connection lost; re-establishment in progress.
    Broken,
}

/// Health view over the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolHealth {
    /// Total slot count.
    pub total: usize,
    /// Slots not currently broken.
    pub healthy: usize,
    /// Broken slots.
    pub unhealthy: usize,
    /// Whether every slot is healthy.
    pub all_healthy: bool,
}

/// Result of running one statement.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Tabular result.
    pub rows: TableRows,
    /// Slot index that ran the statement.
    pub slot: usize,
}

// ============================================================================
// SECTION: Slots
// ============================================================================

/// One slot's bookkeeping state.
struct Slot {
    /// Current phase.
    phase: SlotPhase,
    /// Session parked here while the slot is idle.
    session: Option<Box<dyn OracleSession>>,
    /// Last successful statement or probe.
    last_ok_at: Option<Instant>,
    /// Re-establishment generation.
    epoch: u64,
}

/// Shared pool state.
struct PoolInner {
    /// Active settings.
    settings: PoolSettings,
    /// Factory used for initial connects and re-establishment.
    factory: Arc<dyn SessionFactory>,
    /// Slot bookkeeping, one entry per session.
    slots: Vec<Mutex<Slot>>,
    /// Idle slot indices in round-robin order.
    idle: Mutex<VecDeque<usize>>,
    /// Permit count mirrors the idle queue length.
    available: Semaphore,
}

impl PoolInner {
    /// Locks one slot, recovering from poisoning.
    fn lock_slot(&self, index: usize) -> Option<MutexGuard<'_, Slot>> {
        self.slots.get(index).map(|slot| match slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        })
    }

    /// Locks the idle queue, recovering from poisoning.
    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<usize>> {
        match self.idle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Returns a slot to rotation with its session parked.
    fn release(&self, index: usize, session: Box<dyn OracleSession>, succeeded: bool) {
        if let Some(mut slot) = self.lock_slot(index) {
            slot.phase = SlotPhase::Idle;
            slot.session = Some(session);
            if succeeded {
                slot.last_ok_at = Some(Instant::now());
            }
        }
        self.lock_idle().push_back(index);
        self.available.add_permits(1);
    }

    /// Marks a slot broken; the caller spawns re-establishment.
    fn mark_broken(&self, index: usize) {
        if let Some(mut slot) = self.lock_slot(index) {
            slot.phase = SlotPhase::Broken;
            slot.session = None;
        }
    }

    /// Returns a re-established slot to rotation under a new epoch.
    fn restore(&self, index: usize, session: Box<dyn OracleSession>) {
        if let Some(mut slot) = self.lock_slot(index) {
            slot.phase = SlotPhase::Idle;
            slot.session = Some(session);
            slot.last_ok_at = Some(Instant::now());
            slot.epoch += 1;
        }
        self.lock_idle().push_back(index);
        self.available.add_permits(1);
    }
}

// ============================================================================
// SECTION: Pool
// ============================================================================

/// Bounded pool of long-lived database sessions.
#[derive(Clone)]
pub struct SessionPool {
    /// Shared state.
    inner: Arc<PoolInner>,
}

impl SessionPool {
    /// Connects the pool's sessions and starts recovery for any that failed.
    ///
    /// Slots that cannot connect at startup begin BROKEN and are
    /// re-established out of band, so a pool with zero healthy slots still
    /// constructs; acquires then time out until recovery succeeds.
    pub async fn connect(settings: PoolSettings, factory: Arc<dyn SessionFactory>) -> Self {
        let size = settings.size.max(1);
        let mut slots = Vec::with_capacity(size);
        let mut idle = VecDeque::with_capacity(size);
        let mut broken = Vec::new();
        for index in 0..size {
            let factory_handle = Arc::clone(&factory);
            let connected = tokio::task::spawn_blocking(move || factory_handle.connect()).await;
            match connected {
                Ok(Ok(session)) => {
                    slots.push(Mutex::new(Slot {
                        phase: SlotPhase::Idle,
                        session: Some(session),
                        last_ok_at: Some(Instant::now()),
                        epoch: 0,
                    }));
                    idle.push_back(index);
                }
                _ => {
                    slots.push(Mutex::new(Slot {
                        phase: SlotPhase::Broken,
                        session: None,
                        last_ok_at: None,
                        epoch: 0,
                    }));
                    broken.push(index);
                }
            }
        }
        let permits = idle.len();
        let pool = Self {
            inner: Arc::new(PoolInner {
                settings,
                factory,
                slots,
                idle: Mutex::new(idle),
                available: Semaphore::new(permits),
            }),
        };
        for index in broken {
            pool.spawn_recovery(index);
        }
        pool
    }

    /// Runs one statement on the next idle slot.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AcquireTimeout`] when no slot becomes idle in
    /// time, [`PoolError::QueryTimeout`] when the client-side timeout fires,
    /// and [`PoolError::Statement`] when the statement fails.
    pub async fn run(&self, sql: &str) -> Result<RunOutcome, PoolError> {
        let index = self.acquire().await?;
        let taken = self.inner.lock_slot(index).and_then(|mut slot| {
            slot.phase = SlotPhase::Busy;
            slot.session.take()
        });
        let Some(mut session) = taken else {
            self.inner.mark_broken(index);
            self.spawn_recovery(index);
            return Err(PoolError::Internal("idle slot had no session".to_string()));
        };
        let limits = StatementLimits {
            timeout: self.inner.settings.query_timeout,
            fetch_chunk: self.inner.settings.fetch_chunk,
        };
        let statement = sql.to_string();
        let mut handle = tokio::task::spawn_blocking(move || {
            let outcome = session.run(&statement, limits);
            (session, outcome)
        });
        let timeout = self.inner.settings.query_timeout;
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(joined) => match joined {
                Ok((session, Ok(rows))) => {
                    self.inner.release(index, session, true);
                    Ok(RunOutcome {
                        rows,
                        slot: index,
                    })
                }
                Ok((session, Err(error))) => {
                    if error.is_transport() {
                        self.inner.mark_broken(index);
                        self.spawn_recovery(index);
                    } else {
                        self.inner.release(index, session, false);
                    }
                    Err(PoolError::Statement(error.to_string()))
                }
                Err(join_error) => {
                    self.inner.mark_broken(index);
                    self.spawn_recovery(index);
                    Err(PoolError::Internal(format!("statement worker failed: {join_error}")))
                }
            },
            Err(_elapsed) => {
                // The statement keeps running until the server-side timeout
                // fires; the slot returns to rotation when it finishes.
                let pool = self.clone();
                tokio::spawn(async move {
                    match handle.await {
                        Ok((session, Ok(_))) => pool.inner.release(index, session, true),
                        Ok((session, Err(error))) => {
                            if error.is_transport() {
                                pool.inner.mark_broken(index);
                                pool.spawn_recovery(index);
                            } else {
                                pool.inner.release(index, session, false);
                            }
                        }
                        Err(_) => {
                            pool.inner.mark_broken(index);
                            pool.spawn_recovery(index);
                        }
                    }
                });
                Err(PoolError::QueryTimeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    /// Returns the pool health view.
    #[must_use]
    pub fn health(&self) -> PoolHealth {
        let total = self.inner.slots.len();
        let mut unhealthy = 0;
        for index in 0..total {
            if let Some(slot) = self.inner.lock_slot(index)
                && slot.phase == SlotPhase::Broken
            {
                unhealthy += 1;
            }
        }
        let healthy = total - unhealthy;
        PoolHealth {
            total,
            healthy,
            unhealthy,
            all_healthy: unhealthy == 0,
        }
    }

    /// Returns the active settings.
    #[must_use]
    pub fn settings(&self) -> PoolSettings {
        self.inner.settings
    }

    /// Waits for an idle slot, FIFO, up to the acquire timeout.
    async fn acquire(&self) -> Result<usize, PoolError> {
        let wait = self.inner.settings.acquire_timeout;
        match tokio::time::timeout(wait, self.inner.available.acquire()).await {
            Err(_elapsed) => Err(PoolError::AcquireTimeout {
                waited_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            }),
            Ok(Err(_closed)) => Err(PoolError::Internal("pool semaphore closed".to_string())),
            Ok(Ok(permit)) => {
                permit.forget();
                self.inner
                    .lock_idle()
                    .pop_front()
                    .ok_or_else(|| PoolError::Internal("no idle slot behind permit".to_string()))
            }
        }
    }

    /// Re-establishes a broken slot out of band.
    fn spawn_recovery(&self, index: usize) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                let factory = Arc::clone(&inner.factory);
                let attempt = tokio::task::spawn_blocking(move || {
                    factory.connect().and_then(|mut session| session.probe().map(|()| session))
                })
                .await;
                if let Ok(Ok(session)) = attempt {
                    inner.restore(index, session);
                    return;
                }
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        });
    }
}
