// crates/query-gate-core/src/admission/circuit.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Three-state failure gate in front of the session pool.
// Purpose: Refuse database calls fast while the backend is failing.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! One breaker guards every database call. CLOSED counts consecutive
//! failures and opens at the threshold; OPEN refuses calls until the
//! recovery timeout elapses, then HALF_OPEN admits probes; enough
//! consecutive probe successes close the circuit, any probe failure reopens
//! it. The breaker mutates only its own state and reports transitions to the
//! caller, which turns them into audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::time::SharedClock;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default consecutive failures before opening.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// Default cool-down before probing, in seconds.
pub const DEFAULT_RECOVERY_TIMEOUT_SECONDS: u64 = 60;
/// Default consecutive probe successes before closing.
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;

/// Circuit breaker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSettings {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Cool-down before a probe is admitted, in seconds.
    pub recovery_timeout_seconds: u64,
    /// Consecutive probe successes that close the circuit.
    pub success_threshold: u32,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout_seconds: DEFAULT_RECOVERY_TIMEOUT_SECONDS,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
        }
    }
}

// ============================================================================
// SECTION: Phases and Transitions
// ============================================================================

/// Circuit phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitPhase {
    /// Normal operation.
    Closed,
    /// Refusing all calls.
    Open,
    /// Probing for recovery.
    HalfOpen,
}

impl CircuitPhase {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Phase change reported to the caller for audit emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitTransition {
    /// The circuit opened.
    Opened,
    /// The circuit closed after recovery.
    Closed,
    /// The circuit entered the probing state.
    HalfOpened,
}

/// Rejection returned while the circuit is open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker is open; database appears to be down, retry in {retry_after_ms}ms")]
pub struct CircuitOpen {
    /// Milliseconds until the next probe is admitted.
    pub retry_after_ms: u64,
}

/// Read-only view of the breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    /// Current phase.
    pub phase: CircuitPhase,
    /// Consecutive failures observed in CLOSED.
    pub consecutive_failures: u32,
    /// Consecutive successes observed in HALF_OPEN.
    pub consecutive_successes: u32,
    /// When the circuit last opened.
    pub opened_at: Option<Timestamp>,
}

// ============================================================================
// SECTION: Breaker
// ============================================================================

/// Mutable breaker state behind the lock.
#[derive(Debug, Clone, Copy)]
struct CircuitState {
    phase: CircuitPhase,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Timestamp>,
}

/// Process-wide circuit breaker over an injected clock.
pub struct CircuitBreaker {
    /// Active settings.
    settings: CircuitSettings,
    /// Clock used for cool-down arithmetic.
    clock: SharedClock,
    /// Guarded state.
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    /// Creates a closed breaker from settings and a clock.
    #[must_use]
    pub fn new(settings: CircuitSettings, clock: SharedClock) -> Self {
        Self {
            settings,
            clock,
            state: Mutex::new(CircuitState {
                phase: CircuitPhase::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
        }
    }

    /// Requests permission for one database call.
    ///
    /// While OPEN, the call is refused without touching the pool unless the
    /// cool-down has elapsed, in which case the breaker moves to HALF_OPEN
    /// and admits the call as a probe.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitOpen`] with the remaining cool-down while refusing.
    pub fn permit(&self) -> Result<Option<CircuitTransition>, CircuitOpen> {
        let now = self.clock.now();
        let mut state = self.lock_state();
        match state.phase {
            CircuitPhase::Closed | CircuitPhase::HalfOpen => Ok(None),
            CircuitPhase::Open => {
                let recovery_ms = self.settings.recovery_timeout_seconds.saturating_mul(1_000);
                let elapsed_ms =
                    state.opened_at.map_or(recovery_ms, |opened| now.millis_since(opened));
                if elapsed_ms >= recovery_ms {
                    state.phase = CircuitPhase::HalfOpen;
                    state.consecutive_successes = 0;
                    Ok(Some(CircuitTransition::HalfOpened))
                } else {
                    Err(CircuitOpen {
                        retry_after_ms: recovery_ms.saturating_sub(elapsed_ms),
                    })
                }
            }
        }
    }

    /// Records a successful database call.
    pub fn record_success(&self) -> Option<CircuitTransition> {
        let mut state = self.lock_state();
        match state.phase {
            CircuitPhase::Closed => {
                state.consecutive_failures = 0;
                None
            }
            CircuitPhase::HalfOpen => {
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.settings.success_threshold {
                    state.phase = CircuitPhase::Closed;
                    state.consecutive_failures = 0;
                    state.consecutive_successes = 0;
                    state.opened_at = None;
                    Some(CircuitTransition::Closed)
                } else {
                    None
                }
            }
            CircuitPhase::Open => None,
        }
    }

    /// Records a failed database call.
    pub fn record_failure(&self) -> Option<CircuitTransition> {
        let now = self.clock.now();
        let mut state = self.lock_state();
        match state.phase {
            CircuitPhase::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.settings.failure_threshold {
                    state.phase = CircuitPhase::Open;
                    state.opened_at = Some(now);
                    Some(CircuitTransition::Opened)
                } else {
                    None
                }
            }
            CircuitPhase::HalfOpen => {
                state.phase = CircuitPhase::Open;
                state.opened_at = Some(now);
                state.consecutive_successes = 0;
                Some(CircuitTransition::Opened)
            }
            CircuitPhase::Open => {
                state.opened_at = Some(now);
                None
            }
        }
    }

    /// Returns a read-only snapshot of the breaker state.
    #[must_use]
    pub fn snapshot(&self) -> CircuitSnapshot {
        let state = self.lock_state();
        CircuitSnapshot {
            phase: state.phase,
            consecutive_failures: state.consecutive_failures,
            consecutive_successes: state.consecutive_successes,
            opened_at: state.opened_at,
        }
    }

    /// Locks the breaker state, recovering from poisoning.
    fn lock_state(&self) -> std::sync::MutexGuard<'_, CircuitState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
