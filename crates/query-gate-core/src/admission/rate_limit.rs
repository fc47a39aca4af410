// crates/query-gate-core/src/admission/rate_limit.rs
// ============================================================================
// Module: Sliding Window Rate Limiter
// Description: Shared admission cap over all request kinds.
// Purpose: Bound request volume with a sliding wall-time window.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! One limiter guards preview, execute, describe, and list alike. Admission
//! appends the current timestamp to an ordered buffer after expiring entries
//! older than the window; a full buffer rejects with a retry-after hint
//! computed from the oldest surviving entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::time::SharedClock;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default maximum requests per window.
pub const DEFAULT_RATE_MAX: u32 = 60;
/// Default window length in seconds.
pub const DEFAULT_RATE_WINDOW_SECONDS: u64 = 60;

/// Rate limiter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Maximum admitted requests per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_MAX,
            window_seconds: DEFAULT_RATE_WINDOW_SECONDS,
        }
    }
}

// ============================================================================
// SECTION: Rejection
// ============================================================================

/// Rejection returned when the window is full.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "rate limit exceeded: {max_requests} requests per {window_seconds}s; retry in {retry_after_ms}ms"
)]
pub struct RateLimited {
    /// Configured request cap.
    pub max_requests: u32,
    /// Configured window in seconds.
    pub window_seconds: u64,
    /// Milliseconds until the oldest entry leaves the window.
    pub retry_after_ms: u64,
}

// ============================================================================
// SECTION: Limiter
// ============================================================================

/// Sliding-window rate limiter over an injected clock.
pub struct RateLimiter {
    /// Active settings.
    settings: RateLimitSettings,
    /// Clock used for window arithmetic.
    clock: SharedClock,
    /// Admission timestamps in ascending order.
    admitted: Mutex<VecDeque<Timestamp>>,
}

impl RateLimiter {
    /// Creates a limiter from settings and a clock.
    #[must_use]
    pub fn new(settings: RateLimitSettings, clock: SharedClock) -> Self {
        Self {
            settings,
            clock,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    /// Admits or rejects one request.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimited`] when the buffer is at capacity for the
    /// current window.
    pub fn check(&self) -> Result<(), RateLimited> {
        let now = self.clock.now();
        let window_ms = self.settings.window_seconds.saturating_mul(1_000);
        let mut admitted = match self.admitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while let Some(oldest) = admitted.front().copied() {
            if now.millis_since(oldest) >= window_ms {
                admitted.pop_front();
            } else {
                break;
            }
        }
        if admitted.len() >= self.settings.max_requests as usize {
            let retry_after_ms = admitted
                .front()
                .map_or(window_ms, |oldest| window_ms.saturating_sub(now.millis_since(*oldest)));
            return Err(RateLimited {
                max_requests: self.settings.max_requests,
                window_seconds: self.settings.window_seconds,
                retry_after_ms,
            });
        }
        admitted.push_back(now);
        Ok(())
    }
}
