// crates/query-gate-core/src/core/time.rs
// ============================================================================
// Module: Gateway Time Model
// Description: Millisecond timestamps and the injected clock capability.
// Purpose: Keep TTLs, windows, and cool-downs testable against a driven clock.
// Dependencies: chrono, serde
// ============================================================================

//! ## Overview
//! Every expiry, window, and cool-down in the gateway is evaluated against an
//! injected [`Clock`], never against wall-clock reads scattered through
//! business logic. Production wiring uses [`SystemClock`]; tests drive
//! [`ManualClock`] to cross TTL and recovery boundaries deterministically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the epoch millisecond value.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns this timestamp advanced by whole seconds, saturating.
    #[must_use]
    pub const fn saturating_add_secs(self, secs: u64) -> Self {
        let millis = (secs as i64).saturating_mul(1_000);
        Self(self.0.saturating_add(millis))
    }

    /// Returns the milliseconds elapsed since `earlier`, clamped at zero.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> u64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta < 0 { 0 } else { delta as u64 }
    }

    /// Renders the timestamp as RFC-3339 with millisecond precision.
    #[must_use]
    pub fn to_rfc3339_millis(self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.0).map_or_else(
            || String::from("1970-01-01T00:00:00.000Z"),
            |value| value.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

// ============================================================================
// SECTION: Clock Capability
// ============================================================================

/// Source of the current time for TTL, window, and cool-down arithmetic.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock backed [`Clock`] used in production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
        Timestamp::from_unix_millis(millis)
    }
}

/// Manually driven [`Clock`] for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current time in epoch milliseconds.
    now_millis: AtomicI64,
}

impl ManualClock {
    /// Creates a manual clock starting at the given epoch millisecond value.
    #[must_use]
    pub fn starting_at(millis: i64) -> Self {
        Self {
            now_millis: AtomicI64::new(millis),
        }
    }

    /// Sets the current time.
    pub fn set(&self, millis: i64) {
        self.now_millis.store(millis, Ordering::SeqCst);
    }

    /// Advances the current time by the given number of milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        self.now_millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Advances the current time by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance_millis(secs.saturating_mul(1_000));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.now_millis.load(Ordering::SeqCst))
    }
}
