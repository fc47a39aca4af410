// crates/query-gate-core/tests/rate_limit.rs
// ============================================================================
// Module: Rate Limiter Tests
// Description: Sliding-window admission against a driven clock.
// Purpose: Validate window expiry, rejection, and retry hints.
// Dependencies: query-gate-core
// ============================================================================

//! ## Overview
//! Exercises the shared sliding-window limiter with a manual clock.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions."
)]

use std::sync::Arc;

use query_gate_core::ManualClock;
use query_gate_core::RateLimitSettings;
use query_gate_core::RateLimiter;

fn limiter(max_requests: u32, window_seconds: u64) -> (Arc<ManualClock>, RateLimiter) {
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000_000));
    let limiter = RateLimiter::new(
        RateLimitSettings {
            max_requests,
            window_seconds,
        },
        clock.clone(),
    );
    (clock, limiter)
}

#[test]
fn admits_up_to_the_cap() {
    let (_clock, limiter) = limiter(3, 60);
    for _ in 0..3 {
        assert!(limiter.check().is_ok());
    }
    assert!(limiter.check().is_err());
}

#[test]
fn rejection_carries_a_retry_hint() {
    let (clock, limiter) = limiter(1, 60);
    assert!(limiter.check().is_ok());
    clock.advance_millis(10_000);
    let rejected = limiter.check().unwrap_err();
    assert_eq!(rejected.max_requests, 1);
    assert_eq!(rejected.window_seconds, 60);
    assert_eq!(rejected.retry_after_ms, 50_000);
}

#[test]
fn entries_expire_as_the_window_slides() {
    let (clock, limiter) = limiter(2, 60);
    assert!(limiter.check().is_ok());
    clock.advance_secs(30);
    assert!(limiter.check().is_ok());
    assert!(limiter.check().is_err());

    // The first entry leaves the window; one slot frees up.
    clock.advance_secs(31);
    assert!(limiter.check().is_ok());
    assert!(limiter.check().is_err());
}

#[test]
fn rejected_requests_do_not_consume_a_slot() {
    let (clock, limiter) = limiter(1, 60);
    assert!(limiter.check().is_ok());
    for _ in 0..5 {
        assert!(limiter.check().is_err());
    }
    clock.advance_secs(60);
    assert!(limiter.check().is_ok());
}
