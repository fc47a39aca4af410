// crates/query-gate-core/tests/approval.rs
// ============================================================================
// Module: Approval Registry Tests
// Description: One-shot token lifecycle with a driven clock and entropy.
// Purpose: Validate issue, consume, expiry, and mismatch behavior.
// Dependencies: query-gate-core
// ============================================================================

//! ## Overview
//! Exercises the preview-then-approve token workflow against a manual clock
//! and deterministic entropy.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions."
)]

use std::sync::Arc;

use query_gate_core::ApprovalError;
use query_gate_core::ApprovalRegistry;
use query_gate_core::ApprovalSettings;
use query_gate_core::CanonicalSql;
use query_gate_core::ManualClock;
use query_gate_core::QueryValidator;
use query_gate_core::SequenceEntropy;
use query_gate_core::ValidatorConfig;
use query_gate_core::Verdict;

struct Fixture {
    clock: Arc<ManualClock>,
    registry: ApprovalRegistry,
}

fn fixture(ttl_seconds: u64) -> Fixture {
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000_000));
    let registry = ApprovalRegistry::new(
        ApprovalSettings {
            ttl_seconds,
        },
        clock.clone(),
        Arc::new(SequenceEntropy::default()),
    );
    Fixture {
        clock,
        registry,
    }
}

fn admitted(sql: &str) -> (Verdict, CanonicalSql) {
    let verdict = QueryValidator::new(ValidatorConfig::default()).validate(sql);
    assert!(verdict.admitted);
    (verdict, CanonicalSql::of(sql))
}

#[test]
fn issue_then_consume_returns_the_stored_verdict() {
    let fixture = fixture(300);
    let (verdict, canonical) = admitted("SELECT id FROM users");
    let ticket = fixture.registry.issue(&verdict, &canonical);
    assert_eq!(ticket.expires_at.millis_since(ticket.issued_at), 300_000);

    let consumed = fixture.registry.consume(&ticket.token, &canonical).unwrap();
    assert_eq!(consumed, verdict);
}

#[test]
fn second_consume_is_invalid() {
    let fixture = fixture(300);
    let (verdict, canonical) = admitted("SELECT id FROM users");
    let ticket = fixture.registry.issue(&verdict, &canonical);

    fixture.registry.consume(&ticket.token, &canonical).unwrap();
    let second = fixture.registry.consume(&ticket.token, &canonical);
    assert_eq!(second, Err(ApprovalError::Invalid));
}

#[test]
fn unknown_token_is_invalid() {
    let fixture = fixture(300);
    let (_, canonical) = admitted("SELECT id FROM users");
    let result = fixture.registry.consume(&"deadbeef".into(), &canonical);
    assert_eq!(result, Err(ApprovalError::Invalid));
}

#[test]
fn empty_token_is_required() {
    let fixture = fixture(300);
    let (_, canonical) = admitted("SELECT id FROM users");
    let result = fixture.registry.consume(&"".into(), &canonical);
    assert_eq!(result, Err(ApprovalError::Required));
}

#[test]
fn different_statement_is_a_mismatch_and_token_survives() {
    let fixture = fixture(300);
    let (verdict, canonical) = admitted("SELECT 1 FROM DUAL");
    let ticket = fixture.registry.issue(&verdict, &canonical);

    let other = CanonicalSql::of("SELECT 2 FROM DUAL");
    let mismatch = fixture.registry.consume(&ticket.token, &other);
    assert_eq!(mismatch, Err(ApprovalError::Mismatch));

    // The previewed statement still consumes after a mismatch attempt.
    let consumed = fixture.registry.consume(&ticket.token, &canonical);
    assert!(consumed.is_ok());
}

#[test]
fn formatting_differences_still_match() {
    let fixture = fixture(300);
    let (verdict, canonical) = admitted("SELECT id FROM users");
    let ticket = fixture.registry.issue(&verdict, &canonical);

    let reformatted = CanonicalSql::of("select   ID\nfrom USERS");
    let consumed = fixture.registry.consume(&ticket.token, &reformatted);
    assert!(consumed.is_ok());
}

#[test]
fn expired_token_is_rejected_as_expired() {
    let fixture = fixture(300);
    let (verdict, canonical) = admitted("SELECT id FROM users");
    let ticket = fixture.registry.issue(&verdict, &canonical);

    fixture.clock.advance_secs(300);
    let result = fixture.registry.consume(&ticket.token, &canonical);
    assert_eq!(result, Err(ApprovalError::Expired));
}

#[test]
fn consume_just_before_expiry_succeeds() {
    let fixture = fixture(300);
    let (verdict, canonical) = admitted("SELECT id FROM users");
    let ticket = fixture.registry.issue(&verdict, &canonical);

    fixture.clock.advance_millis(299_999);
    assert!(fixture.registry.consume(&ticket.token, &canonical).is_ok());
}

#[test]
fn mutations_purge_expired_entries() {
    let fixture = fixture(60);
    let (verdict, canonical) = admitted("SELECT id FROM users");
    let stale = fixture.registry.issue(&verdict, &canonical);
    assert_eq!(fixture.registry.pending(), 1);

    fixture.clock.advance_secs(61);
    let fresh = fixture.registry.issue(&verdict, &canonical);
    assert_eq!(fixture.registry.pending(), 1);

    assert_eq!(fixture.registry.consume(&stale.token, &canonical), Err(ApprovalError::Invalid));
    assert!(fixture.registry.consume(&fresh.token, &canonical).is_ok());
}

#[test]
fn tokens_are_distinct_64_char_hex() {
    let fixture = fixture(300);
    let (verdict, canonical) = admitted("SELECT id FROM users");
    let first = fixture.registry.issue(&verdict, &canonical);
    let second = fixture.registry.issue(&verdict, &canonical);
    assert_ne!(first.token, second.token);
    assert_eq!(first.token.as_str().len(), 64);
    assert!(first.token.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
}
