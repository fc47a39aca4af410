// crates/query-gate-core/tests/identifiers.rs
// ============================================================================
// Module: Identifier Tests
// Description: Oracle identifier whitelist and token id handling.
// Purpose: Validate the grammar, length bound, and audit truncation.
// Dependencies: query-gate-core
// ============================================================================

//! ## Overview
//! Exercises the identifier whitelist used for metadata lookups and the
//! token id audit prefix.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions."
)]

use query_gate_core::IdentifierError;
use query_gate_core::SqlIdentifier;
use query_gate_core::TokenId;

#[test]
fn plain_names_are_accepted_and_uppercased() {
    let identifier = SqlIdentifier::parse("orders").unwrap();
    assert_eq!(identifier.as_str(), "ORDERS");
}

#[test]
fn dollar_hash_and_underscore_are_accepted() {
    assert!(SqlIdentifier::parse("v$session").is_ok());
    assert!(SqlIdentifier::parse("tmp#stage").is_ok());
    assert!(SqlIdentifier::parse("audit_log_2024").is_ok());
}

#[test]
fn thirty_characters_is_the_limit() {
    let at_limit = "a".repeat(30);
    assert!(SqlIdentifier::parse(&at_limit).is_ok());

    let over_limit = "a".repeat(31);
    assert_eq!(
        SqlIdentifier::parse(&over_limit),
        Err(IdentifierError::TooLong {
            actual: 31,
        })
    );
}

#[test]
fn empty_name_is_rejected() {
    assert_eq!(SqlIdentifier::parse(""), Err(IdentifierError::Empty));
}

#[test]
fn leading_digit_is_rejected() {
    assert_eq!(SqlIdentifier::parse("1users"), Err(IdentifierError::InvalidStart));
}

#[test]
fn leading_underscore_is_rejected() {
    assert_eq!(SqlIdentifier::parse("_users"), Err(IdentifierError::InvalidStart));
}

#[test]
fn injection_characters_are_rejected() {
    for name in ["users;", "users'--", "users OR 1=1", "users\"", "sch.users"] {
        assert!(SqlIdentifier::parse(name).is_err(), "expected rejection for {name}");
    }
}

#[test]
fn token_audit_prefix_is_truncated() {
    let token = TokenId::new("0123456789abcdef0123456789abcdef");
    assert_eq!(token.audit_prefix(), "01234567");
}

#[test]
fn short_token_prefix_is_the_whole_token() {
    let token = TokenId::new("abc");
    assert_eq!(token.audit_prefix(), "abc");
}
