// crates/query-gate-core/tests/canonical.rs
// ============================================================================
// Module: Canonical Form Tests
// Description: Normalizer behavior against comment and case evasions.
// Purpose: Validate canonicalization and hash binding.
// Dependencies: query-gate-core
// ============================================================================

//! ## Overview
//! Exercises comment stripping, ASCII-only case folding, whitespace collapse,
//! and the canonical hash used for approval binding.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions."
)]

use query_gate_core::CanonicalSql;

#[test]
fn comment_split_keyword_rejoins() {
    let canonical = CanonicalSql::of("SEL/**/ECT * FROM DUAL");
    assert_eq!(canonical.as_str(), "SELECT * FROM DUAL");
}

#[test]
fn line_comments_are_removed() {
    let canonical = CanonicalSql::of("SELECT id -- trailing note\nFROM users");
    assert_eq!(canonical.as_str(), "SELECT ID FROM USERS");
}

#[test]
fn block_comments_are_removed_non_nested() {
    let canonical = CanonicalSql::of("SELECT /* a /* b */ id FROM t");
    assert_eq!(canonical.as_str(), "SELECT ID FROM T");
}

#[test]
fn unterminated_block_comment_strips_to_end() {
    let canonical = CanonicalSql::of("SELECT id FROM t /* DROP TABLE t");
    assert_eq!(canonical.as_str(), "SELECT ID FROM T");
}

#[test]
fn case_is_folded_ascii_only() {
    let canonical = CanonicalSql::of("dElEtE FROM t");
    assert_eq!(canonical.as_str(), "DELETE FROM T");
}

#[test]
fn non_ascii_passes_through_unchanged() {
    // A homoglyph spelling of a keyword must not become the keyword.
    let canonical = CanonicalSql::of("select Ｄelete from t");
    assert!(canonical.as_str().contains("Ｄ"));
    assert!(!canonical.as_str().contains("DELETE FROM"));
}

#[test]
fn whitespace_runs_collapse_and_trim() {
    let canonical = CanonicalSql::of("  SELECT\t\n  id   FROM\tt  ");
    assert_eq!(canonical.as_str(), "SELECT ID FROM T");
}

#[test]
fn empty_input_yields_empty_canonical() {
    assert!(CanonicalSql::of("   -- only a comment\n/* and another */").is_empty());
}

#[test]
fn hash_is_stable_across_formatting() {
    let first = CanonicalSql::of("SELECT id FROM users");
    let second = CanonicalSql::of("select   ID\nfrom USERS");
    assert!(first.hash().ct_matches(&second.hash()));
}

#[test]
fn hash_differs_for_different_statements() {
    let first = CanonicalSql::of("SELECT 1 FROM DUAL");
    let second = CanonicalSql::of("SELECT 2 FROM DUAL");
    assert!(!first.hash().ct_matches(&second.hash()));
}

#[test]
fn hash_hex_is_lowercase_sha256() {
    let hex = CanonicalSql::of("SELECT 1 FROM DUAL").hash().to_hex();
    assert_eq!(hex.len(), 64);
    assert!(hex.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
}
