// crates/query-gate-core/tests/complexity.rs
// ============================================================================
// Module: Complexity Scoring Tests
// Description: Weighted construct counting over the canonical form.
// Purpose: Pin the score contribution of each rule.
// Dependencies: query-gate-core
// ============================================================================

//! ## Overview
//! Pins the weight each construct contributes to the admission score, using
//! the canonical form directly.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions."
)]

use query_gate_core::CanonicalSql;
use query_gate_core::ComplexityBreakdown;
use query_gate_core::admission::complexity;

fn score(sql: &str) -> ComplexityBreakdown {
    complexity::score(CanonicalSql::of(sql).as_str())
}

#[test]
fn base_score_is_five() {
    let breakdown = score("SELECT * FROM DUAL");
    assert_eq!(breakdown.total, 5);
}

#[test]
fn each_join_adds_five() {
    let breakdown = score("SELECT * FROM a JOIN b ON a.id = b.id JOIN c ON b.id = c.id");
    assert_eq!(breakdown.joins, 2);
    assert_eq!(breakdown.total, 5 + 10);
}

#[test]
fn aggregates_add_three_per_occurrence() {
    let breakdown = score("SELECT COUNT(*), SUM(amount) FROM orders GROUP BY region");
    assert_eq!(breakdown.aggregates, 3);
    assert_eq!(breakdown.total, 5 + 9);
}

#[test]
fn aggregate_names_inside_identifiers_do_not_count() {
    let breakdown = score("SELECT account_id, discount FROM orders");
    assert_eq!(breakdown.aggregates, 0);
}

#[test]
fn distinct_adds_five_once() {
    let breakdown = score("SELECT DISTINCT region FROM orders");
    assert!(breakdown.distinct);
    assert_eq!(breakdown.total, 5 + 5);
}

#[test]
fn each_subquery_adds_ten() {
    let breakdown =
        score("SELECT * FROM t WHERE a IN (SELECT x FROM u) AND b IN ( SELECT y FROM v)");
    assert_eq!(breakdown.subqueries, 2);
    assert_eq!(breakdown.total, 5 + 20);
}

#[test]
fn deep_subquery_nesting_adds_depth_penalty() {
    let breakdown = score(
        "SELECT * FROM t WHERE a IN (SELECT x FROM u WHERE y IN (SELECT z FROM v WHERE w IN \
         (SELECT q FROM r)))",
    );
    assert_eq!(breakdown.subqueries, 3);
    assert_eq!(breakdown.depth_levels, 1);
    assert_eq!(breakdown.total, 5 + 30 + 5);
}

#[test]
fn each_top_level_cte_adds_eight() {
    let breakdown = score(
        "WITH recent AS (SELECT id FROM orders), totals AS (SELECT SUM(amount) FROM recent) \
         SELECT * FROM totals",
    );
    assert_eq!(breakdown.ctes, 2);
}

#[test]
fn non_with_statement_has_no_ctes() {
    let breakdown = score("SELECT id FROM orders");
    assert_eq!(breakdown.ctes, 0);
}

#[test]
fn window_functions_add_twelve() {
    let breakdown =
        score("SELECT id, ROW_NUMBER() OVER (ORDER BY id) FROM orders WHERE ROWNUM <= 10");
    assert_eq!(breakdown.windows, 1);
}

#[test]
fn self_join_adds_fifteen() {
    let breakdown =
        score("SELECT a.id FROM employees a JOIN employees b ON a.manager_id = b.id");
    assert_eq!(breakdown.self_joins, 1);
    assert_eq!(breakdown.joins, 1);
    assert_eq!(breakdown.total, 5 + 5 + 15);
}

#[test]
fn distinct_tables_are_not_self_joins() {
    let breakdown = score("SELECT o.id FROM orders o JOIN customers c ON o.customer_id = c.id");
    assert_eq!(breakdown.self_joins, 0);
}

#[test]
fn leading_wildcard_like_adds_ten() {
    let breakdown = score("SELECT id FROM users WHERE name LIKE '%smith'");
    assert_eq!(breakdown.leading_wildcards, 1);
    assert_eq!(breakdown.total, 5 + 10);
}

#[test]
fn trailing_wildcard_like_is_free() {
    let breakdown = score("SELECT id FROM users WHERE name LIKE 'smith%'");
    assert_eq!(breakdown.leading_wildcards, 0);
}

#[test]
fn ors_beyond_the_second_add_four_each() {
    let breakdown =
        score("SELECT id FROM t WHERE a = 1 OR b = 2 OR c = 3 OR d = 4");
    assert_eq!(breakdown.extra_ors, 1);
    assert_eq!(breakdown.total, 5 + 4);
}

#[test]
fn two_ors_are_free() {
    let breakdown = score("SELECT id FROM t WHERE a = 1 OR b = 2 OR c = 3");
    assert_eq!(breakdown.extra_ors, 0);
}

#[test]
fn or_inside_identifier_does_not_count() {
    let breakdown = score("SELECT priority FROM orders WHERE vendor_id = 1");
    assert_eq!(breakdown.extra_ors, 0);
}
