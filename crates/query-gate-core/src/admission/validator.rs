// crates/query-gate-core/src/admission/validator.rs
// ============================================================================
// Module: Statement Validator
// Description: Ordered admission rules over the canonical SQL form.
// Purpose: Reject dangerous statements and produce the admission verdict.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Validation applies rejection rules in a fixed order with short-circuit on
//! the first failure: empty guard, leading verb, forbidden verbs, set
//! operators, cartesian guard, complexity ceiling. Admitted statements leave
//! with an effective SQL text that always carries a row bound. Rules are data
//! (word lists and weights) so adding one never touches the dispatcher.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::admission::complexity;
use crate::admission::complexity::ComplexityBreakdown;
use crate::admission::rewrite;
use crate::admission::scan;
use crate::core::canonical::CanonicalSql;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default complexity ceiling.
pub const DEFAULT_MAX_COMPLEXITY: u32 = 50;
/// Default row cap.
pub const DEFAULT_MAX_ROWS: u32 = 10_000;

/// Validator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Reject statements scoring above this ceiling.
    pub max_complexity: u32,
    /// Row cap applied when a statement carries no bound.
    pub max_rows: u32,
    /// Permit comma-separated FROM entries and explicit CROSS JOIN.
    pub allow_cross_joins: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_complexity: DEFAULT_MAX_COMPLEXITY,
            max_rows: DEFAULT_MAX_ROWS,
            allow_cross_joins: false,
        }
    }
}

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Outcome of validating one statement.
///
/// # Invariants
/// - Rejected: `effective_sql` is empty and `reason` is non-empty.
/// - Admitted: `reason` is `None` and `effective_sql` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the statement was admitted.
    pub admitted: bool,
    /// Rejection reason when not admitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Advisory warnings; admission is still granted.
    pub warnings: Vec<String>,
    /// Weighted complexity score.
    pub complexity: u32,
    /// Row cap applied by rewrite, when the statement had no bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_row_cap: Option<u32>,
    /// Statement text to execute; empty when rejected.
    pub effective_sql: String,
}

impl Verdict {
    /// Builds a rejection verdict.
    fn rejected(reason: String, complexity: u32, warnings: Vec<String>) -> Self {
        Self {
            admitted: false,
            reason: Some(reason),
            warnings,
            complexity,
            applied_row_cap: None,
            effective_sql: String::new(),
        }
    }
}

// ============================================================================
// SECTION: Rule Data
// ============================================================================

/// Verbs rejected as whole words anywhere in the canonical form.
const FORBIDDEN_VERBS: [&str; 17] = [
    "DELETE",
    "INSERT",
    "UPDATE",
    "MERGE",
    "DROP",
    "TRUNCATE",
    "ALTER",
    "CREATE",
    "GRANT",
    "REVOKE",
    "EXECUTE",
    "CALL",
    "COMMIT",
    "ROLLBACK",
    "SAVEPOINT",
    "LOCK",
    "RENAME",
];

/// Set operators rejected as whole words (UNION also covers UNION ALL).
const SET_OPERATORS: [&str; 4] = ["UNION", "INTERSECT", "MINUS", "EXCEPT"];

/// Keywords terminating a top-level FROM list.
const FROM_TERMINATORS: [&str; 7] =
    ["WHERE", "GROUP", "ORDER", "HAVING", "CONNECT", "START", "FETCH"];

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Statement validator applying the admission rules in order.
#[derive(Debug, Clone)]
pub struct QueryValidator {
    /// Active validator settings.
    config: ValidatorConfig,
}

impl QueryValidator {
    /// Creates a validator from settings.
    #[must_use]
    pub const fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
        }
    }

    /// Returns the configured complexity ceiling.
    #[must_use]
    pub const fn max_complexity(&self) -> u32 {
        self.config.max_complexity
    }

    /// Returns the configured row cap.
    #[must_use]
    pub const fn max_rows(&self) -> u32 {
        self.config.max_rows
    }

    /// Validates raw SQL text and returns the admission verdict.
    #[must_use]
    pub fn validate(&self, raw: &str) -> Verdict {
        let canonical = CanonicalSql::of(raw);
        self.validate_canonical(raw, &canonical)
    }

    /// Validates raw text against an already computed canonical form.
    #[must_use]
    pub fn validate_canonical(&self, raw: &str, canonical: &CanonicalSql) -> Verdict {
        let text = canonical.as_str();

        if canonical.is_empty() {
            return Verdict::rejected(
                "statement is empty after normalization".to_string(),
                0,
                Vec::new(),
            );
        }

        let leading = scan::first_word(text).unwrap_or_default();
        if leading != "SELECT" && leading != "WITH" {
            return Verdict::rejected(
                "only SELECT statements (including WITH-prefixed ones) are admitted".to_string(),
                0,
                Vec::new(),
            );
        }

        for verb in FORBIDDEN_VERBS {
            if scan::contains_word(text, verb) {
                return Verdict::rejected(
                    format!("blocked operation {verb}; only read statements are admitted"),
                    0,
                    Vec::new(),
                );
            }
        }

        for operator in SET_OPERATORS {
            if scan::contains_word(text, operator) {
                return Verdict::rejected(
                    format!("set operator {operator} is not allowed"),
                    0,
                    Vec::new(),
                );
            }
        }

        let comma_from = has_top_level_from_comma(text);
        let mut warnings = Vec::new();
        if self.config.allow_cross_joins {
            if comma_from {
                warnings.push(if scan::contains_word(text, "WHERE") {
                    "comma-separated FROM entries rely on WHERE predicates for join conditions"
                        .to_string()
                } else {
                    "comma-separated FROM entries without WHERE predicates can produce a \
                     cartesian product"
                        .to_string()
                });
            }
        } else {
            if scan::contains_phrase(text, "CROSS JOIN") {
                return Verdict::rejected(
                    "explicit CROSS JOIN is not allowed; cartesian products are blocked"
                        .to_string(),
                    0,
                    Vec::new(),
                );
            }
            if comma_from {
                return Verdict::rejected(
                    "comma-separated FROM entries can produce a cartesian product; use explicit \
                     JOIN syntax"
                        .to_string(),
                    0,
                    Vec::new(),
                );
            }
        }

        let breakdown = complexity::score(text);
        collect_warnings(text, &breakdown, &mut warnings);
        if breakdown.total > self.config.max_complexity {
            return Verdict::rejected(
                format!(
                    "complexity score {} exceeds the ceiling {}",
                    breakdown.total, self.config.max_complexity
                ),
                breakdown.total,
                warnings,
            );
        }

        let (effective_sql, applied_row_cap) =
            rewrite::apply_row_cap(raw, text, self.config.max_rows);
        Verdict {
            admitted: true,
            reason: None,
            warnings,
            complexity: breakdown.total,
            applied_row_cap,
            effective_sql,
        }
    }
}

// ============================================================================
// SECTION: Warning Assembly
// ============================================================================

/// Appends advisory warnings derived from the score breakdown.
fn collect_warnings(text: &str, breakdown: &ComplexityBreakdown, warnings: &mut Vec<String>) {
    if breakdown.joins > 0 && scan::contains_phrase(text, "SELECT *") {
        warnings
            .push("SELECT * across joined tables can be expensive; name the columns".to_string());
    }
    if breakdown.distinct {
        warnings.push("DISTINCT can be expensive on large result sets".to_string());
    }
    if breakdown.subqueries > 0 {
        warnings.push(format!(
            "statement contains {} {}",
            breakdown.subqueries,
            plural(breakdown.subqueries, "subquery", "subqueries")
        ));
    }
    if breakdown.ctes > 0 {
        warnings.push(format!(
            "statement contains {} common table {}",
            breakdown.ctes,
            plural(breakdown.ctes, "expression", "expressions")
        ));
    }
    if breakdown.windows > 0 {
        warnings.push(format!(
            "statement contains {} window {}; these can be expensive on large tables",
            breakdown.windows,
            plural(breakdown.windows, "function", "functions")
        ));
    }
}

/// Chooses the singular or plural noun for a count.
const fn plural<'a>(count: u32, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

// ============================================================================
// SECTION: FROM List Scan
// ============================================================================

/// Returns true when a comma appears in the top-level FROM list.
///
/// Commas inside parenthesized subexpressions never count; the scan only
/// tracks paren depth and whether the cursor sits between a depth-zero FROM
/// and the keyword that terminates its list.
fn has_top_level_from_comma(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_from = false;
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'(' => {
                depth += 1;
                index += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                index += 1;
            }
            b',' if depth == 0 && in_from => return true,
            byte if scan::is_word_byte(byte) => {
                let start = index;
                while index < bytes.len() && scan::is_word_byte(bytes[index]) {
                    index += 1;
                }
                if depth == 0 {
                    let word = &text[start..index];
                    if word == "FROM" {
                        in_from = true;
                    } else if FROM_TERMINATORS.contains(&word) {
                        in_from = false;
                    }
                }
            }
            _ => {
                index += 1;
            }
        }
    }
    false
}
