// crates/query-gate-core/src/admission/rewrite.rs
// ============================================================================
// Module: Row Cap Rewrite
// Description: Mandatory ROWNUM bound applied to unbounded statements.
// Purpose: Bound result size even when the caller forgot to.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Admitted statements without an explicit row bound are rewritten so output
//! never exceeds the configured cap. Statements whose outermost shape would
//! change under a bare predicate (ORDER BY, GROUP BY, HAVING, DISTINCT) are
//! wrapped in a subquery instead, which preserves ordering and grouping while
//! still bounding the outer result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::admission::scan;

// ============================================================================
// SECTION: Row Cap
// ============================================================================

/// Returns true when the canonical form already bounds its result size.
#[must_use]
pub(crate) fn has_row_bound(canonical: &str) -> bool {
    scan::contains_word(canonical, "ROWNUM") || scan::contains_phrase(canonical, "FETCH FIRST")
}

/// Applies the row cap to the raw statement text when no bound exists.
///
/// Returns the effective SQL and the cap that was applied, if any. The raw
/// text is what executes; the canonical form only decides whether and how to
/// rewrite.
#[must_use]
pub(crate) fn apply_row_cap(raw: &str, canonical: &str, max_rows: u32) -> (String, Option<u32>) {
    let trimmed = raw.trim();
    if has_row_bound(canonical) {
        return (trimmed.to_string(), None);
    }
    let effective = if needs_wrap(canonical) {
        format!("SELECT * FROM (\n{trimmed}\n) WHERE ROWNUM <= {max_rows}")
    } else if scan::contains_word(canonical, "WHERE") {
        format!("{trimmed} AND ROWNUM <= {max_rows}")
    } else {
        format!("{trimmed} WHERE ROWNUM <= {max_rows}")
    };
    (effective, Some(max_rows))
}

/// Returns true when a bare ROWNUM predicate would change semantics.
fn needs_wrap(canonical: &str) -> bool {
    scan::contains_phrase(canonical, "ORDER BY")
        || scan::contains_phrase(canonical, "GROUP BY")
        || scan::contains_word(canonical, "HAVING")
        || scan::contains_word(canonical, "DISTINCT")
}
