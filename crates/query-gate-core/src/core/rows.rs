// crates/query-gate-core/src/core/rows.rs
// ============================================================================
// Module: Tabular Result Model
// Description: Columns and rows returned by the driver session boundary.
// Purpose: Represent result sets independent of any concrete driver.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The driver boundary returns result sets in a simple tabular shape: the
//! columns as declared in the result metadata, and each row as an ordered map
//! of column name to value. `serde_json`'s order-preserving map keeps row
//! fields in declared column order across serialization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One result row: ordered column name to value.
pub type Row = serde_json::Map<String, Value>;

/// Column metadata as declared by the result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Declared column name.
    pub name: String,
    /// Declared database type name.
    pub data_type: String,
}

/// Tabular result set returned by a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRows {
    /// Columns in declared order.
    pub columns: Vec<ColumnInfo>,
    /// Rows in fetch order.
    pub rows: Vec<Row>,
}

impl TableRows {
    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
