// crates/query-gate-core/src/tooling.rs
// ============================================================================
// Module: Tooling Identifiers
// Description: Canonical operation names exposed through the tool protocol.
// Purpose: Shared operation naming across dispatcher, audit, and config.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Canonical operation identifiers for the query gateway. These names are
//! part of the external contract surface reserved for the tool-invocation
//! protocol.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Canonical operation names for the query gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Validate a statement and issue an approval token without executing.
    PreviewQuery,
    /// Execute a previously previewed statement under its approval token.
    QueryOracle,
    /// Describe the columns of a whitelisted table.
    DescribeTable,
    /// List tables visible to the session, optionally per schema.
    ListTables,
}

impl ToolName {
    /// Returns the canonical string name for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreviewQuery => "preview_query",
            Self::QueryOracle => "query_oracle",
            Self::DescribeTable => "describe_table",
            Self::ListTables => "list_tables",
        }
    }

    /// Returns all operation names in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::PreviewQuery, Self::QueryOracle, Self::DescribeTable, Self::ListTables]
    }

    /// Parses an operation name from its string representation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "preview_query" => Some(Self::PreviewQuery),
            "query_oracle" => Some(Self::QueryOracle),
            "describe_table" => Some(Self::DescribeTable),
            "list_tables" => Some(Self::ListTables),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
