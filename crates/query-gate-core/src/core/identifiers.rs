// crates/query-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Gateway Identifiers
// Description: Validated Oracle identifiers and approval token identifiers.
// Purpose: Provide strongly typed names safe to embed in metadata statements.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Schema and table names reach the gateway from an untrusted caller and are
//! embedded into fixed metadata statements, so they are validated against the
//! Oracle identifier grammar before use. Token identifiers are opaque hex
//! strings minted by the approval registry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted identifier length in characters.
pub const MAX_IDENTIFIER_LENGTH: usize = 30;

// ============================================================================
// SECTION: Identifier Errors
// ============================================================================

/// Identifier validation failure.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier is empty.
    #[error("identifier is empty")]
    Empty,
    /// Identifier exceeds the maximum length.
    #[error("identifier exceeds {MAX_IDENTIFIER_LENGTH} characters ({actual})")]
    TooLong {
        /// Observed length in characters.
        actual: usize,
    },
    /// Identifier does not start with an ASCII letter.
    #[error("identifier must start with a letter")]
    InvalidStart,
    /// Identifier contains a character outside `[A-Za-z0-9_$#]`.
    #[error("identifier contains invalid character {0:?}")]
    InvalidCharacter(char),
}

// ============================================================================
// SECTION: SQL Identifier
// ============================================================================

/// Validated Oracle identifier, stored upper-cased.
///
/// # Invariants
/// - Matches `[A-Za-z][A-Za-z0-9_$#]*` before upper-casing.
/// - At most [`MAX_IDENTIFIER_LENGTH`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SqlIdentifier(String);

impl SqlIdentifier {
    /// Validates a raw identifier and returns its upper-cased form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name violates the identifier
    /// grammar or length limit.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        if raw.is_empty() {
            return Err(IdentifierError::Empty);
        }
        let length = raw.chars().count();
        if length > MAX_IDENTIFIER_LENGTH {
            return Err(IdentifierError::TooLong {
                actual: length,
            });
        }
        let mut chars = raw.chars();
        let Some(first) = chars.next() else {
            return Err(IdentifierError::Empty);
        };
        if !first.is_ascii_alphabetic() {
            return Err(IdentifierError::InvalidStart);
        }
        for ch in chars {
            if !ch.is_ascii_alphanumeric() && ch != '_' && ch != '$' && ch != '#' {
                return Err(IdentifierError::InvalidCharacter(ch));
            }
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    /// Returns the upper-cased identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Token Identifier
// ============================================================================

/// Number of hex characters retained when a token id appears in audit records.
pub const TOKEN_ID_AUDIT_PREFIX: usize = 8;

/// Opaque approval token identifier (64 lowercase hex characters when minted
/// by the registry; arbitrary text when echoed back by a caller).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Creates a token identifier from caller-provided text.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Encodes freshly generated token bytes as a hex identifier.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(crate::core::canonical::hex_encode(bytes))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when no token text was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the truncated prefix safe to include in audit records.
    #[must_use]
    pub fn audit_prefix(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(TOKEN_ID_AUDIT_PREFIX)
            .map_or(self.0.len(), |(index, _)| index);
        &self.0[..end]
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TokenId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TokenId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
