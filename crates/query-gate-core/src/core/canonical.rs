// crates/query-gate-core/src/core/canonical.rs
// ============================================================================
// Module: Canonical SQL Form
// Description: Comment stripping, case folding, and whitespace collapsing.
// Purpose: Neutralize commentary- and case-based evasions before validation.
// Dependencies: serde, sha2, subtle
// ============================================================================

//! ## Overview
//! Every submitted statement is reduced to a canonical form before any rule
//! inspects it: comments removed, ASCII letters upper-cased, whitespace runs
//! collapsed. The canonical form is what the validator scans and what is
//! hashed for approval binding; the original text is what executes.
//!
//! The normalizer is intentionally syntactic. It does no SQL parsing, because
//! its only job is to make `SEL/**/ECT` read as `SELECT` and `dElEtE` read as
//! `DELETE`. Non-ASCII characters pass through unchanged so homoglyph
//! spellings of keywords never become keywords.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Canonical Form
// ============================================================================

/// Canonical form of a SQL statement.
///
/// # Invariants
/// - Contains no line or block comments.
/// - ASCII letters are upper-cased; non-ASCII characters are unchanged.
/// - Whitespace runs are collapsed to single spaces; ends are trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSql(String);

impl CanonicalSql {
    /// Normalizes raw SQL text into its canonical form.
    #[must_use]
    pub fn of(raw: &str) -> Self {
        let stripped = strip_comments(raw);
        let mut out = String::with_capacity(stripped.len());
        let mut pending_space = false;
        for ch in stripped.chars() {
            if ch.is_whitespace() {
                pending_space = !out.is_empty();
                continue;
            }
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch.to_ascii_uppercase());
        }
        Self(out)
    }

    /// Returns the canonical text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when nothing remains after normalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the SHA-256 digest of the canonical text.
    #[must_use]
    pub fn hash(&self) -> CanonicalHash {
        CanonicalHash::digest(&self.0)
    }
}

impl fmt::Display for CanonicalSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Removes `--` line comments and non-nested `/* */` block comments.
///
/// An unterminated block comment is stripped to the end of the input, which
/// fails closed: nothing hidden behind an opener survives into the canonical
/// form. Comment bodies are replaced with nothing so that split keywords
/// (`SEL/**/ECT`) rejoin.
fn strip_comments(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'-' && bytes.get(i + 1) == Some(&b'-') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            i += 2;
            loop {
                if i >= bytes.len() {
                    return out;
                }
                if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    i += 2;
                    break;
                }
                i += 1;
            }
            continue;
        }
        // Multi-byte characters never start with an ASCII byte, so walking
        // char boundaries here stays aligned.
        let ch_len = raw[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&raw[i..i + ch_len]);
        i += ch_len;
    }
    out
}

// ============================================================================
// SECTION: Canonical Hash
// ============================================================================

/// SHA-256 digest of a canonical form, used for approval binding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CanonicalHash([u8; 32]);

impl CanonicalHash {
    /// Computes the digest of the given canonical text.
    #[must_use]
    pub fn digest(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Compares two digests in constant time.
    #[must_use]
    pub fn ct_matches(&self, other: &Self) -> bool {
        bool::from(self.0.ct_eq(&other.0))
    }

    /// Returns the lowercase hex encoding of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }
}

impl fmt::Debug for CanonicalHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalHash({})", self.to_hex())
    }
}

/// Encodes bytes as lowercase hex without external dependencies.
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let hi = usize::from(byte >> 4);
        let lo = usize::from(byte & 0x0f);
        out.push(char::from(HEX[hi]));
        out.push(char::from(HEX[lo]));
    }
    out
}
