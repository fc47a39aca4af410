// crates/query-gate-core/src/admission/approval.rs
// ============================================================================
// Module: Approval Registry
// Description: One-shot preview tokens binding a preview to its execute.
// Purpose: Enforce the preview-then-approve workflow with bounded memory.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A preview issues a 256-bit random token bound to the SHA-256 digest of the
//! statement's canonical form. A matching execute consumes the token exactly
//! once within its validity window; the hash comparison is constant-time.
//! Expired entries are purged on every mutation, bounding memory without a
//! background task. The clock and entropy source are injected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::admission::validator::Verdict;
use crate::core::canonical::CanonicalHash;
use crate::core::canonical::CanonicalSql;
use crate::core::entropy::SharedEntropy;
use crate::core::identifiers::TokenId;
use crate::core::time::SharedClock;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default token validity window in seconds.
pub const DEFAULT_APPROVAL_TTL_SECONDS: u64 = 300;

/// Approval registry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSettings {
    /// Token validity window in seconds.
    pub ttl_seconds: u64,
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_APPROVAL_TTL_SECONDS,
        }
    }
}

// ============================================================================
// SECTION: Ticket and Errors
// ============================================================================

/// Approval issued by a preview, returned to the caller by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTicket {
    /// Token identifier to present at execute time.
    pub token: TokenId,
    /// Issue time.
    pub issued_at: Timestamp,
    /// Expiry time.
    pub expires_at: Timestamp,
}

/// Consume-time rejection.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    /// No token was supplied.
    #[error("approval token is required; preview the statement first")]
    Required,
    /// Token is unknown or already consumed.
    #[error("approval token is invalid or already consumed; preview the statement again")]
    Invalid,
    /// Token exists but its validity window has passed.
    #[error("approval token has expired; preview the statement again")]
    Expired,
    /// Statement differs from the previewed statement.
    #[error("statement does not match the approved preview")]
    Mismatch,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Outcome of the lookup phase of a consume, decided before any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumeDecision {
    /// Token is absent or already consumed.
    Unknown,
    /// Token exists but its window has passed.
    Expired,
    /// Token exists but the canonical hash differs.
    Mismatch,
    /// Token matches and can be consumed.
    Consume,
}

/// Stored approval state keyed by token id.
#[derive(Debug, Clone)]
struct ApprovalRecord {
    /// Digest of the previewed canonical form.
    canonical_hash: CanonicalHash,
    /// Expiry time.
    expires_at: Timestamp,
    /// Verdict returned to a matching consume.
    verdict: Verdict,
}

/// In-memory one-shot token registry.
pub struct ApprovalRegistry {
    /// Active settings.
    settings: ApprovalSettings,
    /// Clock shared with issue and expiry checks.
    clock: SharedClock,
    /// Token id entropy source.
    entropy: SharedEntropy,
    /// Live approvals keyed by token id.
    records: Mutex<BTreeMap<TokenId, ApprovalRecord>>,
}

impl ApprovalRegistry {
    /// Creates a registry from settings, clock, and entropy.
    #[must_use]
    pub fn new(settings: ApprovalSettings, clock: SharedClock, entropy: SharedEntropy) -> Self {
        Self {
            settings,
            clock,
            entropy,
            records: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the configured validity window in seconds.
    #[must_use]
    pub const fn ttl_seconds(&self) -> u64 {
        self.settings.ttl_seconds
    }

    /// Issues a token bound to the canonical form of an admitted statement.
    #[must_use]
    pub fn issue(&self, verdict: &Verdict, canonical: &CanonicalSql) -> ApprovalTicket {
        let mut bytes = [0u8; 32];
        self.entropy.fill(&mut bytes);
        let token = TokenId::from_bytes(&bytes);
        let issued_at = self.clock.now();
        let expires_at = issued_at.saturating_add_secs(self.settings.ttl_seconds);
        let record = ApprovalRecord {
            canonical_hash: canonical.hash(),
            expires_at,
            verdict: verdict.clone(),
        };
        let mut records = self.lock_records();
        purge_expired(&mut records, issued_at);
        records.insert(token.clone(), record);
        ApprovalTicket {
            token,
            issued_at,
            expires_at,
        }
    }

    /// Consumes a token for the given statement's canonical form.
    ///
    /// A hash mismatch leaves the token live so the caller can retry with the
    /// previewed statement; every other outcome removes the entry.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError`] when the token is missing, unknown, expired,
    /// or bound to a different canonical form.
    pub fn consume(
        &self,
        token: &TokenId,
        canonical: &CanonicalSql,
    ) -> Result<Verdict, ApprovalError> {
        if token.is_empty() {
            return Err(ApprovalError::Required);
        }
        let now = self.clock.now();
        let presented = canonical.hash();
        let mut records = self.lock_records();
        let decision = match records.get(token) {
            None => ConsumeDecision::Unknown,
            Some(record) if now >= record.expires_at => ConsumeDecision::Expired,
            Some(record) if !record.canonical_hash.ct_matches(&presented) => {
                ConsumeDecision::Mismatch
            }
            Some(_) => ConsumeDecision::Consume,
        };
        let outcome = match decision {
            ConsumeDecision::Unknown => Err(ApprovalError::Invalid),
            ConsumeDecision::Expired => {
                records.remove(token);
                Err(ApprovalError::Expired)
            }
            ConsumeDecision::Mismatch => Err(ApprovalError::Mismatch),
            ConsumeDecision::Consume => match records.remove(token) {
                Some(record) => Ok(record.verdict),
                None => Err(ApprovalError::Invalid),
            },
        };
        purge_expired(&mut records, now);
        outcome
    }

    /// Returns the number of live approvals after purging expired entries.
    #[must_use]
    pub fn pending(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.lock_records();
        purge_expired(&mut records, now);
        records.len()
    }

    /// Locks the record index, recovering from poisoning.
    fn lock_records(&self) -> std::sync::MutexGuard<'_, BTreeMap<TokenId, ApprovalRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Drops every record at or past its expiry.
fn purge_expired(records: &mut BTreeMap<TokenId, ApprovalRecord>, now: Timestamp) {
    records.retain(|_, record| now < record.expires_at);
}
