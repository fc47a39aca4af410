// crates/query-gate-core/src/core/entropy.rs
// ============================================================================
// Module: Gateway Entropy Capability
// Description: Injected randomness source for approval token generation.
// Purpose: Keep token minting cryptographically strong yet test-drivable.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Approval tokens are 256-bit values that must be unguessable in production
//! and reproducible in tests. Production wiring uses [`OsEntropy`]; tests use
//! [`SequenceEntropy`] to mint distinct, predictable tokens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;

// ============================================================================
// SECTION: Entropy Capability
// ============================================================================

/// Source of random bytes for token generation.
pub trait Entropy: Send + Sync {
    /// Fills the buffer with random bytes.
    fn fill(&self, buf: &mut [u8]);
}

/// Shared entropy handle.
pub type SharedEntropy = Arc<dyn Entropy>;

/// Operating-system CSPRNG used in production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill(&self, buf: &mut [u8]) {
        // rand::rngs::OsRng is cryptographically secure.
        rand::rngs::OsRng.fill_bytes(buf);
    }
}

/// Deterministic counter-based [`Entropy`] for tests.
///
/// Each fill stamps a fresh counter value across the buffer, so successive
/// tokens are distinct and predictable.
#[derive(Debug, Default)]
pub struct SequenceEntropy {
    /// Monotonic fill counter.
    counter: AtomicU64,
}

impl Entropy for SequenceEntropy {
    fn fill(&self, buf: &mut [u8]) {
        let value = self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let bytes = value.to_be_bytes();
        for (index, slot) in buf.iter_mut().enumerate() {
            *slot = bytes[index % bytes.len()];
        }
    }
}
