// crates/query-gate-core/src/admission/scan.rs
// ============================================================================
// Module: Canonical Form Scanning
// Description: Word and phrase scanning over the canonical SQL form.
// Purpose: Whole-word matching so UPDATED_AT never matches UPDATE.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The canonical form is upper-cased and single-spaced, which makes rule
//! matching a byte-level walk instead of a parse. A "word" boundary is any
//! character outside `[A-Za-z0-9_]`, guaranteeing that suffixed and prefixed
//! identifiers never match a keyword.

// ============================================================================
// SECTION: Word Boundaries
// ============================================================================

/// Returns true for characters that extend a word.
pub(crate) const fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Returns true when `text[index..]` starts `word` on whole-word boundaries.
pub(crate) fn word_at(text: &str, index: usize, word: &str) -> bool {
    let bytes = text.as_bytes();
    if index + word.len() > bytes.len() || !text[index..].starts_with(word) {
        return false;
    }
    if index > 0 && is_word_byte(bytes[index - 1]) {
        return false;
    }
    let end = index + word.len();
    if end < bytes.len() && is_word_byte(bytes[end]) {
        return false;
    }
    true
}

/// Returns true when `word` occurs as a whole word anywhere in `text`.
pub(crate) fn contains_word(text: &str, word: &str) -> bool {
    find_word_from(text, 0, word).is_some()
}

/// Counts whole-word occurrences of `word` in `text`.
pub(crate) fn count_word(text: &str, word: &str) -> usize {
    let mut count = 0;
    let mut from = 0;
    while let Some(index) = find_word_from(text, from, word) {
        count += 1;
        from = index + word.len();
    }
    count
}

/// Finds the next whole-word occurrence of `word` at or after `from`.
pub(crate) fn find_word_from(text: &str, from: usize, word: &str) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    let mut search = from;
    while search + word.len() <= text.len() {
        let Some(offset) = text[search..].find(word) else {
            return None;
        };
        let index = search + offset;
        if word_at(text, index, word) {
            return Some(index);
        }
        search = index + 1;
    }
    None
}

/// Returns true when `phrase` (single-spaced words) occurs on word boundaries.
///
/// The canonical form already collapses whitespace, so a phrase match is a
/// substring match guarded at both ends.
pub(crate) fn contains_phrase(text: &str, phrase: &str) -> bool {
    let bytes = text.as_bytes();
    let mut search = 0;
    while search + phrase.len() <= text.len() {
        let Some(offset) = text[search..].find(phrase) else {
            return false;
        };
        let index = search + offset;
        let end = index + phrase.len();
        let start_ok = index == 0 || !is_word_byte(bytes[index - 1]);
        let end_ok = end >= bytes.len() || !is_word_byte(bytes[end]);
        if start_ok && end_ok {
            return true;
        }
        search = index + 1;
    }
    false
}

/// Counts boundary-guarded occurrences of `phrase` in `text`.
pub(crate) fn count_phrase(text: &str, phrase: &str) -> usize {
    let bytes = text.as_bytes();
    let mut count = 0;
    let mut search = 0;
    while search + phrase.len() <= text.len() {
        let Some(offset) = text[search..].find(phrase) else {
            break;
        };
        let index = search + offset;
        let end = index + phrase.len();
        let start_ok = index == 0 || !is_word_byte(bytes[index - 1]);
        let end_ok = end >= bytes.len() || !is_word_byte(bytes[end]);
        if start_ok && end_ok {
            count += 1;
            search = end;
        } else {
            search = index + 1;
        }
    }
    count
}

// ============================================================================
// SECTION: Word Iteration
// ============================================================================

/// Iterates `(byte_offset, word)` pairs over the canonical form.
pub(crate) fn words(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let bytes = text.as_bytes();
    let mut index = 0;
    std::iter::from_fn(move || {
        while index < bytes.len() && !is_word_byte(bytes[index]) {
            index += 1;
        }
        if index >= bytes.len() {
            return None;
        }
        let start = index;
        while index < bytes.len() && is_word_byte(bytes[index]) {
            index += 1;
        }
        Some((start, &text[start..index]))
    })
}

/// Returns the first word of the canonical form, if any.
pub(crate) fn first_word(text: &str) -> Option<&str> {
    words(text).next().map(|(_, word)| word)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
