//! Core error types for `cryptic`
//!
//! Puzzle generation errors shared across the workspace. None of these are
//! fatal: callers turn them into structured results for the admin surface.

use thiserror::Error;

use crate::cipher::bundle::PreviewCounts;

// ============================================================================
// Alphabet Errors
// ============================================================================

/// The display symbol alphabet is malformed.
///
/// A legend is a bijection between 36 characters and 36 symbols, so the
/// alphabet must contain exactly 36 distinct symbols.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlphabetError {
    /// Alphabet has the wrong number of symbols
    #[error("symbol alphabet must contain exactly 36 symbols, got {0}")]
    WrongLength(usize),

    /// Alphabet repeats a symbol
    #[error("symbol alphabet must contain 36 unique symbols, '{0}' appears twice")]
    Duplicate(char),
}

// ============================================================================
// Layout Errors
// ============================================================================

/// The phrase does not fit any candidate grid.
///
/// Carries the same diagnostic counts as a live preview so the caller can
/// show the admin how far over capacity the phrase is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "phrase too long for a 7x8 grid with natural wrapping ({} characters)",
    counts.char_count
)]
pub struct LayoutOverflow {
    /// Preview counts for the rejected phrase
    pub counts: PreviewCounts,
}

// ============================================================================
// Top-Level Cipher Error
// ============================================================================

/// Errors returned by puzzle generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// The phrase is empty once normalised
    #[error("phrase_required")]
    PhraseRequired,

    /// The symbol alphabet is malformed
    #[error(transparent)]
    Alphabet(#[from] AlphabetError),

    /// The phrase exceeds both grid capacities
    #[error(transparent)]
    LayoutOverflow(#[from] LayoutOverflow),
}

impl CipherError {
    /// Returns the stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PhraseRequired => "phrase_required",
            Self::Alphabet(_) => "invalid_alphabet",
            Self::LayoutOverflow(_) => "layout_overflow",
        }
    }

    /// Returns the diagnostic counts when the error is a layout overflow.
    #[must_use]
    pub const fn counts(&self) -> Option<&PreviewCounts> {
        match self {
            Self::LayoutOverflow(overflow) => Some(&overflow.counts),
            _ => None,
        }
    }
}
