//! Puzzle bundle construction.
//!
//! [`BundleBuilder::generate`] turns an admin phrase into a [`CipherBundle`],
//! the answer-bearing private form of a puzzle. The only way to obtain the
//! display form is the total projection [`CipherBundle::public_view`], and
//! [`PublicCipher`] has no field that could carry the legend, the reveal
//! sheet or the answer.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::layout::{self, Grid, GridSize};
use super::legend::{CRIP36, Legend};
use super::normalize::{alnum_count, canonical_answer, normalize, words};
use super::reveal::{REVEAL_TITLE, RevealInput, RevealSheet};
use crate::error::{CipherError, LayoutOverflow};

/// Default puzzle title.
pub const DEFAULT_TITLE: &str = "CRIP // 0x01";

/// Default puzzle hint.
pub const DEFAULT_HINT: &str = "Screenshot. Solve later.";

const OVERFLOW_MESSAGE: &str = "Too long to fit in 7x8 with natural wrapping.";

/// Default seed for a cycle: `cycle:{id}`, or `cycle:x` without one.
#[must_use]
pub fn default_seed(cycle_id: Option<u64>) -> String {
    cycle_id.map_or_else(|| "cycle:x".to_owned(), |id| format!("cycle:{id}"))
}

// ============================================================================
// Preview
// ============================================================================

/// Live feedback for a phrase being typed.
///
/// Layout depends only on word lengths, never on which symbols are drawn,
/// so counts are the same for every seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewCounts {
    /// Normalised phrase
    pub normalized: String,
    /// Letters and digits only
    pub char_count: usize,
    #[serde(rename = "fits7x7")]
    pub fits_square: bool,
    #[serde(rename = "fits7x8")]
    pub fits_wide: bool,
    #[serde(rename = "cellsUsed7x7")]
    pub cells_used_square: Option<usize>,
    #[serde(rename = "cellsUsed7x8")]
    pub cells_used_wide: Option<usize>,
    #[serde(rename = "cap7x7")]
    pub cap_square: usize,
    #[serde(rename = "cap7x8")]
    pub cap_wide: usize,
    /// Column count generation would pick, if any
    pub recommended_cols: Option<usize>,
    /// Set when neither grid fits
    pub error: Option<String>,
}

/// Computes [`PreviewCounts`] for a raw phrase. Pure.
#[must_use]
pub fn preview_counts(phrase: &str) -> PreviewCounts {
    let normalized = normalize(phrase);
    let tokens: Vec<Vec<char>> = words(&normalized).map(|w| w.chars().collect()).collect();

    let square = layout::layout(&tokens, GridSize::SQUARE).ok();
    let wide = layout::layout(&tokens, GridSize::WIDE).ok();

    let recommended_cols = match (&square, &wide) {
        (Some(_), _) => Some(GridSize::SQUARE.cols),
        (None, Some(_)) => Some(GridSize::WIDE.cols),
        (None, None) => None,
    };

    PreviewCounts {
        char_count: alnum_count(&normalized),
        fits_square: square.is_some(),
        fits_wide: wide.is_some(),
        cells_used_square: square.map(|p| p.cells_used),
        cells_used_wide: wide.map(|p| p.cells_used),
        cap_square: GridSize::SQUARE.capacity(),
        cap_wide: GridSize::WIDE.capacity(),
        recommended_cols,
        error: recommended_cols
            .is_none()
            .then(|| OVERFLOW_MESSAGE.to_owned()),
        normalized,
    }
}

// ============================================================================
// Bundles
// ============================================================================

/// Puzzle kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BundleType {
    #[default]
    #[serde(rename = "CRIP36")]
    Crip36,
}

/// Display-only puzzle. Safe to show at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCipher {
    #[serde(rename = "type")]
    pub kind: BundleType,
    pub title: String,
    pub hint: String,
    pub cols: usize,
    pub rows: usize,
    pub grid: Grid,
    pub grid_string: String,
}

/// Answer-bearing puzzle.
///
/// Serializes with the legend, reveal sheet and answer included; only
/// archive and admin paths may serialize it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherBundle {
    #[serde(flatten)]
    public: PublicCipher,
    legend: IndexMap<char, char>,
    reveal: RevealSheet,
    normalized_phrase: String,
    normalized_answer: String,
    seed: String,
    counts: PreviewCounts,
    prepared_at: DateTime<Utc>,
    cycle_id: Option<u64>,
}

impl CipherBundle {
    /// Projects the display-only view.
    #[must_use]
    pub fn public_view(&self) -> PublicCipher {
        self.public.clone()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.public.title
    }

    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.public.grid
    }

    #[must_use]
    pub fn grid_string(&self) -> &str {
        &self.public.grid_string
    }

    #[must_use]
    pub const fn legend(&self) -> &IndexMap<char, char> {
        &self.legend
    }

    #[must_use]
    pub const fn reveal(&self) -> &RevealSheet {
        &self.reveal
    }

    #[must_use]
    pub fn normalized_phrase(&self) -> &str {
        &self.normalized_phrase
    }

    #[must_use]
    pub fn normalized_answer(&self) -> &str {
        &self.normalized_answer
    }

    #[must_use]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    #[must_use]
    pub const fn counts(&self) -> &PreviewCounts {
        &self.counts
    }

    #[must_use]
    pub const fn prepared_at(&self) -> DateTime<Utc> {
        self.prepared_at
    }

    #[must_use]
    pub const fn cycle_id(&self) -> Option<u64> {
        self.cycle_id
    }
}

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPuzzle {
    /// Private bundle
    pub bundle: CipherBundle,
    /// Letters and digits of the phrase, no separators
    pub canonical_answer: String,
}

/// Builds puzzles from phrases.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    title: String,
    hint: String,
    symbols: Vec<char>,
}

impl Default for BundleBuilder {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            hint: DEFAULT_HINT.to_owned(),
            symbols: CRIP36.to_vec(),
        }
    }
}

impl BundleBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the puzzle title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the puzzle hint.
    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    /// Replaces the display symbol alphabet.
    #[must_use]
    pub fn symbols(mut self, symbols: impl Into<Vec<char>>) -> Self {
        self.symbols = symbols.into();
        self
    }

    /// Generates a puzzle.
    ///
    /// `seed` defaults to [`default_seed`] for `cycle_id`. The grid is 7×7
    /// when the phrase fits, otherwise 7×8.
    ///
    /// # Errors
    ///
    /// - [`CipherError::PhraseRequired`] if nothing survives normalisation
    /// - [`CipherError::Alphabet`] if the symbol alphabet is malformed
    /// - [`CipherError::LayoutOverflow`] if neither grid fits, with counts
    pub fn generate(
        &self,
        cycle_id: Option<u64>,
        phrase: &str,
        seed: Option<&str>,
        prepared_at: DateTime<Utc>,
    ) -> Result<GeneratedPuzzle, CipherError> {
        let normalized = normalize(phrase);
        if normalized.is_empty() {
            return Err(CipherError::PhraseRequired);
        }

        let seed = seed.map_or_else(|| default_seed(cycle_id), str::to_owned);
        let legend = Legend::with_symbols(&seed, &self.symbols)?;
        let encoded = legend.encode_phrase(&normalized);

        let placement = layout::best_fit(&encoded).map_err(|_| LayoutOverflow {
            counts: preview_counts(&normalized),
        })?;

        let answer = canonical_answer(&normalized);
        let grid_string = placement.grid.render();
        let size = placement.grid.size();

        let reveal = RevealSheet::build(&RevealInput {
            title: REVEAL_TITLE,
            cycle_id,
            grid: &grid_string,
            normalized: &normalized,
            answer: &answer,
            legend: &legend,
        });

        let bundle = CipherBundle {
            public: PublicCipher {
                kind: BundleType::Crip36,
                title: self.title.clone(),
                hint: self.hint.clone(),
                cols: size.cols,
                rows: size.rows,
                grid: placement.grid,
                grid_string,
            },
            legend: legend.forward().clone(),
            reveal,
            counts: preview_counts(&normalized),
            normalized_phrase: normalized,
            normalized_answer: answer.clone(),
            seed,
            prepared_at,
            cycle_id,
        };

        Ok(GeneratedPuzzle {
            bundle,
            canonical_answer: answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlphabetError;

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_767_225_600, 0).unwrap()
    }

    #[test]
    fn test_hello_world_fits_square() {
        let puzzle = BundleBuilder::new()
            .generate(Some(7), "Hello, world!", None, at())
            .unwrap();
        let bundle = &puzzle.bundle;
        assert_eq!(bundle.normalized_phrase(), "HELLO WORLD");
        assert_eq!(puzzle.canonical_answer, "HELLOWORLD");
        assert_eq!(bundle.seed(), "cycle:7");
        assert_eq!(bundle.grid().size(), GridSize::SQUARE);
        assert_eq!(bundle.counts().cells_used_square, Some(11));
        assert_eq!(bundle.grid().symbol_count(), 10);
        assert!(bundle.grid_string().starts_with("⊘ ◓ ■ ■ ▲"));
    }

    #[test]
    fn test_empty_phrase_rejected() {
        let err = BundleBuilder::new()
            .generate(Some(1), " !?., ", None, at())
            .unwrap_err();
        assert_eq!(err, CipherError::PhraseRequired);
    }

    #[test]
    fn test_overflow_returns_counts() {
        let err = BundleBuilder::new()
            .generate(Some(1), &"Q".repeat(60), None, at())
            .unwrap_err();
        let counts = err.counts().unwrap();
        assert_eq!(counts.char_count, 60);
        assert!(!counts.fits_square);
        assert!(!counts.fits_wide);
        assert_eq!(counts.recommended_cols, None);
        assert!(counts.error.is_some());
    }

    #[test]
    fn test_wide_fallback() {
        let puzzle = BundleBuilder::new()
            .generate(None, &"Z".repeat(53), Some("wide"), at())
            .unwrap();
        assert_eq!(puzzle.bundle.public_view().cols, 8);
        assert_eq!(puzzle.bundle.counts().recommended_cols, Some(8));
    }

    #[test]
    fn test_bad_alphabet_rejected() {
        let err = BundleBuilder::new()
            .symbols(vec!['x'; 36])
            .generate(Some(1), "HI", None, at())
            .unwrap_err();
        assert_eq!(err, CipherError::Alphabet(AlphabetError::Duplicate('x')));
    }

    #[test]
    fn test_explicit_seed_and_metadata() {
        let puzzle = BundleBuilder::new()
            .title("T")
            .hint("H")
            .generate(Some(3), "ABC", Some("custom"), at())
            .unwrap();
        let public = puzzle.bundle.public_view();
        assert_eq!(public.title, "T");
        assert_eq!(public.hint, "H");
        assert_eq!(puzzle.bundle.seed(), "custom");
        assert_eq!(puzzle.bundle.cycle_id(), Some(3));
        assert_eq!(puzzle.bundle.prepared_at(), at());
    }

    #[test]
    fn test_public_view_serializes_display_fields_only() {
        let puzzle = BundleBuilder::new()
            .generate(Some(2), "SECRET PHRASE", None, at())
            .unwrap();
        let json = serde_json::to_value(puzzle.bundle.public_view()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys.len(),
            7,
            "unexpected public keys: {keys:?}"
        );
        assert_eq!(json["type"], "CRIP36");
        assert!(json.get("legend").is_none());
        assert!(!json.to_string().contains("SECRET"));
    }

    #[test]
    fn test_private_bundle_serializes_everything() {
        let puzzle = BundleBuilder::new()
            .generate(Some(2), "HI THERE", None, at())
            .unwrap();
        let json = serde_json::to_value(&puzzle.bundle).unwrap();
        assert_eq!(json["type"], "CRIP36");
        assert_eq!(json["normalizedAnswer"], "HITHERE");
        assert_eq!(json["cycleId"], 2);
        assert_eq!(json["counts"]["cap7x7"], 49);
        assert_eq!(json["legend"].as_object().unwrap().len(), 36);
        assert!(json["reveal"]["markdown"].is_string());
    }

    #[test]
    fn test_preview_counts_for_scenario_phrase() {
        let counts = preview_counts("hello world");
        assert_eq!(counts.normalized, "HELLO WORLD");
        assert_eq!(counts.char_count, 10);
        assert!(counts.fits_square);
        assert_eq!(counts.cells_used_square, Some(11));
        assert_eq!(counts.recommended_cols, Some(7));
        assert_eq!(counts.error, None);
    }

    #[test]
    fn test_preview_counts_wire_names() {
        let json = serde_json::to_value(preview_counts("A")).unwrap();
        for key in [
            "normalized",
            "charCount",
            "fits7x7",
            "fits7x8",
            "cellsUsed7x7",
            "cellsUsed7x8",
            "cap7x7",
            "cap7x8",
            "recommendedCols",
            "error",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
