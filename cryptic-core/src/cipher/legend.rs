//! Seeded legend construction.
//!
//! A legend zips the ordered plaintext alphabet `A..Z,0..9` against a
//! seeded Fisher–Yates shuffle of the 36 display symbols. The shuffle is
//! driven by `mulberry32` seeded with the first four bytes of the SHA-256
//! digest of the seed string, so legends are reproducible across processes,
//! platforms and releases.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::error::AlphabetError;

/// Ordered plaintext alphabet.
pub const ALPHABET36: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Default display symbols: geometric glyphs mixing hollow, partial and
/// solid shapes.
pub const CRIP36: [char; 36] = [
    '△', '▲', '▽', '▼', '◇', '◆', '□', '■', '○', '●', //
    '⬡', '⬢', '⬣', '⬤', '⬥', '⬦', '⬧', '⬨', '⬩', '⬪', //
    '⬫', '⬬', '⬭', '⬮', '⬯', //
    '◐', '◑', '◒', '◓', //
    '⊕', '⊖', '⊗', '⊘', '⊙', '⊚', '⊛',
];

// ============================================================================
// Seeded randomness
// ============================================================================

/// Derives a 32-bit seed from the big-endian first four bytes of
/// `SHA-256(seed)`.
#[must_use]
pub fn seed32(seed: &str) -> u32 {
    let digest = Sha256::digest(seed.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// The `mulberry32` generator.
///
/// Tiny and fully specified, which is what matters here: the legend for a
/// given seed must never change.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    /// Creates a generator from a 32-bit seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Returns the next raw 32-bit output.
    pub const fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let a = self.state;
        let mut t = (a ^ (a >> 15)).wrapping_mul(1 | a);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        t ^ (t >> 14)
    }

    /// Returns the next output scaled to `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// Returns a uniform index in `0..bound`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn next_index(&mut self, bound: usize) -> usize {
        // floor(r * bound) with r < 1 is always < bound
        (self.next_f64() * bound as f64) as usize
    }
}

/// Fisher–Yates shuffle from the back, one draw per position.
fn shuffle_seeded<T: Copy>(items: &[T], rng: &mut Mulberry32) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.next_index(i + 1);
        out.swap(i, j);
    }
    out
}

fn check_alphabet(symbols: &[char]) -> Result<(), AlphabetError> {
    if symbols.len() != ALPHABET36.len() {
        return Err(AlphabetError::WrongLength(symbols.len()));
    }
    let mut seen = HashSet::with_capacity(symbols.len());
    for &symbol in symbols {
        if !seen.insert(symbol) {
            return Err(AlphabetError::Duplicate(symbol));
        }
    }
    Ok(())
}

// ============================================================================
// Legend
// ============================================================================

/// Bijective mapping between the 36 plaintext characters and 36 symbols.
///
/// `forward` preserves alphabet order, so iterating it (or serializing it)
/// always yields `A` first and `9` last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Legend {
    seed: String,
    forward: IndexMap<char, char>,
    reverse: HashMap<char, char>,
    symbols: Vec<char>,
}

impl Legend {
    /// Builds the legend for `seed` over the default [`CRIP36`] symbols.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in alphabet; the `Result` is shared with
    /// [`Legend::with_symbols`].
    pub fn build(seed: &str) -> Result<Self, AlphabetError> {
        Self::with_symbols(seed, &CRIP36)
    }

    /// Builds the legend for `seed` over a custom symbol alphabet.
    ///
    /// # Errors
    ///
    /// Returns [`AlphabetError`] unless `symbols` holds exactly 36 distinct
    /// symbols.
    pub fn with_symbols(seed: &str, symbols: &[char]) -> Result<Self, AlphabetError> {
        check_alphabet(symbols)?;

        let mut rng = Mulberry32::new(seed32(seed));
        let shuffled = shuffle_seeded(symbols, &mut rng);

        let forward: IndexMap<char, char> =
            ALPHABET36.iter().copied().zip(shuffled.iter().copied()).collect();
        let reverse = forward.iter().map(|(&ch, &sym)| (sym, ch)).collect();

        Ok(Self {
            seed: seed.to_owned(),
            forward,
            reverse,
            symbols: shuffled,
        })
    }

    /// The seed this legend was built from.
    #[must_use]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Character to symbol map in alphabet order.
    #[must_use]
    pub const fn forward(&self) -> &IndexMap<char, char> {
        &self.forward
    }

    /// Shuffled symbols, index-aligned with [`ALPHABET36`].
    #[must_use]
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    /// Symbol for a plaintext character.
    #[must_use]
    pub fn encode_char(&self, c: char) -> Option<char> {
        self.forward.get(&c).copied()
    }

    /// Plaintext character for a symbol.
    #[must_use]
    pub fn decode_symbol(&self, symbol: char) -> Option<char> {
        self.reverse.get(&symbol).copied()
    }

    /// Encodes a normalised, space-free word.
    ///
    /// Characters outside the alphabet have no symbol and are skipped;
    /// normalised input never contains any.
    #[must_use]
    pub fn encode_word(&self, word: &str) -> Vec<char> {
        word.chars().filter_map(|c| self.encode_char(c)).collect()
    }

    /// Encodes a normalised phrase word by word.
    #[must_use]
    pub fn encode_phrase(&self, normalized: &str) -> Vec<Vec<char>> {
        super::normalize::words(normalized)
            .map(|w| self.encode_word(w))
            .collect()
    }

    /// Decodes encoded words back to a normalised phrase.
    #[must_use]
    pub fn decode_phrase(&self, words: &[Vec<char>]) -> String {
        words
            .iter()
            .map(|w| w.iter().filter_map(|&s| self.decode_symbol(s)).collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One `A → ◆` line per character, in alphabet order.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.forward.iter().map(|(ch, sym)| format!("{ch} → {sym}"))
    }
}
