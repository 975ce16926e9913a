//! Phrase and answer normalisation.
//!
//! Only `A-Z`, `0-9` and single spaces survive normalisation. The same
//! function feeds the grid layout and answer comparison, so what a player
//! sees and what a player must type can never disagree.

/// Normalises text for the cipher.
///
/// Uppercases, replaces every character outside `[A-Z0-9 ]` with a space,
/// collapses runs of whitespace to one space and trims.
#[must_use]
pub fn normalize(input: &str) -> String {
    let spaced: String = input
        .to_uppercase()
        .chars()
        .map(|c| if is_cipher_char(c) { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `true` for the 36 characters a legend can encode.
#[must_use]
pub const fn is_cipher_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}

/// Counts the letters and digits that survive normalisation.
#[must_use]
pub fn alnum_count(input: &str) -> usize {
    normalize(input).chars().filter(|&c| is_cipher_char(c)).count()
}

/// Reduces text to its canonical answer form: normalised, then stripped of
/// every non-alphanumeric character including spaces.
///
/// `"Hello, World!"` and `"HELLOWORLD"` share the canonical form
/// `"HELLOWORLD"`.
#[must_use]
pub fn canonical_answer(input: &str) -> String {
    normalize(input).chars().filter(|&c| is_cipher_char(c)).collect()
}

/// Splits an already normalised phrase into its words.
pub fn words(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|w| !w.is_empty())
}
