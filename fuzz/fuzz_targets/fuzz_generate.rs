#![no_main]

use chrono::{DateTime, Utc};
use cryptic_core::{BundleBuilder, CipherError, preview_counts};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|phrase: &str| {
    let preview = preview_counts(phrase);
    let result = BundleBuilder::new().generate(Some(1), phrase, None, DateTime::<Utc>::UNIX_EPOCH);

    match result {
        Ok(puzzle) => {
            // preview and generation agree on fit
            assert_eq!(preview.recommended_cols, Some(puzzle.bundle.grid().size().cols));
            assert_eq!(
                puzzle.bundle.grid().symbol_count(),
                puzzle.canonical_answer.chars().count()
            );
        }
        Err(CipherError::LayoutOverflow(_)) => assert!(preview.recommended_cols.is_none()),
        Err(CipherError::PhraseRequired) => assert!(preview.normalized.is_empty()),
        Err(CipherError::Alphabet(err)) => panic!("default alphabet rejected: {err}"),
    }
});
