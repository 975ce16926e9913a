#![no_main]

use cryptic_core::cipher::{canonical_answer, normalize};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &str| {
    let once = normalize(input);
    assert_eq!(normalize(&once), once, "normalize is not idempotent");
    assert!(!once.starts_with(' ') && !once.ends_with(' '));
    assert!(!once.contains("  "));

    let answer = canonical_answer(&once);
    assert!(answer.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(canonical_answer(input), answer);
});
