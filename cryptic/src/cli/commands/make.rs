//! `make`: offline puzzle generation.
//!
//! Prints the cipher grid, the reveal sheet and the export JSON an operator
//! would archive. With `--json` only the export is printed.

use chrono::{DateTime, Utc};
use cryptic_core::BundleBuilder;

use crate::cli::args::MakeArgs;
use crate::error::CrypticError;

/// Generate a puzzle and print it.
///
/// # Errors
///
/// Returns [`CrypticError::Cipher`] when the phrase is empty or too long.
/// Overflow counts are printed to stderr first.
pub fn run(args: &MakeArgs) -> Result<(), CrypticError> {
    let output = render(args, Utc::now())?;
    println!("{output}");
    Ok(())
}

/// Seed used when neither `--seed` nor `--cycle` is given.
fn manual_seed(now: DateTime<Utc>) -> String {
    format!("manual:{}", now.format("%Y-%m-%d"))
}

fn render(args: &MakeArgs, now: DateTime<Utc>) -> Result<String, CrypticError> {
    let phrase = args.phrase.join(" ");
    let seed = args
        .seed
        .clone()
        .or_else(|| args.cycle.is_none().then(|| manual_seed(now)));

    let puzzle = match BundleBuilder::new().generate(args.cycle, &phrase, seed.as_deref(), now) {
        Ok(puzzle) => puzzle,
        Err(err) => {
            if let Some(counts) = err.counts() {
                eprintln!("counts: {}", serde_json::to_string_pretty(counts)?);
            }
            return Err(err.into());
        }
    };

    let export = serde_json::to_string_pretty(&puzzle.bundle)?;
    if args.json {
        return Ok(export);
    }

    Ok(format!(
        "=== CIPHER GRID ===\n\n{}\n\n=== REVEAL (TEXT) ===\n\n{}\n\n=== EXPORT JSON ===\n\n{export}",
        puzzle.bundle.grid_string(),
        puzzle.bundle.reveal().text,
    ))
}
