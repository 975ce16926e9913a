//! `preview`: fit diagnostics for a phrase.

use cryptic_core::preview_counts;

use crate::cli::args::PreviewArgs;
use crate::error::CrypticError;

/// Print [`cryptic_core::PreviewCounts`] as JSON.
///
/// # Errors
///
/// Returns an error if the counts cannot be serialized.
pub fn run(args: &PreviewArgs) -> Result<(), CrypticError> {
    let counts = preview_counts(&args.phrase.join(" "));
    println!("{}", serde_json::to_string_pretty(&counts)?);
    Ok(())
}
