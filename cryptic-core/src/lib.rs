//! `cryptic` core: seeded cipher engine
//!
//! This crate turns a secret phrase into a symbol-substitution puzzle and
//! back. It has no runtime, clock or I/O dependencies so the same engine is
//! shared by the `cryptic` service and its offline tooling.
//!
//! - [`cipher::legend`] builds the deterministic character to symbol legend
//! - [`cipher::normalize`] canonicalises phrases and answers
//! - [`cipher::layout`] places encoded words into a fixed grid
//! - [`cipher::bundle`] composes everything into public and private bundles

pub mod cipher;
pub mod error;

pub use cipher::bundle::{
    BundleBuilder, CipherBundle, GeneratedPuzzle, PreviewCounts, PublicCipher, preview_counts,
};
pub use cipher::reveal::RevealSheet;
pub use cipher::legend::Legend;
pub use error::{AlphabetError, CipherError, LayoutOverflow};
