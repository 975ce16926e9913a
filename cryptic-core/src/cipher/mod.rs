//! Seeded substitution cipher
//!
//! The pipeline is `normalize` → `legend` encode → `layout` → `bundle`.
//! Every stage is a pure function of its inputs: the same phrase and seed
//! always produce the same grid.

pub mod bundle;
pub mod layout;
pub mod legend;
pub mod normalize;
pub mod reveal;

pub use layout::{Cell, Grid, GridSize, Placement};
pub use legend::{ALPHABET36, CRIP36, Legend};
pub use normalize::{canonical_answer, normalize};
