//! Configuration loading and validation
//!
//! YAML file → [`CrypticConfig`] → validated [`Settings`].

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, MAX_CONFIG_SIZE};
pub use schema::CrypticConfig;
pub use validation::{Settings, Validator};
