//! Configuration loader.
//!
//! Pipeline:
//! 1. Size guard on the file before reading
//! 2. YAML parsing (UTF-8 BOM tolerated, empty file means defaults)
//! 3. Deserialization to [`CrypticConfig`]
//! 4. Validation into typed [`Settings`]

use std::path::Path;

use super::schema::CrypticConfig;
use super::validation::{Settings, Validator};
use crate::error::{ConfigError, ValidationIssue};

/// Default maximum configuration file size.
pub const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// Result of loading a configuration.
#[derive(Debug)]
pub struct LoadResult {
    /// The parsed document, after defaults.
    pub config: CrypticConfig,

    /// Typed settings ready for the scheduler and server.
    pub settings: Settings,

    /// Non-fatal issues worth logging.
    pub warnings: Vec<ValidationIssue>,
}

/// Configuration loader.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    max_size: u64,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            max_size: MAX_CONFIG_SIZE,
        }
    }
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Loads and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is missing or unreadable
    /// - The file exceeds the size limit
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > self.max_size {
            return Err(ConfigError::TooLarge {
                size: metadata.len(),
                limit: self.max_size,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        Self::parse(&raw, path)
    }

    /// Parses and validates YAML text; `origin` is used in error messages.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn parse(raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let config = if raw.trim().is_empty() {
            CrypticConfig::default()
        } else {
            serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };
        Self::finish(config, &origin.display().to_string())
    }

    /// Validates the built-in defaults.
    ///
    /// # Errors
    ///
    /// Only fails if the defaults themselves are broken.
    pub fn defaults() -> Result<LoadResult, ConfigError> {
        Self::finish(CrypticConfig::default(), "<defaults>")
    }

    fn finish(config: CrypticConfig, origin: &str) -> Result<LoadResult, ConfigError> {
        let result = Validator::new().validate(&config);
        match result.settings {
            Some(settings) if result.errors.is_empty() => Ok(LoadResult {
                config,
                settings,
                warnings: result.warnings,
            }),
            _ => Err(ConfigError::ValidationError {
                path: origin.to_owned(),
                errors: result.errors,
            }),
        }
    }
}
