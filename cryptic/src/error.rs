//! Error types for `cryptic`
//!
//! Domain errors per subsystem, aggregated into [`CrypticError`] which maps
//! every failure to a process exit code.

use std::path::PathBuf;

use cryptic_core::CipherError;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `cryptic` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Transport error (bind failed, listener error)
    pub const TRANSPORT_ERROR: i32 = 4;

    /// Puzzle generation error (empty phrase, layout overflow)
    pub const CIPHER_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `cryptic` operations.
#[derive(Debug, Error)]
pub enum CrypticError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Puzzle generation error
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Transport layer error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CrypticError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Cipher(_) => ExitCode::CIPHER_ERROR,
            Self::Transport(_) => ExitCode::TRANSPORT_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("config file too large: {size} bytes (limit: {limit})")]
    TooLarge {
        /// Actual file size in bytes
        size: u64,
        /// Size limit in bytes
        limit: u64,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "schedule.cipher_window")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Transport Errors
// ============================================================================

/// HTTP transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during transport operations
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to bind the listener
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Metrics exporter could not be installed
    #[error("metrics exporter failed: {0}")]
    Metrics(String),
}

// ============================================================================
// Cycle Command Errors
// ============================================================================

/// Submission rejected.
///
/// The variants exist for logs and metrics only. Callers outside the core
/// must render every variant identically so rejection reasons never leak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The cipher window is not open
    #[error("submission window closed")]
    WindowClosed,

    /// The user is not authorized for this cycle
    #[error("not authorized for this cycle")]
    NotAuthorized,

    /// The submission names a cycle other than the current one
    #[error("submission for a stale cycle")]
    StaleCycle,
}

impl SubmitError {
    /// Stable label for metrics.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::WindowClosed => "window_closed",
            Self::NotAuthorized => "not_authorized",
            Self::StaleCycle => "stale_cycle",
        }
    }
}

/// Admin puzzle generation rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// The cipher window is live; the answer cannot change mid-window
    #[error("cipher_window_open")]
    WindowOpen,

    /// The phrase could not be turned into a puzzle
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

impl GenerateError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::WindowOpen => "cipher_window_open",
            Self::Cipher(err) => err.code(),
        }
    }
}

/// Payment authorization rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("entry granted for cycle {requested}, current cycle is {current}")]
pub struct EntryError {
    /// Cycle named by the collaborator
    pub requested: u64,
    /// Current cycle
    pub current: u64,
}

/// A state invariant would have been violated.
///
/// Logged and ignored; never propagated to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateInvariantError {
    /// A second winner write was attempted for the same cycle
    #[error("winner already recorded for cycle {cycle_id}")]
    WinnerAlreadySet {
        /// Cycle whose winner is already set
        cycle_id: u64,
    },
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `cryptic` operations.
pub type Result<T> = std::result::Result<T, CrypticError>;

// ============================================================================
// Tests
// ============================================================================
