//! Configuration schema types.
//!
//! Deserialized from YAML. Every field has a default, so an empty file
//! (or no file) yields the standard weekly competition. Values that need
//! parsing beyond serde (zone offset, weekday, time of day) stay as strings
//! here and are checked by the validator, which reports every problem at
//! once.

use std::net::SocketAddr;
use std::time::Duration;

use cryptic_core::cipher::bundle::{DEFAULT_HINT, DEFAULT_TITLE};
use serde::{Deserialize, Serialize};

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CrypticConfig {
    /// Weekly phase anchors
    pub schedule: ScheduleConfig,

    /// Defaults for admin-generated puzzles
    pub puzzle: PuzzleConfig,

    /// Puzzle used when a window opens with nothing staged; `null` disables
    pub fallback: Option<FallbackConfig>,

    /// Listener and admin settings
    pub server: ServerSection,
}

impl Default for CrypticConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            puzzle: PuzzleConfig::default(),
            fallback: Some(FallbackConfig::default()),
            server: ServerSection::default(),
        }
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// Weekly schedule in a fixed UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Zone offset such as `-06:00`, `+05:30` or `Z`
    pub utc_offset: String,

    /// When the countdown starts
    pub running_starts: AnchorConfig,

    /// When the cipher window opens
    pub cipher_opens: AnchorConfig,

    /// Window length
    #[serde(with = "humantime_serde")]
    pub cipher_window: Duration,

    /// Scheduler tick period
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset: "-06:00".to_owned(),
            running_starts: AnchorConfig::new("sun", "12:00"),
            cipher_opens: AnchorConfig::new("sat", "08:00"),
            cipher_window: Duration::from_secs(24 * 3600),
            tick_interval: Duration::from_millis(250),
        }
    }
}

/// A weekday and wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// `sun`, `monday`, ...
    pub weekday: String,
    /// `HH:MM` or `HH:MM:SS`
    pub time: String,
}

impl AnchorConfig {
    #[must_use]
    pub fn new(weekday: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            weekday: weekday.into(),
            time: time.into(),
        }
    }
}

// ============================================================================
// Puzzles
// ============================================================================

/// Defaults applied to admin puzzles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    pub title: String,
    pub hint: String,
    /// Replacement 36-symbol display alphabet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<String>,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            hint: DEFAULT_HINT.to_owned(),
            symbols: None,
        }
    }
}

/// Puzzle synthesized at window open when nothing is staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub phrase: String,
    pub title: String,
    pub hint: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            phrase: "THE TRUTH HIDES IN THE PATTERN".to_owned(),
            title: "SEQUENCE // 0x00".to_owned(),
            hint: DEFAULT_HINT.to_owned(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// HTTP listen address
    pub bind: SocketAddr,

    /// Shared secret for admin routes; admin routes are open when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,

    /// Events buffered per observer before it starts losing them
    pub event_buffer: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 10000)),
            admin_key: None,
            event_buffer: 256,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Durations as humantime strings (`24h`, `250ms`).
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
