//! Configuration validation.
//!
//! Validation collects every problem instead of stopping at the first, and
//! on success hands back the typed [`Settings`] it parsed along the way.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Weekday};
use cryptic_core::{BundleBuilder, Legend};

use super::schema::{AnchorConfig, CrypticConfig};
use crate::error::{Severity, ValidationIssue};
use crate::phase::{FallbackPuzzle, Schedule, WeeklyAnchor};

const MIN_TICK: Duration = Duration::from_millis(10);
const MAX_TICK: Duration = Duration::from_secs(10);
const COARSE_TICK: Duration = Duration::from_secs(1);
const MIN_ADMIN_KEY_LEN: usize = 16;

// ============================================================================
// Public API
// ============================================================================

/// Typed runtime settings derived from a valid configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub schedule: Schedule,
    pub tick_interval: Duration,
    pub puzzle: BundleBuilder,
    pub fallback: Option<FallbackPuzzle>,
    pub bind: SocketAddr,
    pub admin_key: Option<String>,
    pub event_buffer: usize,
}

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,

    /// Present exactly when `errors` is empty.
    pub settings: Option<Settings>,
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `config`, collecting every issue.
    pub fn validate(&mut self, config: &CrypticConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        let schedule = self.validate_schedule(config);
        self.validate_tick(config.schedule.tick_interval);
        let puzzle = self.validate_puzzle(config);
        let fallback = self.validate_fallback(config, puzzle.as_ref());
        self.validate_server(config);

        let settings = match (self.errors.is_empty(), schedule, puzzle) {
            (true, Some(schedule), Some(puzzle)) => Some(Settings {
                schedule,
                tick_interval: config.schedule.tick_interval,
                puzzle,
                fallback,
                bind: config.server.bind,
                admin_key: config.server.admin_key.clone(),
                event_buffer: config.server.event_buffer,
            }),
            _ => None,
        };

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
            settings,
        }
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn validate_schedule(&mut self, config: &CrypticConfig) -> Option<Schedule> {
        let section = &config.schedule;
        let zone = parse_utc_offset(&section.utc_offset);
        if zone.is_none() {
            self.add_error(
                "schedule.utc_offset",
                format!("'{}' is not an offset like -06:00", section.utc_offset),
            );
        }
        let running = self.validate_anchor("schedule.running_starts", &section.running_starts);
        let opens = self.validate_anchor("schedule.cipher_opens", &section.cipher_opens);

        let window = match chrono::Duration::from_std(section.cipher_window) {
            Ok(window) if window > chrono::Duration::zero() => Some(window),
            _ => {
                self.add_error("schedule.cipher_window", "must be greater than zero");
                None
            }
        };

        let schedule = Schedule::new(zone?, running?, opens?, window?);
        if !schedule.is_consistent() {
            self.add_error(
                "schedule.cipher_window",
                "cipher window must close before the next countdown starts",
            );
            return None;
        }
        Some(schedule)
    }

    fn validate_anchor(&mut self, path: &str, anchor: &AnchorConfig) -> Option<WeeklyAnchor> {
        let weekday = anchor.weekday.trim().parse::<Weekday>().ok();
        if weekday.is_none() {
            self.add_error(
                &format!("{path}.weekday"),
                format!("'{}' is not a weekday", anchor.weekday),
            );
        }
        let time = parse_time(&anchor.time);
        if time.is_none() {
            self.add_error(
                &format!("{path}.time"),
                format!("'{}' is not a time like 12:00", anchor.time),
            );
        }
        Some(WeeklyAnchor::new(weekday?, time?))
    }

    fn validate_tick(&mut self, tick: Duration) {
        if tick < MIN_TICK || tick > MAX_TICK {
            self.add_error(
                "schedule.tick_interval",
                "must be between 10ms and 10s",
            );
        } else if tick > COARSE_TICK {
            self.add_warning(
                "schedule.tick_interval",
                "countdown heartbeats will be coarser than one second",
            );
        }
    }

    fn validate_puzzle(&mut self, config: &CrypticConfig) -> Option<BundleBuilder> {
        let section = &config.puzzle;
        let mut builder = BundleBuilder::new()
            .title(section.title.as_str())
            .hint(section.hint.as_str());

        if let Some(symbols) = &section.symbols {
            let symbols: Vec<char> = symbols.chars().filter(|c| !c.is_whitespace()).collect();
            if let Err(err) = Legend::with_symbols("cycle:0", &symbols) {
                self.add_error("puzzle.symbols", err.to_string());
                return None;
            }
            builder = builder.symbols(symbols);
        }
        if section.title.trim().is_empty() {
            self.add_warning("puzzle.title", "puzzle title is empty");
        }
        Some(builder)
    }

    fn validate_fallback(
        &mut self,
        config: &CrypticConfig,
        puzzle: Option<&BundleBuilder>,
    ) -> Option<FallbackPuzzle> {
        let Some(section) = &config.fallback else {
            self.add_warning(
                "fallback",
                "no fallback puzzle; a window with nothing staged can have no winner",
            );
            return None;
        };
        let builder = puzzle
            .cloned()
            .unwrap_or_default()
            .title(section.title.as_str())
            .hint(section.hint.as_str());

        if let Err(err) = builder.generate(Some(0), &section.phrase, None, chrono::Utc::now()) {
            self.add_error("fallback.phrase", err.to_string());
            return None;
        }
        Some(FallbackPuzzle::new(section.phrase.clone(), builder))
    }

    fn validate_server(&mut self, config: &CrypticConfig) {
        let section = &config.server;
        if section.event_buffer == 0 {
            self.add_error("server.event_buffer", "must be at least 1");
        }
        match &section.admin_key {
            Some(key) if key.len() < MIN_ADMIN_KEY_LEN => {
                self.add_warning("server.admin_key", "admin key is shorter than 16 characters");
            }
            None => {
                self.add_warning(
                    "server.admin_key",
                    "no admin key; admin and entry routes reject every request",
                );
            }
            _ => {}
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }
}

/// Parses `Z`, `UTC`, `+HH:MM`, `-HH:MM`, `+HHMM` or `+HH`.
#[must_use]
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}
