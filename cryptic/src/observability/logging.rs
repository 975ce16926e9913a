//! Logging initialization for `cryptic`.
//!
//! Structured logging via `tracing` with human-readable and JSON output
//! formats, configurable verbosity, and environment-based override via
//! `CRYPTIC_LOG_LEVEL`. Below `-vvv` the HTTP stack is held at `warn` so
//! connection chatter does not drown out phase transitions.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable that overrides the verbosity flags.
pub const LOG_LEVEL_ENV: &str = "CRYPTIC_LOG_LEVEL";

/// Crates whose debug output is only useful at trace verbosity.
const QUIET_DEPENDENCIES: &[&str] = &["hyper", "hyper_util", "h2", "tower", "axum"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Maps a verbosity level to a tracing directive string.
///
/// - 0 → `"warn"`
/// - 1 → `"info"`
/// - 2 → `"debug"`
/// - 3+ → `"trace"` (saturates)
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Builds the filter from an optional [`LOG_LEVEL_ENV`] value and the
/// `-v` count.
///
/// A parseable env value wins outright; an unparseable one is ignored.
fn build_filter(env_value: Option<&str>, verbosity: u8) -> EnvFilter {
    if let Some(raw) = env_value
        && let Ok(filter) = EnvFilter::try_new(raw)
    {
        return filter;
    }

    let mut directives = vec![verbosity_to_directive(verbosity).to_owned()];
    if verbosity < 3 {
        directives.extend(QUIET_DEPENDENCIES.iter().map(|name| format!("{name}=warn")));
    }
    EnvFilter::new(directives.join(","))
}

fn resolve_ansi(color: ColorChoice, stderr_is_terminal: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Auto => stderr_is_terminal && !no_color,
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// Initializes the global tracing subscriber on stderr.
///
/// [`LOG_LEVEL_ENV`] takes precedence over `verbosity` when set. Uses
/// `try_init()` so calling this more than once (e.g. in tests) is safe.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let env_value = std::env::var(LOG_LEVEL_ENV).ok();
    let filter = build_filter(env_value.as_deref(), verbosity);
    let show_target = verbosity >= 2;
    let use_ansi = resolve_ansi(
        color,
        std::io::stderr().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    );

    match format {
        LogFormat::Human => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(use_ansi)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
