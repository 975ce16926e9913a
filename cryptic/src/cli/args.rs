//! CLI argument definitions
//!
//! All Clap derive structs for `cryptic` command-line parsing.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Weekly symbol-cipher puzzle competition server.
#[derive(Parser, Debug)]
#[command(name = "cryptic", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "CRYPTIC_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "CRYPTIC_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the competition server.
    Serve(ServeArgs),

    /// Generate a puzzle offline and print the grid, reveal sheet and export.
    Make(MakeArgs),

    /// Print live preview counts for a phrase.
    Preview(PreviewArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Serve
// ============================================================================

/// Arguments for `serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "CRYPTIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, overriding `server.bind`.
    #[arg(long, env = "CRYPTIC_BIND")]
    pub bind: Option<SocketAddr>,

    /// Expose Prometheus metrics on `127.0.0.1:<port>`.
    #[arg(long, env = "CRYPTIC_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Append outbound events (except heartbeats) to a JSONL file.
    #[arg(long, env = "CRYPTIC_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Admin key, overriding `server.admin_key`.
    #[arg(long, env = "CRYPTIC_ADMIN_KEY", hide_env_values = true)]
    pub admin_key: Option<String>,
}

// ============================================================================
// Make / Preview
// ============================================================================

/// Arguments for `make`.
#[derive(Args, Debug)]
pub struct MakeArgs {
    /// Cycle number the puzzle belongs to.
    #[arg(long)]
    pub cycle: Option<u64>,

    /// Seed string. Defaults to `cycle:<N>`, or `manual:<date>` without a cycle.
    #[arg(long)]
    pub seed: Option<String>,

    /// Print only the export JSON.
    #[arg(long)]
    pub json: bool,

    /// Secret phrase.
    #[arg(required = true, num_args = 1..)]
    pub phrase: Vec<String>,
}

/// Arguments for `preview`.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Phrase to measure.
    #[arg(required = true, num_args = 1..)]
    pub phrase: Vec<String>,
}

// ============================================================================
// Version
// ============================================================================

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_with_config() {
        let cli = Cli::try_parse_from(["cryptic", "serve", "--config", "cryptic.yaml"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.config, Some(PathBuf::from("cryptic.yaml")));
        assert_eq!(args.bind, None);
    }

    #[test]
    fn test_serve_bind_must_be_socket_addr() {
        assert!(Cli::try_parse_from(["cryptic", "serve", "--bind", "nope"]).is_err());
        let cli = Cli::try_parse_from(["cryptic", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind.map(|a| a.port()), Some(8080));
    }

    #[test]
    fn test_make_collects_phrase_words() {
        let cli = Cli::try_parse_from([
            "cryptic", "make", "--cycle", "7", "HELLO", "WORLD", "123",
        ])
        .unwrap();
        let Commands::Make(args) = cli.command else {
            panic!("expected make");
        };
        assert_eq!(args.cycle, Some(7));
        assert_eq!(args.phrase.join(" "), "HELLO WORLD 123");
        assert!(!args.json);
    }

    #[test]
    fn test_make_requires_phrase() {
        assert!(Cli::try_parse_from(["cryptic", "make", "--cycle", "1"]).is_err());
    }

    #[test]
    fn test_preview_requires_phrase() {
        assert!(Cli::try_parse_from(["cryptic", "preview"]).is_err());
    }

    #[test]
    fn test_color_choices_parse() {
        for choice in ["auto", "always", "never"] {
            let cli = Cli::try_parse_from(["cryptic", "--color", choice, "version"]);
            assert!(cli.is_ok(), "failed to parse color={choice}");
        }
    }

    #[test]
    fn test_log_format_parse() {
        let cli = Cli::try_parse_from(["cryptic", "--log-format", "json", "version"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_verbose_count() {
        let cli = Cli::try_parse_from(["cryptic", "-vvv", "version"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::try_parse_from(["cryptic", "--quiet", "version"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_version_format() {
        let cli = Cli::try_parse_from(["cryptic", "version", "--format", "json"]).unwrap();
        let Commands::Version(args) = cli.command else {
            panic!("expected version");
        };
        assert_eq!(args.format, OutputFormat::Json);
    }
}
