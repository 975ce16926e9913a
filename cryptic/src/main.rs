//! `cryptic` - weekly symbol-cipher puzzle competition server

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use cryptic::cli::args::Cli;
use cryptic::cli::commands;
use cryptic::error::ExitCode;
use cryptic::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    match commands::dispatch(cli, cancel).await {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// First SIGINT/SIGTERM cancels `cancel`; a second one exits immediately.
async fn shutdown_on_signal(cancel: CancellationToken) {
    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        tracing::warn!("SIGTERM handler unavailable, listening for Ctrl+C only");
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
        return;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }

    eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
    cancel.cancel();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
        _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
    }
}
