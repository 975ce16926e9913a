//! `serve`: run the competition.
//!
//! Loads configuration, builds the scheduler over the system clock, runs
//! one tick synchronously so the first snapshot is already in the right
//! phase, then starts the timer task and the HTTP listener. Returns once
//! `cancel` fires and both have stopped.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cli::args::ServeArgs;
use crate::config::{ConfigLoader, LoadResult, Settings};
use crate::cycle::EventBus;
use crate::error::CrypticError;
use crate::observability::{EventEmitter, EventLog, init_metrics};
use crate::phase::{PhaseScheduler, SystemClock};
use crate::transport::{self, HttpConfig};

/// How long shutdown waits for queued event-log lines.
const LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Start the competition server.
///
/// # Errors
///
/// Returns a config error if the configuration is invalid, an I/O error if
/// the events file cannot be opened, or a transport error if the listener
/// or metrics exporter cannot be started.
pub async fn run(args: &ServeArgs, cancel: CancellationToken) -> Result<(), CrypticError> {
    let loaded = if let Some(path) = &args.config {
        tracing::info!(config = %path.display(), "loading configuration");
        ConfigLoader::new().load(path)?
    } else {
        tracing::info!("no configuration file, using defaults");
        ConfigLoader::defaults()?
    };
    let settings = apply_overrides(loaded, args);

    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let mut bus = EventBus::new(settings.event_buffer);
    let mut log_writer = None;
    if let Some(path) = &args.events_file {
        let emitter = if path.as_os_str() == "-" {
            EventEmitter::stderr()
        } else {
            EventEmitter::from_file(path)?
        };
        let (log, writer) = EventLog::spawn(emitter);
        bus = bus.with_log(log);
        log_writer = Some(writer);
    }

    let mut scheduler = PhaseScheduler::new(settings.schedule, Arc::new(SystemClock), bus)
        .with_puzzle_defaults(settings.puzzle)
        .with_tick_interval(settings.tick_interval)
        .with_cancel(cancel.clone());
    if let Some(fallback) = settings.fallback {
        scheduler = scheduler.with_fallback(fallback);
    }
    let scheduler = Arc::new(scheduler);

    let status = scheduler.tick();
    tracing::info!(status = status.as_str(), "initial phase");
    let timer = scheduler.start_timer_task();

    let http = HttpConfig {
        bind_addr: settings.bind,
        admin_key: settings.admin_key,
    };
    let (bound_addr, server) = match transport::serve(http, Arc::clone(&scheduler), cancel.clone()).await {
        Ok(bound) => bound,
        Err(err) => {
            scheduler.shutdown();
            return Err(err.into());
        }
    };
    tracing::info!(%bound_addr, "cryptic listening");

    cancel.cancelled().await;
    tracing::info!("shutting down");

    if let Err(err) = server.await {
        tracing::warn!(error = %err, "HTTP task ended abnormally");
    }
    if let Err(err) = timer.await {
        tracing::warn!(error = %err, "timer task ended abnormally");
    }

    // last handle to the bus; the log writer drains and stops
    drop(scheduler);
    if let Some(writer) = log_writer
        && tokio::time::timeout(LOG_DRAIN_TIMEOUT, writer).await.is_err()
    {
        tracing::warn!("event log did not drain before shutdown");
    }
    Ok(())
}

/// Logs load warnings and applies CLI flags on top of the file.
fn apply_overrides(loaded: LoadResult, args: &ServeArgs) -> Settings {
    for warning in &loaded.warnings {
        tracing::warn!(location = %warning.path, "{}", warning.message);
    }

    let mut settings = loaded.settings;
    if let Some(bind) = args.bind {
        settings.bind = bind;
    }
    if let Some(key) = &args.admin_key {
        settings.admin_key = Some(key.clone());
    }
    settings
}
