//! Metrics collection for `cryptic`.
//!
//! Prometheus-compatible metrics with typed recording functions. Every label
//! value comes from a closed set so no user input can grow label
//! cardinality.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::TransportError;
use crate::phase::Status;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `TransportError::Metrics` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), TransportError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| TransportError::Metrics(e.to_string()))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!("cryptic_ticks_total", "Scheduler ticks evaluated");
    describe_counter!(
        "cryptic_phase_transitions_total",
        "Total number of phase transitions"
    );
    describe_gauge!("cryptic_current_phase", "Current phase (1 = active)");
    describe_counter!("cryptic_rollovers_total", "Completed cycle rollovers");
    describe_counter!(
        "cryptic_submissions_total",
        "Answer submissions by outcome"
    );
    describe_counter!(
        "cryptic_puzzles_generated_total",
        "Puzzles generated by source"
    );
    describe_gauge!("cryptic_cycle_id", "Current cycle id");
    describe_counter!(
        "cryptic_observers_lagged_total",
        "Events skipped by observers that fell behind"
    );
}

/// Outcome label for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// First submission for this user and cycle
    Accepted,
    /// Repeat submission, ignored
    Duplicate,
    /// Window closed, unauthorized or stale cycle
    Rejected,
}

impl SubmissionOutcome {
    const fn as_label(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Duplicate => "duplicate",
            Self::Rejected => "rejected",
        }
    }
}

/// Where a staged puzzle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleSource {
    /// Generated by an admin
    Admin,
    /// Synthesized at window open because nothing was staged
    Fallback,
}

impl PuzzleSource {
    const fn as_label(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Fallback => "fallback",
        }
    }
}

/// Records one scheduler tick.
pub fn record_tick() {
    counter!("cryptic_ticks_total").increment(1);
}

/// Records a phase transition and moves the current-phase gauge.
pub fn record_phase_transition(from: Status, to: Status) {
    counter!(
        "cryptic_phase_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("cryptic_current_phase", "phase" => from.as_str()).set(0.0);
    gauge!("cryptic_current_phase", "phase" => to.as_str()).set(1.0);
}

/// Records a completed rollover.
#[allow(clippy::cast_precision_loss)]
pub fn record_rollover(next_cycle: u64) {
    counter!("cryptic_rollovers_total").increment(1);
    gauge!("cryptic_cycle_id").set(next_cycle as f64);
}

/// Records a submission outcome.
pub fn record_submission(outcome: SubmissionOutcome) {
    counter!("cryptic_submissions_total", "outcome" => outcome.as_label()).increment(1);
}

/// Records a generated puzzle.
pub fn record_puzzle_generated(source: PuzzleSource) {
    counter!("cryptic_puzzles_generated_total", "source" => source.as_label()).increment(1);
}

/// Records events skipped by a lagging observer.
pub fn record_observer_lag(skipped: u64) {
    counter!("cryptic_observers_lagged_total").increment(skipped);
}
