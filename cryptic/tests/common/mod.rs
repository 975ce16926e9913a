//! Shared integration-test harness: a scheduler over a manual clock on the
//! default weekly schedule (Sunday 12:00 to Saturday 08:00 countdown, 24h
//! window, UTC-6).

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc, Weekday};
use cryptic::cycle::{CycleEvent, EventBus};
use cryptic::phase::{FallbackPuzzle, ManualClock, PhaseScheduler, Schedule, WeeklyAnchor};
use cryptic::transport::build_router;
use cryptic_core::BundleBuilder;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Hours from the countdown start to the window opening.
pub const OPENS: i64 = 140;
/// Hours from the countdown start to the window closing.
pub const CLOSES: i64 = 164;
/// Hours in a week.
pub const WEEK: i64 = 168;

/// Phrase the fallback puzzle uses.
pub const FALLBACK_PHRASE: &str = "THE TRUTH HIDES";

/// Sunday 2026-01-04 12:00 in UTC-6, plus `hours`.
pub fn week(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 4, 18, 0, 0).unwrap() + Duration::hours(hours)
}

pub fn schedule() -> Schedule {
    Schedule::new(
        FixedOffset::west_opt(6 * 3600).unwrap(),
        WeeklyAnchor::new(Weekday::Sun, NaiveTime::from_hms_opt(12, 0, 0).unwrap()),
        WeeklyAnchor::new(Weekday::Sat, NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
        Duration::hours(24),
    )
}

/// A scheduler whose clock the test moves by hand.
pub struct Harness {
    pub scheduler: Arc<PhaseScheduler>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Scheduler at `hours` into the first week, not yet ticked.
    pub fn at(hours: i64) -> Self {
        let clock = Arc::new(ManualClock::new(week(hours)));
        let scheduler = PhaseScheduler::new(schedule(), clock.clone(), EventBus::new(1024))
            .with_fallback(FallbackPuzzle::new(FALLBACK_PHRASE, BundleBuilder::new()));
        Self {
            scheduler: Arc::new(scheduler),
            clock,
        }
    }

    /// Moves the clock to `hours` and ticks once.
    pub fn tick_at(&self, hours: i64) -> cryptic::phase::Status {
        self.clock.set(week(hours));
        self.scheduler.tick()
    }

    pub fn router(&self, admin_key: Option<&str>) -> Router {
        build_router(
            Arc::clone(&self.scheduler),
            admin_key.map(str::to_owned),
            CancellationToken::new(),
        )
    }
}

/// Everything currently buffered in `rx`.
pub fn drain(rx: &mut broadcast::Receiver<CycleEvent>) -> Vec<CycleEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
