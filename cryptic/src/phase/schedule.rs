//! Weekly schedule arithmetic.
//!
//! Phases are never stored as timers. Every tick asks [`Schedule::phase_at`]
//! which phase "now" falls in, so a restarted process lands in the right
//! phase immediately and a missed tick heals on the next one.
//!
//! ```text
//!  start_running          main_zero          cipher_end     next_start_running
//!  |------- RUNNING -------|------ CIPHER ------|---- ENDED ----|
//! ```

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Utc, Weekday};
use serde::Serialize;

/// Length of one schedule cycle.
pub const WEEK: Duration = Duration::days(7);

/// Observable competition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Before the first scheduler tick
    #[default]
    Idle,
    /// Countdown to the cipher window
    Running,
    /// Submission window is open
    Cipher,
    /// Blackout between the window closing and the next countdown
    Ended,
}

impl Status {
    /// Wire and metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Cipher => "CIPHER",
            Self::Ended => "ENDED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A weekday and time of day in the schedule's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyAnchor {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl WeeklyAnchor {
    #[must_use]
    pub const fn new(weekday: Weekday, time: NaiveTime) -> Self {
        Self { weekday, time }
    }

    /// Offset of this anchor from the start of the week (Sunday 00:00).
    fn since_week_start(self) -> Duration {
        Duration::days(i64::from(self.weekday.num_days_from_sunday()))
            + (self.time - NaiveTime::MIN)
    }

    /// How far after `earlier` this anchor falls, in `(0, 7d]`.
    #[must_use]
    pub fn after(self, earlier: Self) -> Duration {
        let delta = self.since_week_start() - earlier.since_week_start();
        if delta <= Duration::zero() {
            delta + WEEK
        } else {
            delta
        }
    }
}

/// Anchor instants for the week containing some "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchors {
    /// Countdown start
    pub start_running: DateTime<Utc>,
    /// Cipher window opens
    pub main_zero: DateTime<Utc>,
    /// Cipher window closes; also the identity of this week's window
    pub cipher_end: DateTime<Utc>,
    /// Next countdown start
    pub next_start_running: DateTime<Utc>,
}

impl Anchors {
    /// Phase of `now` relative to these anchors.
    #[must_use]
    pub fn classify(&self, now: DateTime<Utc>) -> Status {
        if now < self.main_zero {
            Status::Running
        } else if now < self.cipher_end {
            Status::Cipher
        } else {
            Status::Ended
        }
    }

    /// Close of the previous week's cipher window.
    #[must_use]
    pub fn previous_cipher_end(&self) -> DateTime<Utc> {
        self.cipher_end - WEEK
    }
}

/// Fixed weekly schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    zone: FixedOffset,
    running_starts: WeeklyAnchor,
    cipher_opens_after: Duration,
    cipher_window: Duration,
}

impl Schedule {
    /// Builds a schedule. The cipher window opens at the first `cipher_opens`
    /// strictly after `running_starts`.
    ///
    /// Callers validate that the window closes within the week; see
    /// [`Schedule::is_consistent`].
    #[must_use]
    pub fn new(
        zone: FixedOffset,
        running_starts: WeeklyAnchor,
        cipher_opens: WeeklyAnchor,
        cipher_window: Duration,
    ) -> Self {
        Self {
            zone,
            running_starts,
            cipher_opens_after: cipher_opens.after(running_starts),
            cipher_window,
        }
    }

    /// True when the window is non-empty and closes before the next
    /// countdown starts.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.cipher_window > Duration::zero()
            && self.cipher_opens_after + self.cipher_window <= WEEK
    }

    /// Length of the cipher window.
    #[must_use]
    pub const fn cipher_window(&self) -> Duration {
        self.cipher_window
    }

    /// Anchors for the week whose countdown started at or before `now`.
    #[must_use]
    pub fn anchors_at(&self, now: DateTime<Utc>) -> Anchors {
        let local = now.with_timezone(&self.zone);
        let back = (i64::from(local.weekday().num_days_from_sunday())
            - i64::from(self.running_starts.weekday.num_days_from_sunday()))
        .rem_euclid(7);

        let date = local.date_naive() - Duration::days(back);
        let local_start = date.and_time(self.running_starts.time);
        let utc_offset = Duration::seconds(i64::from(self.zone.local_minus_utc()));
        let mut start_running = (local_start - utc_offset).and_utc();
        if start_running > now {
            start_running -= WEEK;
        }

        let main_zero = start_running + self.cipher_opens_after;
        Anchors {
            start_running,
            main_zero,
            cipher_end: main_zero + self.cipher_window,
            next_start_running: start_running + WEEK,
        }
    }

    /// Status and anchors for `now`.
    #[must_use]
    pub fn phase_at(&self, now: DateTime<Utc>) -> (Status, Anchors) {
        let anchors = self.anchors_at(now);
        (anchors.classify(now), anchors)
    }
}
