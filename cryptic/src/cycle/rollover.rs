//! Exactly-once cycle rollover.
//!
//! A rollover is claimed by the closing instant of the cipher window it
//! archives. Claims only move forward, so a delayed, repeated or
//! out-of-order tick can neither roll the same window twice nor roll an
//! older window after a newer one.

use chrono::{DateTime, Utc};
use cryptic_core::CipherBundle;

use super::ledger::Winner;

/// Record of which cipher windows have been rolled over.
#[derive(Debug, Clone, Default)]
pub struct RolloverLedger {
    last_window: Option<DateTime<Utc>>,
    completed: u64,
}

impl RolloverLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_window: None,
            completed: 0,
        }
    }

    /// Claims the rollover for the window closing at `window_end`.
    ///
    /// Returns `false` if this window, or a later one, was already claimed.
    pub fn claim(&mut self, window_end: DateTime<Utc>) -> bool {
        if self.last_window.is_some_and(|last| window_end <= last) {
            return false;
        }
        self.last_window = Some(window_end);
        self.completed += 1;
        true
    }

    /// Closing instant of the most recently rolled window.
    #[must_use]
    pub const fn last_window(&self) -> Option<DateTime<Utc>> {
        self.last_window
    }

    /// Number of rollovers performed.
    #[must_use]
    pub const fn completed(&self) -> u64 {
        self.completed
    }
}

/// Everything carried across a rollover.
#[derive(Debug, Clone)]
pub struct LastCycleSnapshot {
    pub cycle_id: u64,
    pub winner: Option<Winner>,
    /// Answer-bearing bundle, revealed to next cycle's entrants
    pub bundle: Option<CipherBundle>,
}

impl LastCycleSnapshot {
    /// Archives a finished cycle.
    #[must_use]
    pub fn archive(cycle_id: u64, winner: Option<Winner>, bundle: Option<CipherBundle>) -> Self {
        Self {
            cycle_id,
            winner,
            bundle,
        }
    }

    /// True when a reveal sheet is available.
    #[must_use]
    pub const fn has_reveal(&self) -> bool {
        self.bundle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t(hours: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_800_000_000, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn test_claim_once_per_window() {
        let mut ledger = RolloverLedger::new();
        assert!(ledger.claim(t(0)));
        assert!(!ledger.claim(t(0)));
        assert_eq!(ledger.completed(), 1);
        assert_eq!(ledger.last_window(), Some(t(0)));
    }

    #[test]
    fn test_claims_only_move_forward() {
        let mut ledger = RolloverLedger::new();
        assert!(ledger.claim(t(168)));
        assert!(!ledger.claim(t(0)));
        assert!(ledger.claim(t(336)));
        assert_eq!(ledger.completed(), 2);
    }

    #[test]
    fn test_archive_without_bundle_has_no_reveal() {
        let snapshot = LastCycleSnapshot::archive(4, None, None);
        assert!(!snapshot.has_reveal());
        assert!(snapshot.bundle.is_none());
    }
}
