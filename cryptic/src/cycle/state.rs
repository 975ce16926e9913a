//! The cycle-state aggregate.
//!
//! [`CycleState`] holds everything that changes during a week: status,
//! deadlines, the staged puzzle, entrants, submissions and the archive of
//! the previous cycle. It is plain data with no locking and no clock; the
//! scheduler owns it behind a mutex and passes `now` in.
//!
//! Every mutating method appends its events to a caller-supplied batch and
//! finishes with [`CycleState::commit`], which bumps `version` and appends
//! the resulting `STATE` snapshot. A batch therefore always ends with the
//! snapshot that reflects it.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use cryptic_core::{CipherError, GeneratedPuzzle, PreviewCounts, PublicCipher};
use serde::Serialize;

use super::events::CycleEvent;
use super::ledger::{Player, Receipt, SubmissionLedger};
use super::rollover::{LastCycleSnapshot, RolloverLedger};
use super::snapshot::{Heartbeat, LastCycleSummary, PublicSnapshot, RevealPayload};
use crate::error::{EntryError, GenerateError, SubmitError};
use crate::observability::metrics::{self, PuzzleSource};
use crate::phase::{Anchors, Status};

/// What an admin gets back after staging a puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedPuzzle {
    pub cycle_id: u64,
    pub cipher: PublicCipher,
    pub counts: PreviewCounts,
    pub seed: String,
}

/// Mutable competition state.
#[derive(Debug, Clone)]
pub struct CycleState {
    cycle_id: u64,
    status: Status,
    version: u64,
    end_at: Option<DateTime<Utc>>,
    duration: Duration,
    cipher_until: Option<DateTime<Utc>>,
    cipher_window: Duration,
    staged: Option<GeneratedPuzzle>,
    entrants: HashSet<String>,
    ledger: SubmissionLedger,
    last: Option<LastCycleSnapshot>,
    rollovers: RolloverLedger,
}

impl CycleState {
    /// Fresh state at cycle 0, status IDLE.
    #[must_use]
    pub fn new(cipher_window: Duration) -> Self {
        Self {
            cycle_id: 0,
            status: Status::Idle,
            version: 0,
            end_at: None,
            duration: Duration::zero(),
            cipher_until: None,
            cipher_window,
            staged: None,
            entrants: HashSet::new(),
            ledger: SubmissionLedger::new(0),
            last: None,
            rollovers: RolloverLedger::new(),
        }
    }

    #[must_use]
    pub const fn cycle_id(&self) -> u64 {
        self.cycle_id
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub const fn cipher_until(&self) -> Option<DateTime<Utc>> {
        self.cipher_until
    }

    #[must_use]
    pub const fn ledger(&self) -> &SubmissionLedger {
        &self.ledger
    }

    #[must_use]
    pub const fn rollovers(&self) -> &RolloverLedger {
        &self.rollovers
    }

    #[must_use]
    pub const fn has_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// True if `user_id` has paid for the current cycle.
    #[must_use]
    pub fn is_entrant(&self, user_id: &str) -> bool {
        self.entrants.contains(user_id)
    }

    // ========================================================================
    // Phase transitions
    // ========================================================================

    /// Enters RUNNING with the countdown pinned to `anchors.main_zero`.
    pub fn enter_running(&mut self, anchors: &Anchors, now: DateTime<Utc>, events: &mut Vec<CycleEvent>) {
        self.set_status(Status::Running);
        self.end_at = Some(anchors.main_zero);
        self.duration = anchors.main_zero - anchors.start_running;
        self.cipher_until = None;
        events.push(self.status_event());
        self.commit(now, events);
    }

    /// Re-pins a drifted countdown. Returns `true` if anything changed.
    pub fn pin_countdown(&mut self, anchors: &Anchors, now: DateTime<Utc>, events: &mut Vec<CycleEvent>) -> bool {
        if self.end_at == Some(anchors.main_zero) {
            return false;
        }
        tracing::debug!(cycle_id = self.cycle_id, "countdown re-pinned");
        self.end_at = Some(anchors.main_zero);
        self.duration = anchors.main_zero - anchors.start_running;
        self.commit(now, events);
        true
    }

    /// Opens the cipher window.
    ///
    /// When nothing is staged, `fallback` is asked for a puzzle for the
    /// current cycle. Submissions and winner start empty.
    pub fn enter_cipher(
        &mut self,
        anchors: &Anchors,
        now: DateTime<Utc>,
        fallback: impl FnOnce(u64) -> Option<GeneratedPuzzle>,
        events: &mut Vec<CycleEvent>,
    ) {
        self.set_status(Status::Cipher);
        self.end_at = None;
        self.duration = Duration::zero();
        self.cipher_until = Some(anchors.cipher_end);
        self.ledger = SubmissionLedger::new(self.cycle_id);

        if self.staged.is_none() {
            self.staged = fallback(self.cycle_id);
            if self.staged.is_some() {
                metrics::record_puzzle_generated(PuzzleSource::Fallback);
                tracing::info!(cycle_id = self.cycle_id, "fallback puzzle staged");
            }
        }
        match &self.staged {
            Some(puzzle) => events.push(CycleEvent::Cipher(puzzle.bundle.public_view())),
            None => tracing::warn!(cycle_id = self.cycle_id, "cipher window opened without a puzzle"),
        }

        events.push(self.status_event());
        self.commit(now, events);
    }

    /// Re-pins a drifted window deadline. Returns `true` if anything changed.
    pub fn pin_deadline(&mut self, anchors: &Anchors, now: DateTime<Utc>, events: &mut Vec<CycleEvent>) -> bool {
        if self.cipher_until == Some(anchors.cipher_end) {
            return false;
        }
        tracing::debug!(cycle_id = self.cycle_id, "cipher deadline re-pinned");
        self.cipher_until = Some(anchors.cipher_end);
        self.commit(now, events);
        true
    }

    /// Archives the current cycle and advances to the next one, once per
    /// window.
    ///
    /// `window_end` identifies the window being closed. Returns the id of
    /// the archived cycle, or `None` if that window was already rolled.
    pub fn roll_over(
        &mut self,
        window_end: DateTime<Utc>,
        now: DateTime<Utc>,
        events: &mut Vec<CycleEvent>,
    ) -> Option<u64> {
        if !self.rollovers.claim(window_end) {
            tracing::debug!(cycle_id = self.cycle_id, %window_end, "rollover already claimed");
            return None;
        }

        let ended = self.cycle_id;
        let winner = self.ledger.winner().cloned();
        let had_winner = winner.is_some();
        let bundle = self.staged.take().map(|puzzle| puzzle.bundle);
        self.last = Some(LastCycleSnapshot::archive(ended, winner, bundle));

        self.cycle_id = ended + 1;
        self.ledger = SubmissionLedger::new(self.cycle_id);
        self.entrants.clear();
        self.end_at = None;
        self.duration = Duration::zero();
        self.cipher_until = None;

        tracing::info!(
            ended_cycle = ended,
            next_cycle = self.cycle_id,
            had_winner,
            "cycle rolled over"
        );
        metrics::record_rollover(self.cycle_id);

        events.push(CycleEvent::Ended { cycle_id: ended });
        self.commit(now, events);
        Some(ended)
    }

    /// Enters the post-window blackout.
    ///
    /// The `STATUS` event names the cycle that just ended, matching the
    /// preceding `ENDED`; the snapshot already carries the next id.
    pub fn enter_ended(&mut self, now: DateTime<Utc>, events: &mut Vec<CycleEvent>) {
        self.set_status(Status::Ended);
        self.end_at = None;
        self.duration = Duration::zero();
        self.cipher_until = None;
        let ended = self.last.as_ref().map_or(self.cycle_id, |last| last.cycle_id);
        events.push(CycleEvent::Status {
            status: Status::Ended,
            cycle_id: ended,
        });
        self.commit(now, events);
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Stages a puzzle for the current cycle.
    ///
    /// `generate` receives the current cycle id. Refused while the window
    /// is open so the live answer never changes.
    pub fn stage(
        &mut self,
        now: DateTime<Utc>,
        generate: impl FnOnce(u64) -> Result<GeneratedPuzzle, CipherError>,
        events: &mut Vec<CycleEvent>,
    ) -> Result<StagedPuzzle, GenerateError> {
        if self.status == Status::Cipher {
            return Err(GenerateError::WindowOpen);
        }
        let puzzle = generate(self.cycle_id)?;
        let staged = StagedPuzzle {
            cycle_id: self.cycle_id,
            cipher: puzzle.bundle.public_view(),
            counts: puzzle.bundle.counts().clone(),
            seed: puzzle.bundle.seed().to_owned(),
        };
        self.staged = Some(puzzle);
        metrics::record_puzzle_generated(PuzzleSource::Admin);
        tracing::info!(cycle_id = self.cycle_id, "puzzle staged");
        self.commit(now, events);
        Ok(staged)
    }

    /// Authorizes `user_id` for the current cycle.
    ///
    /// Returns `true` if the user was not already authorized. Entrants are
    /// not part of the public snapshot, so nothing is published.
    pub fn grant_entry(&mut self, cycle_id: u64, user_id: &str) -> Result<bool, EntryError> {
        if cycle_id != self.cycle_id {
            return Err(EntryError {
                requested: cycle_id,
                current: self.cycle_id,
            });
        }
        Ok(self.entrants.insert(user_id.to_owned()))
    }

    /// Records a player's one submission for the live window.
    pub fn submit(
        &mut self,
        cycle_id: u64,
        player: &Player,
        answer: &str,
        now: DateTime<Utc>,
        events: &mut Vec<CycleEvent>,
    ) -> Result<Receipt, SubmitError> {
        if self.status != Status::Cipher || self.cipher_until.is_none_or(|until| now >= until) {
            return Err(SubmitError::WindowClosed);
        }
        if cycle_id != self.cycle_id {
            return Err(SubmitError::StaleCycle);
        }
        if !self.entrants.contains(&player.user_id) {
            return Err(SubmitError::NotAuthorized);
        }

        let expected = self
            .staged
            .as_ref()
            .map_or("", |puzzle| puzzle.canonical_answer.as_str());
        let receipt = self.ledger.record(player, answer, expected, now);
        if matches!(receipt, Receipt::Recorded { .. }) {
            events.push(CycleEvent::SubmissionReceived {
                cycle_id: self.cycle_id,
            });
            self.commit(now, events);
        }
        Ok(receipt)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Public snapshot at `now`.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> PublicSnapshot {
        let last = self
            .last
            .as_ref()
            .map_or_else(LastCycleSummary::default, |last| LastCycleSummary {
                cycle_id: Some(last.cycle_id),
                winner: last.winner.as_ref().map(super::ledger::Winner::view),
                has_reveal: last.has_reveal(),
            });
        PublicSnapshot {
            status: self.status,
            end_at: self.end_at.map(|t| t.timestamp_millis()),
            duration_ms: self.duration.num_milliseconds(),
            cipher_until: self.cipher_until.map(|t| t.timestamp_millis()),
            cipher_seconds: self.cipher_window.num_seconds(),
            cycle_id: self.cycle_id,
            has_prepared_cipher: self.staged.is_some(),
            last,
            server_now: now.timestamp_millis(),
            version: self.version,
        }
    }

    /// Heartbeat counting down to the next boundary in `anchors`.
    #[must_use]
    pub fn heartbeat(&self, anchors: &Anchors, now: DateTime<Utc>) -> Heartbeat {
        let target = match self.status {
            Status::Running => self.end_at.unwrap_or(anchors.main_zero),
            Status::Cipher => self.cipher_until.unwrap_or(anchors.cipher_end),
            Status::Idle | Status::Ended => anchors.next_start_running,
        };
        Heartbeat {
            server_now: now.timestamp_millis(),
            ms_left: (target - now).num_milliseconds().max(0),
            cycle_id: self.cycle_id,
            status: self.status,
            version: self.version,
        }
    }

    /// The live puzzle, only while the window is open.
    #[must_use]
    pub fn public_cipher(&self) -> Option<PublicCipher> {
        if self.status != Status::Cipher {
            return None;
        }
        self.staged.as_ref().map(|puzzle| puzzle.bundle.public_view())
    }

    /// The previous cycle's answer sheet, for current-cycle entrants only.
    #[must_use]
    pub fn reveal_for(&self, user_id: &str) -> Option<RevealPayload> {
        if !self.is_entrant(user_id) {
            return None;
        }
        let last = self.last.as_ref()?;
        Some(RevealPayload {
            last_cycle_id: last.cycle_id,
            last_winner: last.winner.as_ref().map(super::ledger::Winner::view),
            last_cipher: last.bundle.clone(),
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Bumps `version` and appends the resulting snapshot.
    fn commit(&mut self, now: DateTime<Utc>, events: &mut Vec<CycleEvent>) {
        self.version += 1;
        events.push(CycleEvent::State(self.snapshot(now)));
    }

    fn set_status(&mut self, to: Status) {
        let from = self.status;
        self.status = to;
        tracing::info!(from = %from, to = %to, cycle_id = self.cycle_id, "phase transition");
        metrics::record_phase_transition(from, to);
    }

    const fn status_event(&self) -> CycleEvent {
        CycleEvent::Status {
            status: self.status,
            cycle_id: self.cycle_id,
        }
    }
}
