//! Phase scheduler
//!
//! The `PhaseScheduler` owns the cycle state and drives it from a periodic
//! tick. Each tick classifies "now" against the weekly [`Schedule`],
//! performs whatever transition that implies, and publishes the resulting
//! events while still holding the state lock so delivery order matches
//! version order.
//!
//! All commands (generate, entry, submit) and queries go through the same
//! lock, so a submission can never interleave with a rollover.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cryptic_core::{BundleBuilder, GeneratedPuzzle, PreviewCounts, PublicCipher, preview_counts};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::schedule::{Anchors, Schedule, Status};
use crate::cycle::{
    CycleEvent, CycleState, EventBus, Player, PublicSnapshot, Receipt, RevealPayload, StagedPuzzle,
};
use crate::error::{EntryError, GenerateError, SubmitError};
use crate::observability::metrics::{self, SubmissionOutcome};

/// Default tick period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Puzzle synthesized when a window opens with nothing staged.
#[derive(Debug, Clone)]
pub struct FallbackPuzzle {
    phrase: String,
    builder: BundleBuilder,
}

impl FallbackPuzzle {
    /// `builder` carries the fallback's title, hint and symbols.
    #[must_use]
    pub fn new(phrase: impl Into<String>, builder: BundleBuilder) -> Self {
        Self {
            phrase: phrase.into(),
            builder,
        }
    }

    fn generate(&self, cycle_id: u64, now: DateTime<Utc>) -> Option<GeneratedPuzzle> {
        match self.builder.generate(Some(cycle_id), &self.phrase, None, now) {
            Ok(puzzle) => Some(puzzle),
            Err(err) => {
                error!(cycle_id, code = err.code(), "fallback puzzle could not be generated");
                None
            }
        }
    }
}

/// Admin request to stage a puzzle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    pub phrase: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub seed: Option<String>,
}

/// Reply to every accepted submission, first or repeated.
///
/// Carries nothing about correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmissionAck {
    pub ok: bool,
    pub received: bool,
}

impl SubmissionAck {
    pub const RECEIVED: Self = Self {
        ok: true,
        received: true,
    };
}

/// Drives the weekly cycle.
pub struct PhaseScheduler {
    state: Mutex<CycleState>,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    puzzle: BundleBuilder,
    fallback: Option<FallbackPuzzle>,
    tick_interval: Duration,
    cancel: CancellationToken,
}

impl std::fmt::Debug for PhaseScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseScheduler")
            .field("schedule", &self.schedule)
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}

impl PhaseScheduler {
    /// Creates a scheduler in the IDLE state at cycle 0.
    #[must_use]
    pub fn new(schedule: Schedule, clock: Arc<dyn Clock>, bus: EventBus) -> Self {
        Self {
            state: Mutex::new(CycleState::new(schedule.cipher_window())),
            schedule,
            clock,
            bus,
            puzzle: BundleBuilder::new(),
            fallback: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    /// Title and hint applied to admin puzzles unless the request overrides
    /// them.
    #[must_use]
    pub fn with_puzzle_defaults(mut self, builder: BundleBuilder) -> Self {
        self.puzzle = builder;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackPuzzle) -> Self {
        self.fallback = Some(fallback);
        self
    }

    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Shares an externally owned cancellation token (e.g. the signal
    /// handler's).
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Evaluates the schedule once and applies any transition.
    ///
    /// Returns the status after the tick.
    pub fn tick(&self) -> Status {
        let now = self.clock.now();
        let (desired, anchors) = self.schedule.phase_at(now);
        metrics::record_tick();

        let mut state = self.lock();
        let mut events = Vec::new();
        match desired {
            Status::Running => Self::tick_running(&mut state, &anchors, now, &mut events),
            Status::Cipher => self.tick_cipher(&mut state, &anchors, now, &mut events),
            Status::Ended | Status::Idle => {
                state.roll_over(anchors.cipher_end, now, &mut events);
                if state.status() != Status::Ended {
                    state.enter_ended(now, &mut events);
                }
            }
        }

        events.push(CycleEvent::Tick(state.heartbeat(&anchors, now)));
        self.bus.publish(events);
        state.status()
    }

    fn tick_running(
        state: &mut CycleState,
        anchors: &Anchors,
        now: DateTime<Utc>,
        events: &mut Vec<CycleEvent>,
    ) {
        if state.status() == Status::Cipher {
            match state.cipher_until() {
                Some(until) if until > now => {
                    debug!(%now, %until, "clock behind the open window, holding");
                    return;
                }
                until => {
                    // the blackout was never observed
                    let window = until.unwrap_or_else(|| anchors.previous_cipher_end());
                    warn!(cycle_id = state.cycle_id(), "ENDED phase skipped, rolling over late");
                    state.roll_over(window, now, events);
                }
            }
        }
        if state.status() == Status::Running {
            state.pin_countdown(anchors, now, events);
        } else {
            state.enter_running(anchors, now, events);
        }
    }

    fn tick_cipher(
        &self,
        state: &mut CycleState,
        anchors: &Anchors,
        now: DateTime<Utc>,
        events: &mut Vec<CycleEvent>,
    ) {
        if state.status() == Status::Cipher {
            match state.cipher_until() {
                Some(until) if until < anchors.cipher_end => {
                    warn!(cycle_id = state.cycle_id(), "a full week was skipped, rolling over late");
                    state.roll_over(until, now, events);
                }
                _ => {
                    state.pin_deadline(anchors, now, events);
                    return;
                }
            }
        }
        state.enter_cipher(anchors, now, |id| self.fallback_puzzle(id, now), events);
    }

    fn fallback_puzzle(&self, cycle_id: u64, now: DateTime<Utc>) -> Option<GeneratedPuzzle> {
        self.fallback.as_ref()?.generate(cycle_id, now)
    }

    /// Starts the background tick task.
    ///
    /// The first tick fires immediately. The task stops when the
    /// cancellation token is cancelled.
    pub fn start_timer_task(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = scheduler.cancel.cancelled() => {
                        debug!("tick task cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        scheduler.tick();
                    }
                }
            }
        })
    }

    /// Stops the tick task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Stages a puzzle for the current cycle.
    ///
    /// # Errors
    ///
    /// - [`GenerateError::WindowOpen`] while the cipher window is live
    /// - [`GenerateError::Cipher`] if the phrase cannot become a puzzle
    pub fn generate_puzzle(&self, request: &GenerateRequest) -> Result<StagedPuzzle, GenerateError> {
        let now = self.clock.now();
        let mut builder = self.puzzle.clone();
        if let Some(title) = &request.title {
            builder = builder.title(title.as_str());
        }
        if let Some(hint) = &request.hint {
            builder = builder.hint(hint.as_str());
        }

        let mut state = self.lock();
        let mut events = Vec::new();
        let staged = state.stage(
            now,
            |cycle_id| builder.generate(Some(cycle_id), &request.phrase, request.seed.as_deref(), now),
            &mut events,
        );
        self.bus.publish(events);
        if let Err(err) = &staged {
            info!(code = err.code(), "puzzle generation rejected");
        }
        staged
    }

    /// Fit diagnostics for a phrase being typed. Touches no state.
    #[must_use]
    pub fn preview_puzzle(&self, phrase: &str) -> PreviewCounts {
        preview_counts(phrase)
    }

    /// Authorizes a user for `cycle_id`, which must be the current cycle.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError`] when `cycle_id` is not the current cycle.
    pub fn grant_entry(&self, cycle_id: u64, user_id: &str) -> Result<(), EntryError> {
        let mut state = self.lock();
        match state.grant_entry(cycle_id, user_id) {
            Ok(true) => {
                debug!(cycle_id, "entry granted");
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(err) => {
                info!(requested = err.requested, current = err.current, "entry for wrong cycle");
                Err(err)
            }
        }
    }

    /// Records a player's answer.
    ///
    /// A repeat submission returns the same acknowledgement as the first
    /// and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when the window is closed, the player has
    /// not entered, or `cycle_id` is stale. Callers must not distinguish
    /// the variants to the player.
    pub fn submit_answer(
        &self,
        cycle_id: u64,
        player: &Player,
        answer: &str,
    ) -> Result<SubmissionAck, SubmitError> {
        let now = self.clock.now();
        let mut state = self.lock();
        let mut events = Vec::new();
        let result = state.submit(cycle_id, player, answer, now, &mut events);
        self.bus.publish(events);
        drop(state);

        match result {
            Ok(Receipt::Recorded { .. }) => {
                metrics::record_submission(SubmissionOutcome::Accepted);
                Ok(SubmissionAck::RECEIVED)
            }
            Ok(Receipt::Duplicate) => {
                metrics::record_submission(SubmissionOutcome::Duplicate);
                Ok(SubmissionAck::RECEIVED)
            }
            Err(err) => {
                metrics::record_submission(SubmissionOutcome::Rejected);
                debug!(reason = err.as_label(), "submission rejected");
                Err(err)
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn read_public_state(&self) -> PublicSnapshot {
        let now = self.clock.now();
        self.lock().snapshot(now)
    }

    /// The live puzzle; `None` outside the cipher window.
    #[must_use]
    pub fn read_public_cipher(&self) -> Option<PublicCipher> {
        self.lock().public_cipher()
    }

    /// The previous cycle's answer sheet; `None` unless `user_id` has
    /// entered the current cycle.
    #[must_use]
    pub fn read_last_cycle_reveal(&self, user_id: &str) -> Option<RevealPayload> {
        self.lock().reveal_for(user_id)
    }

    /// Subscribes and returns the current snapshot, taken under the same
    /// lock so no event is missed or duplicated between the two.
    #[must_use]
    pub fn subscribe(&self) -> (PublicSnapshot, broadcast::Receiver<CycleEvent>) {
        let now = self.clock.now();
        let state = self.lock();
        let rx = self.bus.subscribe();
        (state.snapshot(now), rx)
    }

    fn lock(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
