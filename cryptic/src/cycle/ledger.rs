//! One-shot answer submissions and winner selection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cryptic_core::cipher::canonical_answer;
use serde::Serialize;

use crate::error::StateInvariantError;

/// Identity of a player, supplied by the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable account id
    pub user_id: String,
    /// Display name
    pub username: String,
}

impl Player {
    #[must_use]
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}

/// A stored attempt. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub player: Player,
    /// Canonical form of what the player typed
    pub answer: String,
    pub at: DateTime<Utc>,
}

/// The first correct submitter of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub player: Player,
    pub at: DateTime<Utc>,
}

impl Winner {
    /// Public form: display name and epoch milliseconds only.
    #[must_use]
    pub fn view(&self) -> WinnerView {
        WinnerView {
            un: self.player.username.clone(),
            ts: self.at.timestamp_millis(),
        }
    }
}

/// Winner as shown to players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinnerView {
    pub un: String,
    pub ts: i64,
}

/// What happened to a submission. Never shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    /// Stored; `winner` is true when it set the cycle's winner
    Recorded { winner: bool },
    /// The player already submitted this cycle; nothing changed
    Duplicate,
}

/// Submissions for a single cycle.
#[derive(Debug, Clone)]
pub struct SubmissionLedger {
    cycle_id: u64,
    entries: HashMap<String, Submission>,
    winner: Option<Winner>,
}

impl SubmissionLedger {
    /// Empty ledger for `cycle_id`.
    #[must_use]
    pub fn new(cycle_id: u64) -> Self {
        Self {
            cycle_id,
            entries: HashMap::new(),
            winner: None,
        }
    }

    #[must_use]
    pub const fn cycle_id(&self) -> u64 {
        self.cycle_id
    }

    #[must_use]
    pub const fn winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The stored attempt for `user_id`, if any.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&Submission> {
        self.entries.get(user_id)
    }

    /// Records a player's only attempt for this cycle.
    ///
    /// Both sides are compared in canonical form. An empty `expected`
    /// answer never produces a winner.
    pub fn record(
        &mut self,
        player: &Player,
        raw_answer: &str,
        expected: &str,
        now: DateTime<Utc>,
    ) -> Receipt {
        if self.entries.contains_key(&player.user_id) {
            return Receipt::Duplicate;
        }

        let answer = canonical_answer(raw_answer);
        let correct = !expected.is_empty() && answer == canonical_answer(expected);
        self.entries.insert(
            player.user_id.clone(),
            Submission {
                player: player.clone(),
                answer,
                at: now,
            },
        );

        let winner = correct
            && match self.set_winner(player, now) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(
                        cycle_id = self.cycle_id,
                        user_id = %player.user_id,
                        error = %err,
                        "second winner write ignored"
                    );
                    false
                }
            };
        Receipt::Recorded { winner }
    }

    fn set_winner(&mut self, player: &Player, at: DateTime<Utc>) -> Result<(), StateInvariantError> {
        if self.winner.is_some() {
            return Err(StateInvariantError::WinnerAlreadySet {
                cycle_id: self.cycle_id,
            });
        }
        self.winner = Some(Winner {
            player: player.clone(),
            at,
        });
        tracing::info!(cycle_id = self.cycle_id, "winner recorded");
        Ok(())
    }
}
