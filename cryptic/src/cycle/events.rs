//! Outbound cycle events and their fan-out.
//!
//! Every state change is published as a [`CycleEvent`] on a
//! `tokio::sync::broadcast` channel. Sends never block: an observer that
//! falls behind loses the oldest events and is told how many it missed.

use cryptic_core::PublicCipher;
use serde::Serialize;
use tokio::sync::broadcast;

use super::snapshot::{Heartbeat, PublicSnapshot};
use crate::observability::EventLog;
use crate::phase::Status;

/// An event pushed to observers.
///
/// Serialized as `{"type": "STATUS", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum CycleEvent {
    /// Status changed
    Status { status: Status, cycle_id: u64 },

    /// The cipher window opened with this puzzle
    Cipher(PublicCipher),

    /// Countdown heartbeat
    Tick(Heartbeat),

    /// Someone submitted; carries no identity and no outcome
    SubmissionReceived { cycle_id: u64 },

    /// A cycle was archived
    Ended { cycle_id: u64 },

    /// Full public snapshot, always last in a batch
    State(PublicSnapshot),
}

impl CycleEvent {
    /// Wire name of the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "STATUS",
            Self::Cipher(_) => "CIPHER",
            Self::Tick(_) => "TICK",
            Self::SubmissionReceived { .. } => "SUBMISSION_RECEIVED",
            Self::Ended { .. } => "ENDED",
            Self::State(_) => "STATE",
        }
    }
}

/// Broadcast channel plus an optional JSONL log sink.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CycleEvent>,
    log: Option<EventLog>,
}

impl EventBus {
    /// Creates a bus holding up to `capacity` events per observer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, log: None }
    }

    /// Also queues every non-heartbeat event on `log`.
    #[must_use]
    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Publishes events in order. Neither the broadcast send nor the log
    /// enqueue blocks, so this is safe to call under the state lock.
    pub fn publish(&self, events: Vec<CycleEvent>) {
        for event in events {
            if let Some(log) = &self.log
                && !matches!(event, CycleEvent::Tick(_))
            {
                log.enqueue(&event);
            }
            // no receivers is not an error
            let _ = self.sender.send(event);
        }
    }

    /// New observer; receives events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CycleEvent> {
        self.sender.subscribe()
    }

    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
