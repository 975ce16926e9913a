//! Per-cycle competition state.
//!
//! - [`state`] is the aggregate mutated by the scheduler
//! - [`ledger`] holds one-shot submissions and the winner
//! - [`rollover`] archives a finished cycle exactly once
//! - [`snapshot`] and [`events`] are the read-only outbound shapes

pub mod events;
pub mod ledger;
pub mod rollover;
pub mod snapshot;
pub mod state;

pub use events::{CycleEvent, EventBus};
pub use ledger::{Player, Receipt, SubmissionLedger, WinnerView};
pub use rollover::{LastCycleSnapshot, RolloverLedger};
pub use snapshot::{Heartbeat, LastCycleSummary, PublicSnapshot, RevealPayload};
pub use state::{CycleState, StagedPuzzle};
