//! Read-only views of the cycle state.
//!
//! These are the only shapes the outside world sees. None of them has a
//! field that could hold a legend, a reveal sheet or an answer except
//! [`RevealPayload`], which only ever carries a finished cycle.

use cryptic_core::CipherBundle;
use serde::Serialize;

use super::ledger::WinnerView;
use crate::phase::Status;

/// Current competition state as broadcast to observers.
///
/// Instants are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSnapshot {
    pub status: Status,
    /// Countdown target while RUNNING
    pub end_at: Option<i64>,
    /// Total countdown length while RUNNING
    pub duration_ms: i64,
    /// Window close while CIPHER
    pub cipher_until: Option<i64>,
    /// Configured window length
    pub cipher_seconds: i64,
    pub cycle_id: u64,
    /// A puzzle is staged for the current cycle
    pub has_prepared_cipher: bool,
    pub last: LastCycleSummary,
    pub server_now: i64,
    pub version: u64,
}

/// The previous cycle, as much as anyone may know about it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCycleSummary {
    pub cycle_id: Option<u64>,
    pub winner: Option<WinnerView>,
    pub has_reveal: bool,
}

/// Per-tick heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub server_now: i64,
    /// Time to the next phase boundary, never negative
    pub ms_left: i64,
    pub cycle_id: u64,
    pub status: Status,
    pub version: u64,
}

/// Answer sheet of the previous cycle, for the current cycle's entrants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealPayload {
    pub last_cycle_id: u64,
    pub last_winner: Option<WinnerView>,
    pub last_cipher: Option<CipherBundle>,
}
