//! `cryptic` - weekly symbol-cipher puzzle competition
//!
//! A single authoritative cycle (countdown, cipher window, rollover) driven
//! by a clock-injected scheduler, with a thin HTTP/SSE surface for players,
//! observers and the operator. The cipher engine itself lives in
//! `cryptic-core`.

pub mod cli;
pub mod config;
pub mod cycle;
pub mod error;
pub mod observability;
pub mod phase;
pub mod transport;
