//! Observability
//!
//! Logging, metrics, and the JSONL event log for monitoring a running
//! competition.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EventEmitter, EventLog};
pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
