//! Weekly phase scheduling.
//!
//! [`schedule`] is pure date arithmetic, [`clock`] abstracts "now" and
//! [`scheduler`] drives the cycle state from a periodic tick.

pub mod clock;
pub mod schedule;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use schedule::{Anchors, Schedule, Status, WEEK, WeeklyAnchor};
pub use scheduler::{FallbackPuzzle, GenerateRequest, PhaseScheduler, SubmissionAck};
