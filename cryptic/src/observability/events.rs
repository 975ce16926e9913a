//! JSONL event log.
//!
//! Cycle events written as newline-delimited JSON with a monotonically
//! increasing sequence number and a wall-clock stamp, for offline audit
//! of a season. Heartbeats are not logged.
//!
//! Publishers only stamp and enqueue; a dedicated blocking task owns the
//! writer, so disk latency never reaches the state lock.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cycle::CycleEvent;

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps a [`CycleEvent`] with a sequence number and log time.
#[derive(Debug, Serialize)]
pub struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// When the event was enqueued.
    logged_at: DateTime<Utc>,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: CycleEvent,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Buffered JSONL writer.
///
/// Each envelope is serialized as one line and flushed. Serialization or
/// I/O failures are dropped.
pub struct EventEmitter {
    writer: BufWriter<Box<dyn Write + Send>>,
}

// Box<dyn Write> is not Debug
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter appending to the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Writes one envelope as a single JSONL line.
    pub fn write(&mut self, envelope: &EventEnvelope) {
        if let Ok(line) = serde_json::to_string(envelope) {
            let _ = writeln!(self.writer, "{line}");
            let _ = self.writer.flush();
        }
    }
}

// ---------------------------------------------------------------------------
// Log handle
// ---------------------------------------------------------------------------

/// Non-blocking handle to a running event log.
///
/// Cloning shares the sequence counter. The writer task stops once every
/// clone has been dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct EventLog {
    sender: mpsc::UnboundedSender<EventEnvelope>,
    sequence: Arc<AtomicU64>,
}

impl EventLog {
    /// Moves `emitter` onto the blocking pool and returns the handle plus
    /// the writer task.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(mut emitter: EventEmitter) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<EventEnvelope>();
        let writer = tokio::task::spawn_blocking(move || {
            while let Some(envelope) = receiver.blocking_recv() {
                emitter.write(&envelope);
            }
        });
        let log = Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        };
        (log, writer)
    }

    /// Stamps `event` and queues it for the writer. Never blocks.
    pub fn enqueue(&self, event: &CycleEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence,
            logged_at: Utc::now(),
            event: event.clone(),
        };
        // writer gone means the process is shutting down
        let _ = self.sender.send(envelope);
    }

    /// Returns the number of events enqueued so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
