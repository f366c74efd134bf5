//! Persistence strategies
//!
//! The store hands every admitted entry to exactly one [`Persistence`]
//! implementation chosen at construction:
//!
//! - [`NoPersistence`]: entries live only in memory
//! - [`SyncFileWriter`]: append from the caller's thread
//! - [`BatchedFileWriter`]: bounded queue drained by a background thread

pub mod batched_writer;
pub mod queue;
pub mod record;
pub mod rolling_file;
pub mod sync_writer;

pub use batched_writer::{BatchedFileWriter, WriterOptions, BATCH_CAP, MAX_FINAL_DRAINS};
pub use queue::{PersistQueue, MAX_EVICTION_ATTEMPTS};
pub use record::{format_record, parse_record, read_records};
pub use rolling_file::RollingFile;
pub use sync_writer::SyncFileWriter;

use crate::core::log_entry::LogEntry;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What happened to an entry handed to a [`Persistence`] strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Persistence is turned off
    Disabled,
    /// Queued or written
    Accepted,
    /// Queued after discarding `evicted` older pending entries
    AcceptedAfterEviction { evicted: usize },
    /// Not retained: queue full for a low-severity entry, or writer stopped
    Dropped,
    /// Severe entry lost after every evict-and-retry attempt
    RetriesExhausted,
    /// Synchronous write failed
    Failed,
}

impl PersistOutcome {
    pub fn is_retained(&self) -> bool {
        matches!(
            self,
            PersistOutcome::Accepted | PersistOutcome::AcceptedAfterEviction { .. }
        )
    }
}

impl fmt::Display for PersistOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistOutcome::Disabled => write!(f, "Disabled"),
            PersistOutcome::Accepted => write!(f, "Accepted"),
            PersistOutcome::AcceptedAfterEviction { evicted } => {
                write!(f, "AcceptedAfterEviction({})", evicted)
            }
            PersistOutcome::Dropped => write!(f, "Dropped"),
            PersistOutcome::RetriesExhausted => write!(f, "RetriesExhausted"),
            PersistOutcome::Failed => write!(f, "Failed"),
        }
    }
}

/// Durable retention strategy behind the store
///
/// `persist` is called from producer threads and must not block beyond a
/// bounded amount of work (the synchronous strategy blocks on disk I/O by
/// definition).
pub trait Persistence: Send + Sync {
    fn persist(&self, entry: Arc<LogEntry>) -> PersistOutcome;

    /// Stop accepting entries and finish pending work within `timeout`.
    /// Returns `false` if the work did not complete in time.
    fn shutdown(&self, timeout: Duration) -> bool;

    /// Pending and maximum queued entries, for strategies that queue
    fn backlog(&self) -> Option<(usize, usize)> {
        None
    }

    fn name(&self) -> &str;
}

/// In-memory only
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPersistence;

impl Persistence for NoPersistence {
    fn persist(&self, _entry: Arc<LogEntry>) -> PersistOutcome {
        PersistOutcome::Disabled
    }

    fn shutdown(&self, _timeout: Duration) -> bool {
        true
    }

    fn name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogKind, LogLevel};

    #[test]
    fn test_no_persistence() {
        let strategy = NoPersistence;
        let entry = Arc::new(LogEntry::new(LogLevel::Error, LogKind::App, "x"));
        assert_eq!(strategy.persist(entry), PersistOutcome::Disabled);
        assert!(strategy.shutdown(Duration::ZERO));
        assert_eq!(strategy.backlog(), None);
        assert_eq!(strategy.name(), "none");
    }

    #[test]
    fn test_outcome_retention() {
        assert!(PersistOutcome::Accepted.is_retained());
        assert!(PersistOutcome::AcceptedAfterEviction { evicted: 1 }.is_retained());
        assert!(!PersistOutcome::Dropped.is_retained());
        assert!(!PersistOutcome::RetriesExhausted.is_retained());
        assert_eq!(
            PersistOutcome::AcceptedAfterEviction { evicted: 2 }.to_string(),
            "AcceptedAfterEviction(2)"
        );
    }
}
