//! Bounded persistence queue with severity-aware admission
//!
//! When the queue is full, low-severity entries are dropped. Warnings and
//! above (if bypass is enabled) evict the oldest pending entry and retry a
//! bounded number of times, so they are preferentially retained under
//! sustained overload.

use crate::core::log_entry::LogEntry;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::PersistOutcome;

/// Evict-and-retry rounds for a severe entry before the final attempt
pub const MAX_EVICTION_ATTEMPTS: usize = 4;

/// Multi-producer, single-consumer bounded queue
///
/// The producer side keeps its own clone of the receiver. That is what makes
/// discard-oldest possible on a channel: a producer pops the head to make
/// room for a severe entry.
///
/// # Example
///
/// ```
/// use diag_log_store::persistence::{PersistOutcome, PersistQueue};
/// use diag_log_store::{LogEntry, LogKind, LogLevel};
/// use std::sync::Arc;
///
/// let queue = PersistQueue::new(1, true);
/// let debug = || Arc::new(LogEntry::new(LogLevel::Debug, LogKind::App, "q"));
///
/// assert_eq!(queue.offer(debug()), PersistOutcome::Accepted);
/// assert_eq!(queue.offer(debug()), PersistOutcome::Dropped);
///
/// let error = Arc::new(LogEntry::new(LogLevel::Error, LogKind::App, "q"));
/// assert_eq!(queue.offer(error), PersistOutcome::AcceptedAfterEviction { evicted: 1 });
/// ```
#[derive(Debug)]
pub struct PersistQueue {
    sender: Sender<Arc<LogEntry>>,
    receiver: Receiver<Arc<LogEntry>>,
    capacity: usize,
    bypass_severe: bool,
    closed: AtomicBool,
}

impl PersistQueue {
    pub fn new(capacity: usize, bypass_severe: bool) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            bypass_severe,
            closed: AtomicBool::new(false),
        }
    }

    /// Non-blocking admission of one entry.
    pub fn offer(&self, entry: Arc<LogEntry>) -> PersistOutcome {
        if self.is_closed() {
            return PersistOutcome::Dropped;
        }

        let mut entry = match self.sender.try_send(entry) {
            Ok(()) => return PersistOutcome::Accepted,
            Err(TrySendError::Full(entry)) => entry,
            Err(TrySendError::Disconnected(_)) => return PersistOutcome::Dropped,
        };

        if !(self.bypass_severe && entry.level().is_severe()) {
            return PersistOutcome::Dropped;
        }

        let mut evicted = 0;
        for _ in 0..MAX_EVICTION_ATTEMPTS {
            if self.receiver.try_recv().is_ok() {
                evicted += 1;
            }
            match self.sender.try_send(entry) {
                Ok(()) => return PersistOutcome::AcceptedAfterEviction { evicted },
                Err(TrySendError::Full(returned)) => entry = returned,
                Err(TrySendError::Disconnected(_)) => return PersistOutcome::Dropped,
            }
        }

        match self.sender.try_send(entry) {
            Ok(()) => PersistOutcome::AcceptedAfterEviction { evicted },
            Err(_) => PersistOutcome::RetriesExhausted,
        }
    }

    /// Consumer handle for the background writer
    pub(crate) fn consumer(&self) -> Receiver<Arc<LogEntry>> {
        self.receiver.clone()
    }

    /// Move up to `max` pending entries into `batch`, oldest first.
    pub fn drain_into(&self, batch: &mut Vec<Arc<LogEntry>>, max: usize) -> usize {
        drain_into(&self.receiver, batch, max)
    }

    /// Reject all further offers. Pending entries stay drainable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bypass_severe(&self) -> bool {
        self.bypass_severe
    }
}

pub(crate) fn drain_into(
    receiver: &Receiver<Arc<LogEntry>>,
    batch: &mut Vec<Arc<LogEntry>>,
    max: usize,
) -> usize {
    let mut drained = 0;
    while batch.len() < max {
        match receiver.try_recv() {
            Ok(entry) => {
                batch.push(entry);
                drained += 1;
            }
            Err(_) => break,
        }
    }
    drained
}
