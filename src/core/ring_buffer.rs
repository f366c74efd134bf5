//! Bounded most-recent-N view of admitted entries

use super::log_entry::LogEntry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Thread-safe FIFO that keeps at most `capacity` entries, evicting the oldest.
#[derive(Debug)]
pub struct RingBuffer {
    entries: Mutex<VecDeque<Arc<LogEntry>>>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an entry and trim to capacity. Returns how many entries were evicted.
    pub fn push(&self, entry: Arc<LogEntry>) -> usize {
        let mut entries = self.entries.lock();
        entries.push_back(entry);

        let mut evicted = 0;
        while entries.len() > self.capacity {
            entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Point-in-time copy in insertion order.
    pub fn snapshot(&self) -> Vec<Arc<LogEntry>> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
