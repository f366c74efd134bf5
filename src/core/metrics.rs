//! Pipeline metrics for observability
//!
//! Every drop, eviction and failure path in the store is absorbed silently
//! from the producer's point of view. These counters are where those
//! outcomes become visible.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the store's admission, retention and persistence paths
///
/// # Example
///
/// ```
/// use diag_log_store::PipelineMetrics;
///
/// let metrics = PipelineMetrics::new();
///
/// metrics.record_admitted();
/// metrics.record_admission_dropped();
///
/// assert_eq!(metrics.admitted(), 1);
/// assert_eq!(metrics.admission_dropped(), 1);
/// ```
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Entries accepted by the rate limiter and recorded in the ring buffer
    admitted: AtomicU64,

    /// Entries rejected by the rate limiter
    admission_dropped: AtomicU64,

    /// Oldest ring-buffer entries discarded to respect capacity
    capacity_evicted: AtomicU64,

    /// Failed deliveries to individual subscribers
    subscriber_failures: AtomicU64,

    /// Entries accepted into the persistence path
    persist_enqueued: AtomicU64,

    /// Low-severity entries dropped because the persistence queue was full
    queue_full_dropped: AtomicU64,

    /// Severe entries that triggered evict-and-retry
    queue_full_retried: AtomicU64,

    /// Severe entries lost after every retry failed
    retries_exhausted: AtomicU64,

    /// Entries appended to the output file
    persisted: AtomicU64,

    /// Failed appends or rolls
    io_failures: AtomicU64,

    /// Completed file rolls
    rolls: AtomicU64,
}

impl PipelineMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            admitted: AtomicU64::new(0),
            admission_dropped: AtomicU64::new(0),
            capacity_evicted: AtomicU64::new(0),
            subscriber_failures: AtomicU64::new(0),
            persist_enqueued: AtomicU64::new(0),
            queue_full_dropped: AtomicU64::new(0),
            queue_full_retried: AtomicU64::new(0),
            retries_exhausted: AtomicU64::new(0),
            persisted: AtomicU64::new(0),
            io_failures: AtomicU64::new(0),
            rolls: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn admission_dropped(&self) -> u64 {
        self.admission_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn capacity_evicted(&self) -> u64 {
        self.capacity_evicted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn subscriber_failures(&self) -> u64 {
        self.subscriber_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn persist_enqueued(&self) -> u64 {
        self.persist_enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_dropped(&self) -> u64 {
        self.queue_full_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_retried(&self) -> u64 {
        self.queue_full_retried.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retries_exhausted(&self) -> u64 {
        self.retries_exhausted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn persisted(&self) -> u64 {
        self.persisted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn io_failures(&self) -> u64 {
        self.io_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rolls(&self) -> u64 {
        self.rolls.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_admitted(&self) -> u64 {
        self.admitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_admission_dropped(&self) -> u64 {
        self.admission_dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_capacity_evicted(&self, count: u64) -> u64 {
        self.capacity_evicted.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_subscriber_failures(&self, count: u64) -> u64 {
        self.subscriber_failures.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_persist_enqueued(&self) -> u64 {
        self.persist_enqueued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full_dropped(&self) -> u64 {
        self.queue_full_dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full_retried(&self) -> u64 {
        self.queue_full_retried.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the previous count, used to throttle diagnostics
    #[inline]
    pub fn record_retries_exhausted(&self) -> u64 {
        self.retries_exhausted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_persisted(&self, count: u64) -> u64 {
        self.persisted.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_io_failure(&self) -> u64 {
        self.io_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_roll(&self) -> u64 {
        self.rolls.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of entries rejected by the durable path, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has reached the persistence path yet.
    pub fn persist_drop_rate(&self) -> f64 {
        let dropped = (self.queue_full_dropped() + self.retries_exhausted()) as f64;
        let total = self.persist_enqueued() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.admitted.store(0, Ordering::Relaxed);
        self.admission_dropped.store(0, Ordering::Relaxed);
        self.capacity_evicted.store(0, Ordering::Relaxed);
        self.subscriber_failures.store(0, Ordering::Relaxed);
        self.persist_enqueued.store(0, Ordering::Relaxed);
        self.queue_full_dropped.store(0, Ordering::Relaxed);
        self.queue_full_retried.store(0, Ordering::Relaxed);
        self.retries_exhausted.store(0, Ordering::Relaxed);
        self.persisted.store(0, Ordering::Relaxed);
        self.io_failures.store(0, Ordering::Relaxed);
        self.rolls.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipelineMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            admitted: AtomicU64::new(self.admitted()),
            admission_dropped: AtomicU64::new(self.admission_dropped()),
            capacity_evicted: AtomicU64::new(self.capacity_evicted()),
            subscriber_failures: AtomicU64::new(self.subscriber_failures()),
            persist_enqueued: AtomicU64::new(self.persist_enqueued()),
            queue_full_dropped: AtomicU64::new(self.queue_full_dropped()),
            queue_full_retried: AtomicU64::new(self.queue_full_retried()),
            retries_exhausted: AtomicU64::new(self.retries_exhausted()),
            persisted: AtomicU64::new(self.persisted()),
            io_failures: AtomicU64::new(self.io_failures()),
            rolls: AtomicU64::new(self.rolls()),
        }
    }
}
