//! Store facade
//!
//! [`LogStore`] composes the admission controller, ring buffer, broadcaster
//! and persistence strategy behind one contract. Producers call [`LogStore::add`];
//! UI and streaming endpoints call [`LogStore::get_all`] and
//! [`LogStore::subscribe`].

use super::{
    admission::RateLimiter,
    broadcaster::{Broadcaster, Subscription, SubscriptionId},
    config::{PersistenceMode, StoreConfig},
    diagnostics::{DiagnosticCallback, Diagnostics},
    error::{Result, StoreError},
    log_entry::LogEntry,
    metrics::PipelineMetrics,
    ring_buffer::RingBuffer,
};
use crate::persistence::{
    BatchedFileWriter, NoPersistence, PersistOutcome, PersistQueue, Persistence, RollingFile,
    SyncFileWriter, WriterOptions,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default shutdown timeout for store cleanup (5 seconds)
///
/// Used when the store is dropped without an explicit [`LogStore::shutdown`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory diagnostic log store with optional durable persistence
///
/// `LogStore` is `Send + Sync`; share it as `Arc<LogStore>` between producers
/// and readers. No call on it blocks on another caller except the short
/// critical sections inside the ring buffer and broadcaster (and disk I/O in
/// [`PersistenceMode::Synchronous`]).
///
/// # Example
///
/// ```
/// use diag_log_store::{LogEntry, LogKind, LogLevel, LogStore, StoreConfig};
///
/// let store = LogStore::new(StoreConfig::default().with_capacity(100)).unwrap();
/// let live = store.subscribe();
///
/// store.add(
///     LogEntry::new(LogLevel::Info, LogKind::Http, "Api.Orders")
///         .with_event_id(7)
///         .with_message("GET /orders 200"),
/// );
///
/// assert_eq!(store.count(), 1);
/// assert_eq!(live.try_recv().unwrap().event_id(), 7);
/// ```
pub struct LogStore {
    config: StoreConfig,
    limiter: RateLimiter,
    ring: RingBuffer,
    broadcaster: Broadcaster,
    persistence: Box<dyn Persistence>,
    persisting: bool,
    shut_down: AtomicBool,
    metrics: Arc<PipelineMetrics>,
    diagnostics: Diagnostics,
}

impl LogStore {
    /// Validate `config` and build the store, starting the background writer
    /// when batched persistence is configured.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the output directory
    /// cannot be created
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> LogStoreBuilder {
        LogStoreBuilder::new()
    }

    /// Record an entry.
    ///
    /// Never fails and never blocks on another producer: rate limiting,
    /// eviction, subscriber failures and persistence backpressure are all
    /// absorbed here and show up only in [`LogStore::metrics`].
    pub fn add(&self, entry: LogEntry) {
        self.add_shared(Arc::new(entry));
    }

    /// Same as [`LogStore::add`] for an entry that is already shared.
    pub fn add_shared(&self, entry: Arc<LogEntry>) {
        if self.limiter.should_drop(entry.level()) {
            self.metrics.record_admission_dropped();
            return;
        }

        self.metrics.record_admitted();
        let evicted = self.ring.push(Arc::clone(&entry));
        if evicted > 0 {
            self.metrics.record_capacity_evicted(evicted as u64);
        }

        let failures = self.broadcaster.publish(&entry);
        if failures > 0 {
            self.metrics.record_subscriber_failures(failures as u64);
        }

        if self.persisting && !self.shut_down.load(Ordering::Acquire) {
            let outcome = self.persistence.persist(entry);
            self.record_persist_outcome(outcome);
        }
    }

    fn record_persist_outcome(&self, outcome: PersistOutcome) {
        match outcome {
            PersistOutcome::Disabled | PersistOutcome::Failed => {}
            PersistOutcome::Accepted => {
                self.metrics.record_persist_enqueued();
            }
            PersistOutcome::AcceptedAfterEviction { .. } => {
                self.metrics.record_persist_enqueued();
                self.metrics.record_queue_full_retried();
            }
            PersistOutcome::Dropped => {
                self.metrics.record_queue_full_dropped();
            }
            PersistOutcome::RetriesExhausted => {
                self.metrics.record_queue_full_retried();
                let exhausted = self.metrics.record_retries_exhausted();

                // Alert on first loss and periodically thereafter
                if exhausted == 0 || (exhausted + 1) % 1000 == 0 {
                    let report = match self.persistence.backlog() {
                        Some((current, max)) => StoreError::queue_full(current, max),
                        None => StoreError::other(format!(
                            "Severe entry lost by '{}' persistence after eviction retries ({} so far)",
                            self.persistence.name(),
                            exhausted + 1
                        )),
                    };
                    self.diagnostics.warn(&report);
                }
            }
        }
    }

    /// Discard every entry in the ring buffer. Files already written are untouched.
    pub fn clear(&self) {
        self.ring.clear();
    }

    /// Point-in-time copy of the ring buffer, oldest first
    pub fn get_all(&self) -> Vec<Arc<LogEntry>> {
        self.ring.snapshot()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Number of entries currently in the ring buffer
    pub fn count(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Open a live-tail subscription. Only entries added after this call are delivered.
    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe()
    }

    /// Close a subscription; its reader terminates once drained.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.broadcaster.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    /// Get the pipeline metrics
    ///
    /// # Example
    ///
    /// ```
    /// use diag_log_store::{LogEntry, LogKind, LogLevel, LogStore, StoreConfig};
    ///
    /// let store = LogStore::new(StoreConfig::default().with_capacity(50)).unwrap();
    /// for _ in 0..60 {
    ///     store.add(LogEntry::new(LogLevel::Debug, LogKind::App, "Worker"));
    /// }
    ///
    /// let metrics = store.metrics();
    /// assert_eq!(metrics.admitted(), 60);
    /// assert_eq!(metrics.capacity_evicted(), 10);
    /// ```
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Name of the active persistence strategy
    pub fn persistence_name(&self) -> &str {
        self.persistence.name()
    }

    /// Stop persistence and wait up to `timeout` for pending entries to be written.
    ///
    /// The ring buffer and subscribers keep working afterwards; only the
    /// durable path is closed. Calling it again is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if the persistence strategy finished within `timeout`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use diag_log_store::{LogStore, StoreConfig};
    /// use std::time::Duration;
    ///
    /// let store = LogStore::new(StoreConfig::default().with_file("logs/diagnostics.log")).unwrap();
    ///
    /// if !store.shutdown(Duration::from_secs(10)) {
    ///     eprintln!("Warning: pending diagnostics may be lost");
    /// }
    /// ```
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.shut_down.store(true, Ordering::Release);
        self.persistence.shutdown(timeout)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        let lost = self.metrics.queue_full_dropped() + self.metrics.retries_exhausted();
        if lost > 0 {
            self.diagnostics.warn(&StoreError::other(format!(
                "Store shutting down with {} entries never persisted (drop rate: {:.2}%)",
                lost,
                self.metrics.persist_drop_rate()
            )));
        }
    }
}

impl fmt::Debug for LogStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStore")
            .field("capacity", &self.ring.capacity())
            .field("count", &self.ring.len())
            .field("limiter", &self.limiter)
            .field("subscribers", &self.broadcaster.subscriber_count())
            .field("persistence", &self.persistence.name())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Builder for constructing a [`LogStore`] with a fluent API
///
/// # Example
/// ```
/// use diag_log_store::prelude::*;
/// use std::sync::Arc;
///
/// let store = LogStore::builder()
///     .config(StoreConfig::default().with_rate_limit(500))
///     .on_diagnostic(Arc::new(|err| {
///         eprintln!("ALERT: {}", err);
///     }))
///     .build()
///     .unwrap();
///
/// assert_eq!(store.persistence_name(), "none");
/// ```
pub struct LogStoreBuilder {
    config: StoreConfig,
    persistence: Option<Box<dyn Persistence>>,
    on_diagnostic: Option<DiagnosticCallback>,
}

impl LogStoreBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            persistence: None,
            on_diagnostic: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom persistence strategy instead of the one the configuration selects.
    #[must_use = "builder methods return a new value"]
    pub fn persistence(mut self, persistence: Box<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Receive pipeline failures (I/O errors, lost severe entries) in
    /// addition to the stderr report.
    #[must_use = "builder methods return a new value"]
    pub fn on_diagnostic(mut self, callback: DiagnosticCallback) -> Self {
        self.on_diagnostic = Some(callback);
        self
    }

    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the output directory
    /// cannot be created
    pub fn build(self) -> Result<LogStore> {
        let config = self.config;
        config.validate()?;

        let metrics = Arc::new(PipelineMetrics::new());
        let diagnostics = Diagnostics::new(self.on_diagnostic);

        let (persistence, persisting): (Box<dyn Persistence>, bool) = match self.persistence {
            Some(custom) => (custom, true),
            None if config.persist_to_file => (
                file_persistence(&config, Arc::clone(&metrics), diagnostics.clone())?,
                true,
            ),
            None => (Box::new(NoPersistence), false),
        };

        Ok(LogStore {
            limiter: RateLimiter::new(
                config.max_writes_per_second,
                config.always_allow_warnings_and_errors,
            ),
            ring: RingBuffer::new(config.capacity),
            broadcaster: Broadcaster::new(config.subscriber_queue),
            persistence,
            persisting,
            shut_down: AtomicBool::new(false),
            metrics,
            diagnostics,
            config,
        })
    }
}

impl Default for LogStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn file_persistence(
    config: &StoreConfig,
    metrics: Arc<PipelineMetrics>,
    diagnostics: Diagnostics,
) -> Result<Box<dyn Persistence>> {
    let path = config
        .file_path
        .as_ref()
        .ok_or_else(|| StoreError::config("FilePath", "required when PersistToFile is enabled"))?;
    let file = RollingFile::new(path, config.max_file_bytes, config.max_rolls)?;

    Ok(match config.persistence_mode {
        PersistenceMode::Batched => Box::new(BatchedFileWriter::spawn(
            PersistQueue::new(config.max_queue, config.always_allow_warnings_and_errors),
            file,
            WriterOptions::default().with_flush_interval(config.flush_interval()),
            metrics,
            diagnostics,
        )),
        PersistenceMode::Synchronous => Box::new(SyncFileWriter::new(file, metrics, diagnostics)),
    })
}
