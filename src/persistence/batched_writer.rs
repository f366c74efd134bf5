//! Background batch writer
//!
//! One thread owns the output file for the lifetime of the store. It waits
//! for queued entries or the flush interval, drains a batch, and appends it
//! through [`RollingFile`]. I/O failures are reported and the batch is
//! discarded; the thread only exits on cancellation, after a bounded final
//! drain.

use super::queue::{drain_into, PersistQueue};
use super::rolling_file::RollingFile;
use super::{PersistOutcome, Persistence};
use crate::core::diagnostics::Diagnostics;
use crate::core::error::StoreError;
use crate::core::log_entry::LogEntry;
use crate::core::metrics::PipelineMetrics;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Largest number of entries appended in one batch
pub const BATCH_CAP: usize = 1024;

/// Batches written after cancellation before the writer gives up on the rest
pub const MAX_FINAL_DRAINS: usize = 8;

/// Options for [`BatchedFileWriter`] that are not part of the rolling file
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub flush_interval: Duration,
    pub batch_cap: usize,
    pub max_final_drains: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(500),
            batch_cap: BATCH_CAP,
            max_final_drains: MAX_FINAL_DRAINS,
        }
    }
}

impl WriterOptions {
    #[must_use = "builder methods return a new value"]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_batch_cap(mut self, batch_cap: usize) -> Self {
        self.batch_cap = batch_cap.max(1);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_max_final_drains(mut self, max_final_drains: usize) -> Self {
        self.max_final_drains = max_final_drains;
        self
    }
}

/// Bounded queue plus the background thread that drains it
///
/// # Example
///
/// ```no_run
/// use diag_log_store::persistence::{
///     BatchedFileWriter, Persistence, PersistQueue, RollingFile, WriterOptions,
/// };
/// use diag_log_store::{LogEntry, LogKind, LogLevel, PipelineMetrics};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let file = RollingFile::new("logs/diagnostics.log", 10 * 1024 * 1024, 5).unwrap();
/// let writer = BatchedFileWriter::spawn(
///     PersistQueue::new(10_000, true),
///     file,
///     WriterOptions::default(),
///     Arc::new(PipelineMetrics::new()),
///     Default::default(),
/// );
///
/// writer.persist(Arc::new(LogEntry::new(LogLevel::Info, LogKind::App, "Startup")));
/// writer.shutdown(Duration::from_secs(5));
/// ```
pub struct BatchedFileWriter {
    queue: Arc<PersistQueue>,
    /// Dropping this sender is the cancellation signal
    cancel: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    diagnostics: Diagnostics,
}

impl BatchedFileWriter {
    /// Start the background writer thread for `queue`.
    pub fn spawn(
        queue: PersistQueue,
        file: RollingFile,
        options: WriterOptions,
        metrics: Arc<PipelineMetrics>,
        diagnostics: Diagnostics,
    ) -> Self {
        let queue = Arc::new(queue);
        let (cancel_tx, cancel_rx) = bounded::<()>(0);

        let worker = Worker {
            entries: queue.consumer(),
            cancel: cancel_rx,
            file,
            options,
            metrics,
            diagnostics: diagnostics.clone(),
        };

        let handle = thread::Builder::new()
            .name("log-store-writer".to_string())
            .spawn(move || worker.run());

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                diagnostics.error(&StoreError::io_operation(
                    "starting writer thread",
                    "Persistence disabled",
                    e,
                ));
                queue.close();
                None
            }
        };

        Self {
            queue,
            cancel: Mutex::new(Some(cancel_tx)),
            handle: Mutex::new(handle),
            diagnostics,
        }
    }

    pub fn queue(&self) -> &PersistQueue {
        &self.queue
    }

    /// Whether the background thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Persistence for BatchedFileWriter {
    fn persist(&self, entry: Arc<LogEntry>) -> PersistOutcome {
        self.queue.offer(entry)
    }

    fn shutdown(&self, timeout: Duration) -> bool {
        self.queue.close();
        drop(self.cancel.lock().take());

        let Some(handle) = self.handle.lock().take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if handle.join().is_err() {
                    self.diagnostics
                        .error(&StoreError::other("Writer thread panicked during shutdown"));
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                self.diagnostics.warn(&StoreError::other(format!(
                    "Writer thread did not finish within {:?}; pending entries may be lost",
                    timeout
                )));
                return false;
            }

            // Small sleep to avoid busy-waiting
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn backlog(&self) -> Option<(usize, usize)> {
        Some((self.queue.len(), self.queue.capacity()))
    }

    fn name(&self) -> &str {
        "batched-file"
    }
}

impl Drop for BatchedFileWriter {
    fn drop(&mut self) {
        self.shutdown(crate::core::store::DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

enum Wake {
    Cancelled,
    Entry(Arc<LogEntry>),
    Idle,
}

struct Worker {
    entries: Receiver<Arc<LogEntry>>,
    cancel: Receiver<()>,
    file: RollingFile,
    options: WriterOptions,
    metrics: Arc<PipelineMetrics>,
    diagnostics: Diagnostics,
}

impl Worker {
    fn run(mut self) {
        let mut batch = Vec::with_capacity(self.options.batch_cap);

        loop {
            match self.wait() {
                Wake::Cancelled => break,
                Wake::Entry(entry) => batch.push(entry),
                Wake::Idle => {}
            }

            drain_into(&self.entries, &mut batch, self.options.batch_cap);
            if batch.is_empty() {
                continue;
            }

            let ok = self.write(&batch);
            batch.clear();

            // Back off for one flush interval, unless cancelled meanwhile
            if !ok && self.cancelled_within(self.options.flush_interval) {
                break;
            }
        }

        self.final_drain(batch);
    }

    /// Wait for an entry, the flush interval, or cancellation
    fn wait(&self) -> Wake {
        select! {
            recv(self.cancel) -> _ => Wake::Cancelled,
            recv(self.entries) -> msg => match msg {
                Ok(entry) => Wake::Entry(entry),
                Err(_) => Wake::Cancelled,
            },
            default(self.options.flush_interval) => Wake::Idle,
        }
    }

    fn cancelled_within(&self, timeout: Duration) -> bool {
        select! {
            recv(self.cancel) -> _ => true,
            default(timeout) => false,
        }
    }

    /// Bounded drain after cancellation
    fn final_drain(&mut self, mut batch: Vec<Arc<LogEntry>>) {
        for _ in 0..self.options.max_final_drains {
            drain_into(&self.entries, &mut batch, self.options.batch_cap);
            if batch.is_empty() {
                return;
            }
            self.write(&batch);
            batch.clear();
        }

        let remaining = self.entries.len();
        if remaining > 0 {
            self.diagnostics.warn(&StoreError::other(format!(
                "Writer exiting with {} entries still queued",
                remaining
            )));
        }
    }

    fn write(&mut self, batch: &[Arc<LogEntry>]) -> bool {
        let rolls_before = self.file.rolls();
        let result = self.file.append_batch(batch);
        for _ in rolls_before..self.file.rolls() {
            self.metrics.record_roll();
        }

        match result {
            Ok(_) => {
                self.metrics.record_persisted(batch.len() as u64);
                true
            }
            Err(e) => {
                self.metrics.record_io_failure();
                self.diagnostics.error(&e);
                false
            }
        }
    }
}
