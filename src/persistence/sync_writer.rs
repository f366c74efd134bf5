//! Synchronous append strategy
//!
//! Each entry is written from the producer's thread while holding the file
//! lock. Simpler than the batched writer and loses nothing on shutdown, at the
//! cost of putting disk latency on the logging call.

use super::rolling_file::RollingFile;
use super::{PersistOutcome, Persistence};
use crate::core::diagnostics::Diagnostics;
use crate::core::log_entry::LogEntry;
use crate::core::metrics::PipelineMetrics;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct SyncFileWriter {
    file: Mutex<RollingFile>,
    stopped: AtomicBool,
    metrics: Arc<PipelineMetrics>,
    diagnostics: Diagnostics,
}

impl SyncFileWriter {
    pub fn new(file: RollingFile, metrics: Arc<PipelineMetrics>, diagnostics: Diagnostics) -> Self {
        Self {
            file: Mutex::new(file),
            stopped: AtomicBool::new(false),
            metrics,
            diagnostics,
        }
    }
}

impl Persistence for SyncFileWriter {
    fn persist(&self, entry: Arc<LogEntry>) -> PersistOutcome {
        if self.stopped.load(Ordering::Acquire) {
            return PersistOutcome::Dropped;
        }

        let mut file = self.file.lock();
        let rolls_before = file.rolls();
        let result = file.append_batch(std::slice::from_ref(&entry));
        for _ in rolls_before..file.rolls() {
            self.metrics.record_roll();
        }
        drop(file);

        match result {
            Ok(_) => {
                self.metrics.record_persisted(1);
                PersistOutcome::Accepted
            }
            Err(e) => {
                self.metrics.record_io_failure();
                self.diagnostics.error(&e);
                PersistOutcome::Failed
            }
        }
    }

    fn shutdown(&self, _timeout: Duration) -> bool {
        self.stopped.store(true, Ordering::Release);
        // Wait out an append in progress
        drop(self.file.lock());
        true
    }

    fn name(&self) -> &str {
        "sync-file"
    }
}
