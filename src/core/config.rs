//! Store configuration
//!
//! Keys use the same PascalCase names as the host application's settings
//! section, so a JSON fragment can be handed over as-is:
//!
//! ```
//! use diag_log_store::StoreConfig;
//!
//! let config = StoreConfig::from_json_str(r#"{
//!     "Capacity": 200,
//!     "MaxWritesPerSecond": 50,
//!     "PersistToFile": true,
//!     "FilePath": "logs/diagnostics.log"
//! }"#).unwrap();
//!
//! assert_eq!(config.capacity, 200);
//! assert!(config.always_allow_warnings_and_errors);
//! ```

use super::broadcaster::SubscriberQueue;
use super::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const MIN_CAPACITY: usize = 50;
pub const MIN_FILE_BYTES: u64 = 50_000;
pub const MIN_ROLLS: usize = 1;
pub const MIN_QUEUE: usize = 100;
pub const MIN_FLUSH_INTERVAL_MS: u64 = 50;

/// How persisted entries reach the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PersistenceMode {
    /// Bounded queue drained by a background writer thread
    #[default]
    Batched,

    /// Append from the producer's thread under a lock
    Synchronous,
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceMode::Batched => write!(f, "Batched"),
            PersistenceMode::Synchronous => write!(f, "Synchronous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StoreConfig {
    /// Ring buffer size
    pub capacity: usize,
    /// Admission budget per second; 0 disables the rate limiter
    pub max_writes_per_second: u32,
    /// Warnings and above skip the rate limiter and the persistence drop policy
    pub always_allow_warnings_and_errors: bool,
    pub persist_to_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Size above which the output file is rolled
    pub max_file_bytes: u64,
    /// Number of rolled files kept (`path.1` .. `path.N`)
    pub max_rolls: usize,
    /// Persistence queue bound
    pub max_queue: usize,
    pub flush_interval_ms: u64,
    pub persistence_mode: PersistenceMode,
    pub subscriber_queue: SubscriberQueue,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            max_writes_per_second: 0,
            always_allow_warnings_and_errors: true,
            persist_to_file: false,
            file_path: None,
            max_file_bytes: 10 * 1024 * 1024,
            max_rolls: 5,
            max_queue: 10_000,
            flush_interval_ms: 500,
            persistence_mode: PersistenceMode::default(),
            subscriber_queue: SubscriberQueue::default(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON settings object and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every bound, failing on the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.capacity < MIN_CAPACITY {
            return Err(StoreError::config(
                "Capacity",
                format!("must be at least {}, got {}", MIN_CAPACITY, self.capacity),
            ));
        }
        if self.max_file_bytes < MIN_FILE_BYTES {
            return Err(StoreError::config(
                "MaxFileBytes",
                format!("must be at least {}, got {}", MIN_FILE_BYTES, self.max_file_bytes),
            ));
        }
        if self.max_rolls < MIN_ROLLS {
            return Err(StoreError::config(
                "MaxRolls",
                format!("must be at least {}, got {}", MIN_ROLLS, self.max_rolls),
            ));
        }
        if self.max_queue < MIN_QUEUE {
            return Err(StoreError::config(
                "MaxQueue",
                format!("must be at least {}, got {}", MIN_QUEUE, self.max_queue),
            ));
        }
        if self.flush_interval_ms < MIN_FLUSH_INTERVAL_MS {
            return Err(StoreError::config(
                "FlushIntervalMs",
                format!(
                    "must be at least {}, got {}",
                    MIN_FLUSH_INTERVAL_MS, self.flush_interval_ms
                ),
            ));
        }
        if self.persist_to_file {
            match self.file_path {
                None => {
                    return Err(StoreError::config(
                        "FilePath",
                        "required when PersistToFile is enabled",
                    ))
                }
                Some(ref path) if path.as_os_str().is_empty() => {
                    return Err(StoreError::config("FilePath", "must not be empty"))
                }
                Some(_) => {}
            }
        }
        if let SubscriberQueue::Bounded { capacity: 0 } = self.subscriber_queue {
            return Err(StoreError::config(
                "SubscriberQueue",
                "bounded capacity must be at least 1",
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_rate_limit(mut self, max_writes_per_second: u32) -> Self {
        self.max_writes_per_second = max_writes_per_second;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_severity_bypass(mut self, enabled: bool) -> Self {
        self.always_allow_warnings_and_errors = enabled;
        self
    }

    /// Enable persistence to `path`.
    #[must_use = "builder methods return a new value"]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_to_file = true;
        self.file_path = Some(path.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_rolling(mut self, max_file_bytes: u64, max_rolls: usize) -> Self {
        self.max_file_bytes = max_file_bytes;
        self.max_rolls = max_rolls;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_flush_interval_ms(mut self, flush_interval_ms: u64) -> Self {
        self.flush_interval_ms = flush_interval_ms;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_persistence_mode(mut self, mode: PersistenceMode) -> Self {
        self.persistence_mode = mode;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_subscriber_queue(mut self, queue: SubscriberQueue) -> Self {
        self.subscriber_queue = queue;
        self
    }
}
