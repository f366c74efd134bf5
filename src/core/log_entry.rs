//! Log entry structure
//!
//! A [`LogEntry`] is built once by a producer (usually an adapter) and is
//! never modified after it enters the store. The store shares entries as
//! `Arc<LogEntry>` between the ring buffer, subscribers and the persistence
//! queue.

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Origin classification of an entry, assigned by the adapter that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Http,
    Soap,
    #[default]
    App,
}

impl LogKind {
    pub fn to_str(&self) -> &'static str {
        match self {
            LogKind::Http => "http",
            LogKind::Soap => "soap",
            LogKind::App => "app",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for LogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(LogKind::Http),
            "soap" => Ok(LogKind::Soap),
            "app" => Ok(LogKind::App),
            _ => Err(format!("Invalid log kind: '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    kind: LogKind,
    category: String,
    event_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<String>,
}

impl LogEntry {
    /// Create an entry stamped with the current wall-clock time.
    pub fn new(level: LogLevel, kind: LogKind, category: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            kind,
            category: category.into(),
            event_id: 0,
            message: None,
            exception: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_event_id(mut self, event_id: i32) -> Self {
        self.event_id = event_id;
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Override the creation time (used when replaying persisted records).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    #[inline]
    pub fn kind(&self) -> LogKind {
        self.kind
    }

    #[inline]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[inline]
    pub fn event_id(&self) -> i32 {
        self.event_id
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }
}
