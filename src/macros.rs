//! Macros for recording formatted entries.
//!
//! Each macro builds a [`LogEntry`](crate::LogEntry) with a formatted message,
//! similar to `println!` and `format!`, and hands it to a store's `add`.
//!
//! # Examples
//!
//! ```
//! use diag_log_store::prelude::*;
//! use diag_log_store::{info, log_entry};
//!
//! let store = LogStore::new(StoreConfig::default()).unwrap();
//!
//! // Application entry
//! info!(store, "Startup", "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(store, "Startup", "Server listening on port {}", port);
//!
//! // Explicit level and kind
//! log_entry!(store, LogLevel::Warning, LogKind::Http, "Api.Orders", "Slow request: {} ms", 950);
//!
//! assert_eq!(store.count(), 3);
//! ```

/// Record an entry with an explicit level and kind.
///
/// # Examples
///
/// ```
/// # use diag_log_store::prelude::*;
/// # let store = LogStore::new(StoreConfig::default()).unwrap();
/// use diag_log_store::log_entry;
/// log_entry!(store, LogLevel::Info, LogKind::Soap, "Billing", "Simple message");
/// log_entry!(store, LogLevel::Error, LogKind::Http, "Api", "Status code: {}", 500);
/// ```
#[macro_export]
macro_rules! log_entry {
    ($store:expr, $level:expr, $kind:expr, $category:expr, $($arg:tt)+) => {
        $store.add(
            $crate::LogEntry::new($level, $kind, $category).with_message(format!($($arg)+)),
        )
    };
}

/// Record a trace-level application entry.
///
/// # Examples
///
/// ```
/// # use diag_log_store::prelude::*;
/// # let store = LogStore::new(StoreConfig::default()).unwrap();
/// use diag_log_store::trace;
/// trace!(store, "Calculator", "Entering function: calculate()");
/// trace!(store, "Calculator", "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($store:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_entry!($store, $crate::LogLevel::Trace, $crate::LogKind::App, $category, $($arg)+)
    };
}

/// Record a debug-level application entry.
#[macro_export]
macro_rules! debug {
    ($store:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_entry!($store, $crate::LogLevel::Debug, $crate::LogKind::App, $category, $($arg)+)
    };
}

/// Record an info-level application entry.
#[macro_export]
macro_rules! info {
    ($store:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_entry!($store, $crate::LogLevel::Info, $crate::LogKind::App, $category, $($arg)+)
    };
}

/// Record a warning-level application entry.
///
/// # Examples
///
/// ```
/// # use diag_log_store::prelude::*;
/// # let store = LogStore::new(StoreConfig::default()).unwrap();
/// use diag_log_store::warn;
/// warn!(store, "Disk", "Low disk space");
/// warn!(store, "Sync", "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($store:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_entry!($store, $crate::LogLevel::Warning, $crate::LogKind::App, $category, $($arg)+)
    };
}

/// Record an error-level application entry.
#[macro_export]
macro_rules! error {
    ($store:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_entry!($store, $crate::LogLevel::Error, $crate::LogKind::App, $category, $($arg)+)
    };
}

/// Record a critical-level application entry.
///
/// # Examples
///
/// ```
/// # use diag_log_store::prelude::*;
/// # let store = LogStore::new(StoreConfig::default()).unwrap();
/// use diag_log_store::critical;
/// critical!(store, "Storage", "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! critical {
    ($store:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_entry!($store, $crate::LogLevel::Critical, $crate::LogKind::App, $category, $($arg)+)
    };
}
