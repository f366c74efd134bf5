//! # Diagnostic Log Store
//!
//! An in-process diagnostic log pipeline: a bounded in-memory history for
//! diagnostics UIs, live-tail fan-out to subscribers, and optional durable
//! persistence to size-bounded rolling files.
//!
//! ## Features
//!
//! - **Non-blocking ingestion**: `add` never waits on other producers or on disk
//!   (in the default batched mode)
//! - **Severity-aware backpressure**: warnings and errors survive rate limiting
//!   and persistence overload that drop ordinary entries
//! - **Isolated subscribers**: a stalled reader never affects the others
//! - **Rolling files**: newline-delimited records with numbered history
//!
//! ## Example
//!
//! ```
//! use diag_log_store::prelude::*;
//! use diag_log_store::info;
//!
//! let store = LogStore::new(StoreConfig::default()).unwrap();
//! info!(store, "Startup", "Listening on port {}", 8080);
//!
//! let entries = store.get_all();
//! assert_eq!(entries[0].message(), Some("Listening on port 8080"));
//! ```

#[cfg(feature = "tracing-layer")]
pub mod adapters;
pub mod core;
pub mod macros;
pub mod persistence;

pub mod prelude {
    #[cfg(feature = "tracing-layer")]
    pub use crate::adapters::StoreLayer;
    pub use crate::core::{
        DiagnosticCallback, LogEntry, LogKind, LogLevel, LogStore, LogStoreBuilder,
        PersistenceMode, PipelineMetrics, Result, StoreConfig, StoreError, SubscriberQueue,
        Subscription, SubscriptionId, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::persistence::{PersistOutcome, Persistence};
}

#[cfg(feature = "tracing-layer")]
pub use adapters::StoreLayer;
pub use core::{
    Broadcaster, DiagnosticCallback, Diagnostics, LogEntry, LogKind, LogLevel, LogStore,
    LogStoreBuilder, PersistenceMode, PipelineMetrics, RateLimiter, Result, RingBuffer,
    StoreConfig, StoreError, SubscriberQueue, Subscription, SubscriptionId,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use persistence::{PersistOutcome, Persistence};
