//! Core store types

pub mod admission;
pub mod broadcaster;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod log_entry;
pub mod log_level;
pub mod metrics;
pub mod ring_buffer;
pub mod store;

pub use admission::{RateLimiter, RATE_WINDOW};
pub use broadcaster::{Broadcaster, SubscriberQueue, Subscription, SubscriptionId};
pub use config::{PersistenceMode, StoreConfig};
pub use diagnostics::{DiagnosticCallback, DiagnosticSeverity, Diagnostics};
pub use error::{Result, StoreError};
pub use log_entry::{LogEntry, LogKind};
pub use log_level::LogLevel;
pub use metrics::PipelineMetrics;
pub use ring_buffer::RingBuffer;
pub use store::{LogStore, LogStoreBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
