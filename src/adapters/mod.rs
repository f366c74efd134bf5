//! Host framework adapters
//!
//! Bridges that turn events from an application's logging framework into
//! [`LogEntry`](crate::LogEntry) values and feed them to a store.

pub mod tracing_layer;

pub use tracing_layer::StoreLayer;
