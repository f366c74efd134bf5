//! `tracing` integration
//!
//! [`StoreLayer`] is a [`tracing_subscriber::Layer`] that records every event
//! at or above a minimum level into a [`LogStore`]:
//!
//! | tracing field            | entry field |
//! |--------------------------|-------------|
//! | level                    | level (`WARN` becomes `Warning`) |
//! | target                   | category    |
//! | `message`                | message     |
//! | `event_id`               | event id    |
//! | `kind` (`http`/`soap`/`app`) | kind    |
//! | `exception` or `error`   | exception   |
//!
//! Any other field is appended to the message as `key=value`.

use crate::core::{LogEntry, LogKind, LogLevel, LogStore};
use std::fmt::{self, Write};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Layer feeding tracing events into a shared store
///
/// # Example
///
/// ```
/// use diag_log_store::prelude::*;
/// use std::sync::Arc;
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
/// let subscriber = tracing_subscriber::registry().with(StoreLayer::new(Arc::clone(&store)));
///
/// tracing::subscriber::with_default(subscriber, || {
///     tracing::warn!(target: "Api.Orders", event_id = 42, kind = "http", "Slow request");
/// });
///
/// let entry = &store.get_all()[0];
/// assert_eq!(entry.level(), LogLevel::Warning);
/// assert_eq!(entry.kind(), LogKind::Http);
/// assert_eq!(entry.event_id(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct StoreLayer {
    store: Arc<LogStore>,
    min_level: LogLevel,
    default_kind: LogKind,
}

impl StoreLayer {
    /// Record every event, tagging entries without a `kind` field as `app`.
    pub fn new(store: Arc<LogStore>) -> Self {
        Self {
            store,
            min_level: LogLevel::Trace,
            default_kind: LogKind::App,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Kind for events that carry no `kind` field
    #[must_use = "builder methods return a new value"]
    pub fn with_default_kind(mut self, kind: LogKind) -> Self {
        self.default_kind = kind;
        self
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }
}

impl<S: Subscriber> Layer<S> for StoreLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = map_level(metadata.level());
        if level < self.min_level {
            return;
        }

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        let mut entry = LogEntry::new(
            level,
            visitor.kind.unwrap_or(self.default_kind),
            metadata.target(),
        )
        .with_event_id(visitor.event_id);

        if let Some(message) = visitor.take_message() {
            entry = entry.with_message(message);
        }
        if let Some(exception) = visitor.exception {
            entry = entry.with_exception(exception);
        }

        self.store.add(entry);
    }
}

fn map_level(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warning,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

/// Visitor that splits a tracing event into entry fields.
#[derive(Default)]
struct EntryVisitor {
    message: Option<String>,
    extra: String,
    event_id: i32,
    kind: Option<LogKind>,
    exception: Option<String>,
}

impl EntryVisitor {
    fn take_message(&mut self) -> Option<String> {
        match (self.message.take(), self.extra.is_empty()) {
            (Some(message), true) => Some(message),
            (Some(message), false) => Some(format!("{} {}", message, self.extra)),
            (None, false) => Some(std::mem::take(&mut self.extra)),
            (None, true) => None,
        }
    }

    fn push_extra(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.extra.is_empty() {
            self.extra.push(' ');
        }
        let _ = write!(self.extra, "{}={}", name, value);
    }

    fn record_text(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "exception" | "error" => self.exception = Some(value),
            "kind" => match value.parse::<LogKind>() {
                Ok(kind) => self.kind = Some(kind),
                Err(_) => self.push_extra("kind", format_args!("{}", value)),
            },
            "event_id" => match value.parse::<i32>() {
                Ok(id) => self.event_id = id,
                Err(_) => self.push_extra("event_id", format_args!("{}", value)),
            },
            name => self.push_extra(name, format_args!("{}", value)),
        }
    }

    fn record_integer(&mut self, field: &Field, value: i128) {
        if field.name() == "event_id" {
            if let Ok(id) = i32::try_from(value) {
                self.event_id = id;
                return;
            }
        }
        self.push_extra(field.name(), format_args!("{}", value));
    }
}

impl Visit for EntryVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_integer(field, i128::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_integer(field, i128::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_text(field, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StoreConfig;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(layer: StoreLayer, emit: impl FnOnce()) -> Vec<Arc<LogEntry>> {
        let store = Arc::clone(layer.store());
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
        store.get_all()
    }

    fn store() -> Arc<LogStore> {
        Arc::new(LogStore::new(StoreConfig::default()).unwrap())
    }

    #[test]
    fn test_levels_are_mapped() {
        let entries = capture(StoreLayer::new(store()), || {
            tracing::trace!("t");
            tracing::debug!("d");
            tracing::info!("i");
            tracing::warn!("w");
            tracing::error!("e");
        });

        let levels: Vec<LogLevel> = entries.iter().map(|e| e.level()).collect();
        assert_eq!(
            levels,
            vec![
                LogLevel::Trace,
                LogLevel::Debug,
                LogLevel::Info,
                LogLevel::Warning,
                LogLevel::Error
            ]
        );
    }

    #[test]
    fn test_fields_become_entry_fields() {
        let entries = capture(StoreLayer::new(store()), || {
            tracing::error!(
                target: "Billing.Gateway",
                event_id = 17,
                kind = "soap",
                exception = "TimeoutException: no reply",
                attempt = 3,
                "Invoice submission failed for {}",
                "acme"
            );
        });

        let entry = &entries[0];
        assert_eq!(entry.category(), "Billing.Gateway");
        assert_eq!(entry.event_id(), 17);
        assert_eq!(entry.kind(), LogKind::Soap);
        assert_eq!(entry.exception(), Some("TimeoutException: no reply"));
        assert_eq!(
            entry.message(),
            Some("Invoice submission failed for acme attempt=3")
        );
    }

    #[test]
    fn test_min_level_filters() {
        let layer = StoreLayer::new(store()).with_min_level(LogLevel::Warning);
        let entries = capture(layer, || {
            tracing::info!("skipped");
            tracing::warn!("kept");
        });

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message(), Some("kept"));
    }

    #[test]
    fn test_default_kind_and_unknown_kind() {
        let layer = StoreLayer::new(store()).with_default_kind(LogKind::Http);
        let entries = capture(layer, || {
            tracing::info!("no kind");
            tracing::info!(kind = "grpc", "bad kind");
        });

        assert_eq!(entries[0].kind(), LogKind::Http);
        assert_eq!(entries[1].kind(), LogKind::Http);
        assert_eq!(entries[1].message(), Some("bad kind kind=grpc"));
    }

    #[test]
    fn test_event_without_message() {
        let entries = capture(StoreLayer::new(store()), || {
            tracing::info!(user = "alice", status = 200);
        });

        assert_eq!(entries[0].message(), Some("user=alice status=200"));
        assert_eq!(entries[0].event_id(), 0);
    }
}
