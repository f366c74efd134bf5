//! Internal diagnostic sink
//!
//! Failures inside the store are never written back into the store itself.
//! They go to stderr and, if registered, to a user callback.

use super::error::StoreError;
use std::fmt;
use std::sync::Arc;

/// Callback invoked for every internal failure the store reports.
pub type DiagnosticCallback = Arc<dyn Fn(&StoreError) + Send + Sync>;

/// Severity tag written in front of stderr diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Warning => write!(f, "[LOG STORE WARNING]"),
            DiagnosticSeverity::Error => write!(f, "[LOG STORE ERROR]"),
        }
    }
}

#[derive(Clone, Default)]
pub struct Diagnostics {
    callback: Option<DiagnosticCallback>,
}

impl Diagnostics {
    pub fn new(callback: Option<DiagnosticCallback>) -> Self {
        Self { callback }
    }

    pub fn report(&self, severity: DiagnosticSeverity, error: &StoreError) {
        eprintln!("{} {}", severity, error);
        if let Some(ref callback) = self.callback {
            callback(error);
        }
    }

    pub fn warn(&self, error: &StoreError) {
        self.report(DiagnosticSeverity::Warning, error);
    }

    pub fn error(&self, error: &StoreError) {
        self.report(DiagnosticSeverity::Error, error);
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
