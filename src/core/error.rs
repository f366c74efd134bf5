//! Error types for the log store

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotation { path: String, message: String },

    /// File lock error
    #[error("Failed to acquire file lock on '{path}'")]
    FileLock { path: String },

    /// Persistence queue saturated, entry not retained
    #[error("Persistence queue full: {current}/{max} entries pending")]
    QueueFull { current: usize, max: usize },

    /// A persisted line could not be read back
    #[error("Malformed record on line {line}: {message}")]
    RecordParse { line: usize, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        StoreError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::FileRotation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn file_lock(path: impl Into<String>) -> Self {
        StoreError::FileLock { path: path.into() }
    }

    pub fn queue_full(current: usize, max: usize) -> Self {
        StoreError::QueueFull { current, max }
    }

    pub fn record_parse(line: usize, message: impl Into<String>) -> Self {
        StoreError::RecordParse {
            line,
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        StoreError::Other(msg.into())
    }
}
