//! Error types for the logger system

use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
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
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File sink could not acquire its file
    #[error("File sink error for '{path}': {message}")]
    FileSink { path: String, message: String },

    /// A sink failed while writing or flushing
    #[error("Sink '{sink}' of logger '{logger}' failed during {operation}: {message}")]
    SinkFailure {
        logger: String,
        sink: String,
        operation: &'static str,
        message: String,
    },

    /// Logger name already registered
    #[error("Logger '{0}' already exists")]
    DuplicateLogger(String),

    /// Registry has been shut down
    #[error("Logger registry closed")]
    RegistryClosed,

    /// Logger already stopped
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Async dispatcher no longer accepts entries
    #[error("Async dispatcher stopped")]
    DispatcherStopped,

    /// Flush barrier was not reached in time
    #[error("Flush incomplete after {timeout:?}")]
    FlushIncomplete { timeout: Duration },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSink {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap a failure reported by a sink with the logger and sink names
    pub fn sink_failure(
        logger: impl Into<String>,
        sink: impl Into<String>,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        LoggerError::SinkFailure {
            logger: logger.into(),
            sink: sink.into(),
            operation,
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error reports a closed logger, registry or dispatcher
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            LoggerError::RegistryClosed | LoggerError::LoggerStopped | LoggerError::DispatcherStopped
        )
    }
}
