//! Error types for the log distribution system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Payload handed to a writer could not be decoded into an event
    #[error("Malformed log payload: {0}")]
    Parse(String),

    /// Unknown severity name
    #[error("Invalid log level: '{0}'")]
    InvalidLevel(String),

    /// Start requested on a component that is already running
    #[error("{component} is already running")]
    AlreadyRunning { component: String },

    /// Caller-supplied processor failed for one event
    #[error("Processor '{processor}' failed: {message}")]
    Processor { processor: String, message: String },

    /// Persistence backend could not be opened
    #[error("Persistent store unavailable at '{path}': {message}")]
    StoreUnavailable { path: String, message: String },

    /// Persistence backend failed during an operation
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File appender error with path
    #[error("File appender error for '{path}': {message}")]
    FileAppenderError { path: String, message: String },

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

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create a parse error for a malformed payload
    pub fn parse(message: impl Into<String>) -> Self {
        LoggerError::Parse(message.into())
    }

    pub fn already_running(component: impl Into<String>) -> Self {
        LoggerError::AlreadyRunning {
            component: component.into(),
        }
    }

    /// Create a processor failure
    pub fn processor(processor: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Processor {
            processor: processor.into(),
            message: message.into(),
        }
    }

    /// Create a store-unavailable error
    pub fn store_unavailable(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::StoreUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        LoggerError::Persistence(msg.into())
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file appender error
    pub fn file_appender(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileAppenderError {
            path: path.into(),
            message: message.into(),
        }
    }

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

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether the error was caused by the caller's input rather than by
    /// the system.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, LoggerError::Parse(_) | LoggerError::InvalidLevel(_))
    }
}
