use std::error::Error;
use std::path::PathBuf;

/// Boxed error returned by the storage collaborators (unit of work,
/// document store). Same shape the sinks have always used for backend
/// failures.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Error type returned by loggers, providers and sinks.
///
/// Every failure surfaces synchronously to the caller of the write
/// contract; nothing is retried or swallowed inside this crate.
#[derive(thiserror::Error, Debug)]
pub enum LogSinkError {
    /// The active configuration cannot be used to persist a record
    /// (blank file name, missing source, invalid timestamp pattern...).
    #[error("invalid log sink configuration: {0}")]
    Configuration(String),

    #[error("a formatter function is required to render the log message")]
    MissingFormatter,

    #[error("logger provider has already been disposed")]
    ProviderDisposed,

    #[error("failed writing log file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed serializing log record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("log backend failed: {0}")]
    Backend(#[source] BoxError),
}

impl LogSinkError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        LogSinkError::Configuration(msg.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LogSinkError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = LogSinkError> = std::result::Result<T, E>;
