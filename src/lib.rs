pub mod error;
pub mod record;
pub mod format;
pub mod sink;
pub mod config;
pub mod logger;
pub mod provider;

pub mod file;
pub mod relational;
pub mod document;
pub mod memory_store;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod env;
pub mod layer;
pub mod init;

pub use error::{BoxError, LogSinkError};
pub use logger::Logger;
pub use provider::LoggerProvider;
pub use record::{EventId, ExceptionInfo, Fault, LogLevel, LogRecord};
pub use sink::LogSink;
