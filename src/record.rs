use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BoxError;

/// Maximum number of links captured from a fault's cause chain.
pub const MAX_EXCEPTION_DEPTH: usize = 64;

/// Ordered log severity. `None` is a sentinel that is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Information,
    Warning,
    Error,
    Critical,
    None,
}

impl LogLevel {
    /// Uppercase name used in text layouts and database columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Information => "INFORMATION",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::None => "NONE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "information" | "info" => Ok(LogLevel::Information),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            "none" => Ok(LogLevel::None),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Caller-supplied identifier correlating related log events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i32);

impl From<i32> for EventId {
    fn from(id: i32) -> Self {
        EventId(id)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for callers that want `source` and `stack_trace` text
/// captured along with the message.
///
/// Any other [`std::error::Error`] can be logged as well; it is captured
/// with its `Display` text only.
#[derive(Debug)]
pub struct Fault {
    message: String,
    source_name: Option<String>,
    stack_trace: Option<String>,
    cause: Option<BoxError>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source_name: None,
            stack_trace: None,
            cause: None,
        }
    }

    /// Name of the application or component that raised the fault.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_name = Some(source.into());
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn caused_by(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Fault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}

/// Immutable snapshot of a fault and its cause chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    pub source: Option<String>,
    pub stack_trace: Option<String>,
    pub message: Option<String>,
    pub inner_exception: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    /// Walk `err` and its `source()` chain, materializing one node per
    /// link. Links past [`MAX_EXCEPTION_DEPTH`] are dropped.
    pub fn capture(err: &(dyn Error + 'static)) -> Self {
        Self::capture_bounded(err, MAX_EXCEPTION_DEPTH)
    }

    fn capture_bounded(err: &(dyn Error + 'static), remaining: usize) -> Self {
        let inner_exception = match err.source() {
            Some(cause) if remaining > 1 => {
                Some(Box::new(Self::capture_bounded(cause, remaining - 1)))
            }
            _ => None,
        };

        match err.downcast_ref::<Fault>() {
            Some(fault) => ExceptionInfo {
                source: fault.source_name.clone(),
                stack_trace: fault.stack_trace.clone(),
                message: Some(fault.message.clone()),
                inner_exception,
            },
            None => ExceptionInfo {
                source: None,
                stack_trace: None,
                message: Some(err.to_string()),
                inner_exception,
            },
        }
    }

    /// Number of links in the chain, this node included.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut node = self;
        while let Some(inner) = node.inner_exception.as_deref() {
            depth += 1;
            node = inner;
        }
        depth
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{}: ", source)?;
        }
        f.write_str(self.message.as_deref().unwrap_or_default())?;

        if let Some(inner) = &self.inner_exception {
            write!(f, " ---> {}", inner)?;
            f.write_str("\n   --- End of inner exception stack trace ---")?;
        }

        if let Some(stack_trace) = &self.stack_trace {
            write!(f, "\n{}", stack_trace)?;
        }

        Ok(())
    }
}

/// Sink-agnostic representation of one log event.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub id: String,
    pub created_at: DateTime<Local>,
    pub level: LogLevel,
    pub category: String,
    pub event_id: EventId,
    pub message: String,
    pub exception: Option<ExceptionInfo>,
}

impl LogRecord {
    /// Build a record stamped with a fresh identifier and the current
    /// local time.
    pub fn new(
        level: LogLevel,
        category: impl Into<String>,
        event_id: EventId,
        message: impl Into<String>,
        exception: Option<ExceptionInfo>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().hyphenated().to_string(),
            created_at: Local::now(),
            level,
            category: category.into(),
            event_id,
            message: message.into(),
            exception,
        }
    }
}
