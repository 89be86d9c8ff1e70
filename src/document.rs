use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{BoxError, LogSinkError, Result};
use crate::record::{EventId, ExceptionInfo, LogLevel, LogRecord};
use crate::sink::LogSink;

/// Collection used when the configuration does not name one.
pub const DEFAULT_COLLECTION: &str = "log_message_entries";

/// Configuration for [`DocumentSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSinkConfig {
    /// Logical source name handed to the [`DocumentContextFactory`].
    pub source: Option<String>,
    pub collection: Option<String>,
}

/// Document-store handle for one logical source.
pub trait DocumentContext: Send + Sync {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection>;
}

pub trait DocumentCollection: Send + Sync {
    /// Insert one document. The `_id` field is the natural primary key.
    fn insert_one(&self, document: serde_json::Value) -> Result<(), BoxError>;
}

pub trait DocumentContextFactory: Send + Sync {
    fn open_context(&self, source: &str) -> Result<Arc<dyn DocumentContext>, BoxError>;
}

impl<F: DocumentContextFactory + ?Sized> DocumentContextFactory for Arc<F> {
    fn open_context(&self, source: &str) -> Result<Arc<dyn DocumentContext>, BoxError> {
        (**self).open_context(source)
    }
}

/// Stored shape of a record: the generated id doubles as `_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogDocument {
    #[serde(rename = "_id")]
    pub log_id: String,
    pub created_date: DateTime<Local>,
    pub log_level: LogLevel,
    pub category_name: String,
    pub event_id: EventId,
    pub message: String,
    pub exception: Option<ExceptionInfo>,
}

impl From<&LogRecord> for LogDocument {
    fn from(record: &LogRecord) -> Self {
        LogDocument {
            log_id: record.id.clone(),
            created_date: record.created_at,
            log_level: record.level,
            category_name: record.category.clone(),
            event_id: record.event_id,
            message: record.message.clone(),
            exception: record.exception.clone(),
        }
    }
}

/// Inserts each record as one document. Document stores are schema-less,
/// so there is no bootstrap step.
pub struct DocumentSink<F> {
    factory: F,
}

impl<F: DocumentContextFactory> DocumentSink<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

impl<F: DocumentContextFactory + 'static> LogSink for DocumentSink<F> {
    type Config = DocumentSinkConfig;
    const ALIAS: &'static str = "Document";

    fn write(&self, record: &LogRecord, config: &DocumentSinkConfig) -> Result<()> {
        let source = config
            .source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| LogSinkError::config("no document source configured"))?;
        let collection = config.collection.as_deref().unwrap_or(DEFAULT_COLLECTION);

        let document = serde_json::to_value(LogDocument::from(record))?;
        let context = self.factory.open_context(source).map_err(LogSinkError::Backend)?;
        context
            .collection(collection)
            .insert_one(document)
            .map_err(LogSinkError::Backend)
    }
}
