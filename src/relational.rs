use chrono::NaiveDateTime;
use dashmap::DashSet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{BoxError, LogSinkError, Result};
use crate::record::LogRecord;
use crate::sink::LogSink;

/// Name of the table the default script creates.
pub const LOG_TABLE: &str = "log_message_entry";

/// Column bounds of the log table.
pub const LOG_ID_LEN: usize = 36;
pub const LOG_LEVEL_MAX_LEN: usize = 16;
pub const CATEGORY_MAX_LEN: usize = 256;
pub const MESSAGE_MAX_LEN: usize = 2000;

/// Creation script run when `ensure_table_created` is set. Targets SQLite.
pub const CREATE_TABLE_SCRIPT: &str = include_str!("scripts/create_log_table.sql");

/// Serializes table bootstrap across every [`RelationalSink`] in the
/// process.
static ENSURE_TABLE_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Configuration for [`RelationalSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationalSinkConfig {
    /// Connection reference handed to the [`UnitOfWorkFactory`].
    pub source: Option<String>,
    /// Run the creation script before the first insert.
    pub ensure_table_created: bool,
}

/// One row of the log table.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    /// Fixed-length, non-unicode identifier.
    pub log_id: String,
    pub created_date: NaiveDateTime,
    /// Uppercase level name.
    pub log_level: &'static str,
    pub category_name: String,
    pub event_id: i32,
    pub message: String,
    /// JSON encoding of the exception tree.
    pub exception: Option<String>,
}

impl LogRow {
    pub fn from_record(record: &LogRecord) -> Result<Self> {
        let exception = record
            .exception
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        Ok(LogRow {
            log_id: record.id.clone(),
            created_date: record.created_at.naive_local(),
            log_level: record.level.as_str(),
            category_name: record.category.clone(),
            event_id: record.event_id.0,
            message: record.message.clone(),
            exception,
        })
    }
}

/// Transactional boundary supplied by the database layer.
pub trait UnitOfWork {
    /// Execute a raw script (DDL) inside the unit of work.
    fn execute_raw(&mut self, script: &str) -> Result<(), BoxError>;

    fn insert(&mut self, row: &LogRow) -> Result<(), BoxError>;

    /// Commit everything done so far. Dropping an uncommitted unit of work
    /// rolls it back.
    fn commit(self: Box<Self>) -> Result<(), BoxError>;
}

/// Hands out units of work for a configured source.
pub trait UnitOfWorkFactory: Send + Sync {
    fn begin(&self, source: &str) -> Result<Box<dyn UnitOfWork>, BoxError>;
}

impl<F: UnitOfWorkFactory + ?Sized> UnitOfWorkFactory for Arc<F> {
    fn begin(&self, source: &str) -> Result<Box<dyn UnitOfWork>, BoxError> {
        (**self).begin(source)
    }
}

/// Inserts one row per record through a [`UnitOfWorkFactory`].
pub struct RelationalSink<F> {
    factory: F,
    create_table_script: String,
    /// Sources whose table was created by a committed unit of work.
    ensured_sources: DashSet<String>,
}

impl<F: UnitOfWorkFactory> RelationalSink<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            create_table_script: CREATE_TABLE_SCRIPT.to_string(),
            ensured_sources: DashSet::new(),
        }
    }

    /// Replace the SQLite creation script, e.g. for another dialect.
    pub fn with_create_table_script(mut self, script: impl Into<String>) -> Self {
        self.create_table_script = script.into();
        self
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Whether the table of `source` has been created by this sink.
    pub fn is_table_ensured(&self, source: &str) -> bool {
        self.ensured_sources.contains(source)
    }

    /// Create the table and insert the first row in one unit of work,
    /// holding the bootstrap lock until the commit. The source is marked
    /// only after the commit; a rolled back unit of work rolls back the DDL
    /// with it.
    fn bootstrap(&self, source: &str, mut unit: Box<dyn UnitOfWork>, row: &LogRow) -> Result<()> {
        {
            let guard = ENSURE_TABLE_LOCK.lock();
            if !self.is_table_ensured(source) {
                unit.execute_raw(&self.create_table_script)
                    .map_err(LogSinkError::Backend)?;
                insert_and_commit(unit, row)?;
                self.ensured_sources.insert(source.to_string());
                drop(guard);
                info!(table = LOG_TABLE, source, "log table ensured");
                return Ok(());
            }
        }
        insert_and_commit(unit, row)
    }
}

fn insert_and_commit(mut unit: Box<dyn UnitOfWork>, row: &LogRow) -> Result<()> {
    unit.insert(row).map_err(LogSinkError::Backend)?;
    unit.commit().map_err(LogSinkError::Backend)?;
    debug!(log_id = %row.log_id, "log row committed");
    Ok(())
}

impl<F: UnitOfWorkFactory + 'static> LogSink for RelationalSink<F> {
    type Config = RelationalSinkConfig;
    const ALIAS: &'static str = "Relational";

    fn write(&self, record: &LogRecord, config: &RelationalSinkConfig) -> Result<()> {
        let source = config
            .source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| LogSinkError::config("no database source configured"))?;

        let row = LogRow::from_record(record)?;
        let unit = self.factory.begin(source).map_err(LogSinkError::Backend)?;

        if config.ensure_table_created && !self.is_table_ensured(source) {
            return self.bootstrap(source, unit, &row);
        }
        insert_and_commit(unit, &row)
    }
}
