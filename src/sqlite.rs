//! SQLite-backed [`UnitOfWorkFactory`] for the relational sink.
//!
//! Each configured source is a database path (or `:memory:`). One
//! connection is opened lazily per source and shared by every unit of work
//! for that source; a unit of work holds the connection lock from `BEGIN`
//! until it commits or is dropped.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::BoxError;
use crate::relational::{LogRow, UnitOfWork, UnitOfWorkFactory};

/// Source name that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

const INSERT_ROW: &str = "INSERT INTO log_message_entry
    (log_id, created_date, log_level, category_name, event_id, message, exception)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

#[derive(Default)]
pub struct SqliteUnitOfWorkFactory {
    connections: DashMap<String, Arc<Mutex<Connection>>>,
}

impl SqliteUnitOfWorkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn connection(&self, source: &str) -> Result<Arc<Mutex<Connection>>, BoxError> {
        if let Some(conn) = self.connections.get(source) {
            return Ok(Arc::clone(conn.value()));
        }

        match self.connections.entry(source.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let conn = Arc::new(Mutex::new(open(source)?));
                entry.insert(Arc::clone(&conn));
                Ok(conn)
            }
        }
    }

    /// Run `f` against the connection for `source`, outside of any unit of
    /// work. Handy for reading back what was logged.
    pub fn with_connection<T>(
        &self,
        source: &str,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, BoxError> {
        let conn = self.connection(source)?;
        let guard = conn.lock();
        Ok(f(&*guard)?)
    }
}

fn open(source: &str) -> Result<Connection, BoxError> {
    if source == IN_MEMORY {
        debug!("opening in-memory log database");
        return Ok(Connection::open_in_memory()?);
    }

    let path = Path::new(source);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    debug!(path = %path.display(), "opening log database");
    Ok(Connection::open(path)?)
}

impl UnitOfWorkFactory for SqliteUnitOfWorkFactory {
    fn begin(&self, source: &str) -> Result<Box<dyn UnitOfWork>, BoxError> {
        let conn = self.connection(source)?.lock_arc();
        conn.execute_batch("BEGIN")?;
        Ok(Box::new(SqliteUnitOfWork {
            conn,
            finished: false,
        }))
    }
}

struct SqliteUnitOfWork {
    conn: ArcMutexGuard<RawMutex, Connection>,
    finished: bool,
}

impl UnitOfWork for SqliteUnitOfWork {
    fn execute_raw(&mut self, script: &str) -> Result<(), BoxError> {
        self.conn.execute_batch(script)?;
        Ok(())
    }

    fn insert(&mut self, row: &LogRow) -> Result<(), BoxError> {
        self.conn.execute(
            INSERT_ROW,
            params![
                row.log_id,
                row.created_date,
                row.log_level,
                row.category_name,
                row.event_id,
                row.message,
                row.exception,
            ],
        )?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), BoxError> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
