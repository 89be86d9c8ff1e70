use crate::error::Result;
use crate::record::LogRecord;

/// Synchronous destination for [`LogRecord`]s produced by a [`Logger`].
///
/// Implementations own the backend-specific write path (formatting or
/// mapping the record, bootstrapping storage, performing the durable
/// write). The sink is chosen at wiring time through the provider's type
/// parameter; the configuration snapshot is handed in on every call so
/// that a reload takes effect on the very next record.
///
/// [`Logger`]: crate::logger::Logger
pub trait LogSink: Send + Sync + 'static {
    /// Configuration shape owned by this sink.
    type Config: Send + Sync + 'static;

    /// Name of the configuration section for this sink, looked up under
    /// `Logging` by [`load_section`](crate::config::load_section).
    const ALIAS: &'static str;

    /// Persist a single record.
    ///
    /// **Parameters**
    /// - `record`: fully-populated [`LogRecord`] built by the logger.
    /// - `config`: configuration snapshot current at the time of the call.
    ///
    /// **Returns**
    /// - `Ok(())` once the record is durably written.
    /// - `Err(..)` on configuration problems or backend failures. Errors
    ///   are surfaced to the caller as is; the sink never retries.
    fn write(&self, record: &LogRecord, config: &Self::Config) -> Result<()>;
}
