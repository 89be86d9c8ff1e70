use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigHandle;
use crate::error::{LogSinkError, Result};
use crate::record::{EventId, ExceptionInfo, LogLevel, LogRecord};
use crate::sink::LogSink;

/// Per-category façade handed out by a
/// [`LoggerProvider`](crate::provider::LoggerProvider).
///
/// A logger never keeps its own copy of the configuration: every write
/// loads the snapshot current at that moment, so a reload applies to the
/// very next call.
pub struct Logger<S: LogSink> {
    category: String,
    sink: Arc<S>,
    config: ConfigHandle<S::Config>,
}

impl<S: LogSink> Logger<S> {
    pub(crate) fn new(category: impl Into<String>, sink: Arc<S>, config: ConfigHandle<S::Config>) -> Self {
        Self {
            category: category.into(),
            sink,
            config,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Every level except the `None` sentinel is enabled; level gating
    /// happens upstream in the logging facade.
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::None
    }

    /// Write one log entry.
    ///
    /// `formatter` renders `state` (and the fault, if any) into the
    /// message. It is mandatory: passing `None` fails with
    /// [`LogSinkError::MissingFormatter`]. Entries at level `None`, and
    /// entries whose message renders empty without a fault, are dropped.
    pub fn write<T, F>(
        &self,
        level: LogLevel,
        event_id: impl Into<EventId>,
        state: T,
        fault: Option<&(dyn Error + 'static)>,
        formatter: Option<F>,
    ) -> Result<()>
    where
        F: FnOnce(&T, Option<&(dyn Error + 'static)>) -> String,
    {
        let config = self.config.load();

        if !self.is_enabled(level) {
            return Ok(());
        }

        let formatter = formatter.ok_or(LogSinkError::MissingFormatter)?;
        let message = formatter(&state, fault);
        if message.is_empty() && fault.is_none() {
            return Ok(());
        }

        let exception = fault.map(ExceptionInfo::capture);
        self.persist(&config, level, event_id.into(), message, exception)
    }

    /// Write an already rendered message with an already captured
    /// exception. Same drop rules as [`Logger::write`].
    pub fn write_captured(
        &self,
        level: LogLevel,
        event_id: impl Into<EventId>,
        message: String,
        exception: Option<ExceptionInfo>,
    ) -> Result<()> {
        let config = self.config.load();

        if !self.is_enabled(level) || (message.is_empty() && exception.is_none()) {
            return Ok(());
        }

        self.persist(&config, level, event_id.into(), message, exception)
    }

    /// Shorthand for a plain message with event id 0.
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) -> Result<()> {
        self.write(level, 0, message, None, Some(render_state::<_>))
    }

    /// Shorthand for a message accompanied by a fault.
    pub fn log_fault(
        &self,
        level: LogLevel,
        message: impl fmt::Display,
        fault: &(dyn Error + 'static),
    ) -> Result<()> {
        self.write(level, 0, message, Some(fault), Some(render_state::<_>))
    }

    fn persist(
        &self,
        config: &S::Config,
        level: LogLevel,
        event_id: EventId,
        message: String,
        exception: Option<ExceptionInfo>,
    ) -> Result<()> {
        let record = LogRecord::new(level, self.category.as_str(), event_id, message, exception);
        self.sink.write(&record, config)
    }
}

fn render_state<T: fmt::Display>(state: &T, _fault: Option<&(dyn Error + 'static)>) -> String {
    state.to_string()
}

impl<S: LogSink> fmt::Debug for Logger<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("category", &self.category)
            .field("sink", &S::ALIAS)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Fault;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture {
        records: Mutex<Vec<(LogRecord, String)>>,
    }

    impl LogSink for Capture {
        type Config = String;
        const ALIAS: &'static str = "Capture";

        fn write(&self, record: &LogRecord, config: &String) -> Result<()> {
            self.records.lock().push((record.clone(), config.clone()));
            Ok(())
        }
    }

    fn logger() -> (Logger<Capture>, Arc<Capture>, ConfigHandle<String>) {
        let sink = Arc::new(Capture::default());
        let config = ConfigHandle::new(Arc::new("v1".to_string()));
        (Logger::new("Orders", Arc::clone(&sink), config.clone()), sink, config)
    }

    type Render = fn(&&str, Option<&(dyn Error + 'static)>) -> String;

    #[test]
    fn only_none_is_disabled() {
        let (logger, _, _) = logger();
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Information,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Critical,
        ] {
            assert!(logger.is_enabled(level));
        }
        assert!(!logger.is_enabled(LogLevel::None));
    }

    #[test]
    fn missing_formatter_is_an_error() {
        let (logger, sink, _) = logger();
        let err = logger
            .write(LogLevel::Error, 1, "state", None, None::<Render>)
            .unwrap_err();
        assert!(matches!(err, LogSinkError::MissingFormatter));
        assert!(sink.records.lock().is_empty());
    }

    #[test]
    fn none_level_is_dropped_before_formatting() {
        let (logger, sink, _) = logger();
        logger
            .write(LogLevel::None, 1, "state", None, None::<Render>)
            .unwrap();
        assert!(sink.records.lock().is_empty());
    }

    #[test]
    fn empty_message_without_fault_is_dropped() {
        let (logger, sink, _) = logger();
        logger.log(LogLevel::Information, "").unwrap();
        assert!(sink.records.lock().is_empty());

        let fault = Fault::new("boom");
        logger.log_fault(LogLevel::Error, "", &fault).unwrap();
        let records = sink.records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0.exception.as_ref().unwrap().message.as_deref(), Some("boom"));
    }

    #[test]
    fn record_carries_category_event_and_formatted_state() {
        let (logger, sink, _) = logger();
        logger
            .write(LogLevel::Warning, 42, 7u32, None, Some(|n: &u32, _: Option<&(dyn Error + 'static)>| {
                format!("{} items left", n)
            }))
            .unwrap();

        let records = sink.records.lock();
        let (record, _) = &records[0];
        assert_eq!(record.category, "Orders");
        assert_eq!(record.event_id, EventId(42));
        assert_eq!(record.level, LogLevel::Warning);
        assert_eq!(record.message, "7 items left");
    }

    #[test]
    fn every_write_reads_current_configuration() {
        let (logger, sink, config) = logger();
        logger.log(LogLevel::Information, "first").unwrap();
        config.store(Arc::new("v2".to_string()));
        logger.log(LogLevel::Information, "second").unwrap();

        let records = sink.records.lock();
        assert_eq!(records[0].1, "v1");
        assert_eq!(records[1].1, "v2");
    }
}
