use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{ChangeSubscription, ConfigChannel, ConfigHandle, ConfigSource};
use crate::error::{LogSinkError, Result};
use crate::logger::Logger;
use crate::sink::LogSink;

/// Factory and cache of [`Logger`]s for one sink.
///
/// The provider is an explicit object owned by the host: it subscribes to
/// configuration changes on construction and keeps one logger per category
/// (compared case-insensitively) until it is disposed. Loggers share the
/// provider's configuration handle, so a published change is visible to
/// every cached logger on its next write.
pub struct LoggerProvider<S: LogSink> {
    sink: Arc<S>,
    config: ConfigHandle<S::Config>,
    loggers: DashMap<String, Arc<Logger<S>>>,
    subscription: Mutex<Option<ChangeSubscription>>,
    disposed: AtomicBool,
}

impl<S: LogSink> LoggerProvider<S> {
    /// Create a provider that follows `source` for configuration.
    pub fn new(sink: S, source: &dyn ConfigSource<S::Config>) -> Self {
        let config = ConfigHandle::new(source.current());

        let handle = config.clone();
        let subscription = source.on_change(Box::new(move |updated| {
            handle.store(updated);
            debug!(sink = S::ALIAS, "logger configuration reloaded");
        }));
        // A change published before the subscription existed is picked up here.
        config.store(source.current());

        info!(sink = S::ALIAS, "logger provider created");
        Self {
            sink: Arc::new(sink),
            config,
            loggers: DashMap::new(),
            subscription: Mutex::new(Some(subscription)),
            disposed: AtomicBool::new(false),
        }
    }

    /// Create a provider with a configuration that never changes.
    pub fn with_config(sink: S, config: S::Config) -> Self {
        let channel = ConfigChannel::new(config);
        Self::new(sink, &channel)
    }

    /// Return the logger for `category`, creating it on first use.
    ///
    /// Concurrent calls for the same category (in any letter case) observe
    /// the same instance.
    pub fn get_logger(&self, category: &str) -> Result<Arc<Logger<S>>> {
        if self.is_disposed() {
            return Err(LogSinkError::ProviderDisposed);
        }

        let key = category.to_lowercase();
        if let Some(logger) = self.loggers.get(&key) {
            return Ok(Arc::clone(logger.value()));
        }

        let logger = self
            .loggers
            .entry(key)
            .or_insert_with(|| {
                debug!(sink = S::ALIAS, category, "creating logger");
                Arc::new(Logger::new(category, Arc::clone(&self.sink), self.config.clone()))
            })
            .value()
            .clone();
        Ok(logger)
    }

    /// Snapshot of the configuration currently in use.
    pub fn current_config(&self) -> Arc<S::Config> {
        self.config.load()
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn logger_count(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Unsubscribe from configuration changes and drop cached loggers.
    /// Calling it again is a no-op.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
        self.loggers.clear();
        info!(sink = S::ALIAS, "logger provider disposed");
    }
}

impl<S: LogSink> Drop for LoggerProvider<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LogLevel, LogRecord};
    use std::thread;

    #[derive(Default)]
    struct Capture {
        records: Mutex<Vec<(String, u32)>>,
    }

    impl LogSink for Capture {
        type Config = u32;
        const ALIAS: &'static str = "Capture";

        fn write(&self, record: &LogRecord, config: &u32) -> Result<()> {
            self.records.lock().push((record.message.clone(), *config));
            Ok(())
        }
    }

    #[test]
    fn loggers_are_cached_case_insensitively() {
        let provider = LoggerProvider::with_config(Capture::default(), 1);
        let a = provider.get_logger("Orders.Api").unwrap();
        let b = provider.get_logger("orders.api").unwrap();
        let c = provider.get_logger("Billing").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.category(), "Orders.Api");
        assert_eq!(provider.logger_count(), 2);
    }

    #[test]
    fn concurrent_first_access_yields_one_logger() {
        let provider = Arc::new(LoggerProvider::with_config(Capture::default(), 1));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                thread::spawn(move || provider.get_logger("Shared").unwrap())
            })
            .collect();

        let loggers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(loggers.iter().all(|l| Arc::ptr_eq(l, &loggers[0])));
        assert_eq!(provider.logger_count(), 1);
    }

    #[test]
    fn published_change_reaches_cached_logger() {
        let channel = ConfigChannel::new(1u32);
        let provider = LoggerProvider::new(Capture::default(), &channel);
        let logger = provider.get_logger("Orders").unwrap();

        logger.log(LogLevel::Information, "before").unwrap();
        channel.publish(2);
        logger.log(LogLevel::Information, "after").unwrap();

        let records = provider.sink().records.lock();
        assert_eq!(records[0], ("before".to_string(), 1));
        assert_eq!(records[1], ("after".to_string(), 2));
    }

    #[test]
    fn dispose_is_idempotent_and_unsubscribes() {
        let channel = ConfigChannel::new(1u32);
        let provider = LoggerProvider::new(Capture::default(), &channel);
        provider.get_logger("Orders").unwrap();
        assert_eq!(channel.listener_count(), 1);

        provider.dispose();
        provider.dispose();

        assert!(provider.is_disposed());
        assert_eq!(provider.logger_count(), 0);
        assert_eq!(channel.listener_count(), 0);
        assert!(matches!(
            provider.get_logger("Orders"),
            Err(LogSinkError::ProviderDisposed)
        ));

        channel.publish(3);
        assert_eq!(*provider.current_config(), 1);
    }

    #[test]
    fn dropping_provider_unsubscribes() {
        let channel = ConfigChannel::new(1u32);
        {
            let _provider = LoggerProvider::new(Capture::default(), &channel);
            assert_eq!(channel.listener_count(), 1);
        }
        assert_eq!(channel.listener_count(), 0);
    }
}
