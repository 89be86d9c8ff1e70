//! Live configuration: a change-notification source, the swappable handle
//! loggers read from, and JSON section loading.

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::error::{LogSinkError, Result};
use crate::sink::LogSink;

/// Top-level key under which sink sections live in a JSON document.
pub const ROOT_SECTION: &str = "Logging";

type Listener<C> = Arc<dyn Fn(Arc<C>) + Send + Sync>;

/// Shared reference to the configuration currently in use.
///
/// Updates replace the whole snapshot; readers get either the previous or
/// the new one, never a mix.
pub struct ConfigHandle<C> {
    current: Arc<RwLock<Arc<C>>>,
}

impl<C> ConfigHandle<C> {
    pub fn new(initial: Arc<C>) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn load(&self) -> Arc<C> {
        Arc::clone(&self.current.read())
    }

    pub fn store(&self, updated: Arc<C>) {
        *self.current.write() = updated;
    }
}

impl<C> Clone for ConfigHandle<C> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

/// Keeps a change listener registered; dropping it unsubscribes.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct ChangeSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ChangeSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Subscription for sources that never change.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

/// Source of configuration snapshots and change notifications.
pub trait ConfigSource<C>: Send + Sync {
    fn current(&self) -> Arc<C>;

    /// Register `listener`, called with every new snapshot until the
    /// returned subscription is dropped.
    fn on_change(&self, listener: Box<dyn Fn(Arc<C>) + Send + Sync>) -> ChangeSubscription;
}

/// In-process [`ConfigSource`]: holds the current snapshot and fans every
/// published update out to the registered listeners.
pub struct ConfigChannel<C> {
    current: RwLock<Arc<C>>,
    listeners: Arc<Mutex<BTreeMap<u64, Listener<C>>>>,
    next_id: AtomicU64,
}

impl<C: Send + Sync + 'static> ConfigChannel<C> {
    pub fn new(initial: C) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            listeners: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Replace the current snapshot and notify listeners.
    pub fn publish(&self, updated: C) {
        let updated = Arc::new(updated);
        *self.current.write() = Arc::clone(&updated);

        let listeners: Vec<Listener<C>> = self.listeners.lock().values().cloned().collect();
        debug!(listeners = listeners.len(), "publishing configuration change");
        for listener in listeners {
            listener(Arc::clone(&updated));
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl<C: DeserializeOwned + Send + Sync + 'static> ConfigChannel<C> {
    /// Parse the section for sink `S` out of `json` and publish it.
    pub fn reload_from_json<S>(&self, json: &str) -> Result<()>
    where
        S: LogSink<Config = C>,
    {
        let updated = load_section::<S>(json)?;
        self.publish(updated);
        Ok(())
    }
}

impl<C: Send + Sync + 'static> ConfigSource<C> for ConfigChannel<C> {
    fn current(&self) -> Arc<C> {
        Arc::clone(&self.current.read())
    }

    fn on_change(&self, listener: Box<dyn Fn(Arc<C>) + Send + Sync>) -> ChangeSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, Arc::from(listener));

        let registry: Weak<Mutex<BTreeMap<u64, Listener<C>>>> = Arc::downgrade(&self.listeners);
        ChangeSubscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().remove(&id);
            }
        })
    }
}

impl<C, T> ConfigSource<C> for Arc<T>
where
    T: ConfigSource<C> + ?Sized,
{
    fn current(&self) -> Arc<C> {
        (**self).current()
    }

    fn on_change(&self, listener: Box<dyn Fn(Arc<C>) + Send + Sync>) -> ChangeSubscription {
        (**self).on_change(listener)
    }
}

/// Read the `Logging.<alias>` section for sink `S` from a JSON document.
///
/// A missing section yields the sink's default configuration.
pub fn load_section<S>(json: &str) -> Result<S::Config>
where
    S: LogSink,
    S::Config: DeserializeOwned,
{
    let document: serde_json::Value = serde_json::from_str(json)?;
    let section = document
        .get(ROOT_SECTION)
        .and_then(|logging| logging.get(S::ALIAS))
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

    serde_json::from_value(section).map_err(|e| {
        LogSinkError::config(format!("section {}.{}: {}", ROOT_SECTION, S::ALIAS, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{FileSink, FileSinkConfig};
    use crate::format::TextFormat;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn listeners_receive_updates_until_unsubscribed() {
        let channel = ConfigChannel::new(1u32);
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let subscription = channel.on_change(Box::new(move |v| {
            counter.store(*v as usize, Ordering::SeqCst);
        }));

        channel.publish(5);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
        assert_eq!(*channel.current(), 5);

        subscription.unsubscribe();
        assert_eq!(channel.listener_count(), 0);
        channel.publish(9);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn handle_swaps_whole_snapshot() {
        let handle = ConfigHandle::new(Arc::new(String::from("old")));
        let reader = handle.clone();
        let before = reader.load();

        handle.store(Arc::new(String::from("new")));
        assert_eq!(before.as_str(), "old");
        assert_eq!(reader.load().as_str(), "new");
    }

    #[test]
    fn loads_text_file_section() {
        let json = r#"{
            "Logging": {
                "TextFile": {
                    "file_path": "logs",
                    "file_name_format": "app-%%Y%m%d%.log",
                    "timestamp_format": "%H:%M:%S",
                    "include_category": true,
                    "format": "MultiLines"
                }
            }
        }"#;

        let config = load_section::<FileSink>(json).unwrap();
        assert_eq!(config.file_path, "logs");
        assert_eq!(config.format, TextFormat::MultiLines);
        assert!(config.include_category);
        assert!(!config.use_local_path);
    }

    #[test]
    fn missing_section_yields_default() {
        let config = load_section::<FileSink>("{}").unwrap();
        assert_eq!(config, FileSinkConfig::default());
    }

    #[test]
    fn malformed_section_is_a_configuration_error() {
        let json = r#"{ "Logging": { "TextFile": { "include_category": "yes" } } }"#;
        assert!(matches!(
            load_section::<FileSink>(json),
            Err(LogSinkError::Configuration(_))
        ));
    }
}
