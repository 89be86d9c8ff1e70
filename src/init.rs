use crate::layer::SinkLayer;
use crate::provider::LoggerProvider;
use crate::sink::LogSink;
use std::sync::Arc;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::Registry;

/// Settings for installing a [`SinkLayer`] as the global subscriber.
///
/// **Fields**
/// - `max_level`: most verbose level forwarded to the sink. This is the
///   facade-side gate; the logger itself only drops `None`.
/// - `enable_stdout`: additionally print events through
///   `tracing_subscriber::fmt`.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub max_level: LevelFilter,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            max_level: LevelFilter::INFO,
            enable_stdout: false,
        }
    }
}

/// Install a [`Registry`] with a [`SinkLayer`] for `provider` as the
/// global default subscriber.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_tracing_with_config<S: LogSink>(
    provider: Arc<LoggerProvider<S>>,
    config: LayerConfig,
) -> Result<(), SetGlobalDefaultError> {
    let layer = SinkLayer::new(provider).with_filter(config.max_level);

    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer().with_filter(config.max_level);
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Equivalent to [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing<S: LogSink>(provider: Arc<LoggerProvider<S>>) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(provider, LayerConfig::default())
}
