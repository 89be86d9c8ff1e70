use std::sync::Arc;

use tracing::{error, info, warn};
use log_sink_providers::{
    config::ConfigChannel,
    file::{FileSink, FileSinkConfig},
    init::init_tracing,
    LoggerProvider,
};

const RELOADED: &str = r#"{
  "Logging": {
    "TextFile": {
      "file_path": "logs",
      "file_name_format": "demo-%%Y%m%d%.log",
      "timestamp_format": "%H:%M:%S%.3f",
      "include_category": true,
      "format": "MultiLines"
    }
  }
}"#;

fn main() {
    // Defaults to ./logs/demo-<date>.log unless LOG_SINK_* variables say otherwise.
    let mut config = FileSinkConfig::from_env().expect("invalid LOG_SINK_* variables");
    if config.file_path.is_empty() {
        config.file_path = "logs".to_string();
    }
    if config.file_name_format.is_empty() {
        config.file_name_format = "demo-%%Y%m%d%.log".to_string();
    }

    let channel = ConfigChannel::new(config);
    let provider = Arc::new(LoggerProvider::new(FileSink::new(), &channel));
    init_tracing(Arc::clone(&provider)).expect("a global subscriber is already installed");

    info!("text file example started");
    warn!(event_id = 7, attempt = 3, "retrying upstream call");

    channel
        .reload_from_json::<FileSink>(RELOADED)
        .expect("invalid reload document");

    error!(order_id = 42, "order rejected after reload");

    let logger = provider.get_logger("demo").expect("provider disposed");
    logger
        .log(log_sink_providers::LogLevel::Information, "written without tracing")
        .expect("write failed");

    println!("wrote {} categories", provider.logger_count());
}
