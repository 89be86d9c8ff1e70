use std::sync::Arc;

use tracing::{error, info};
use log_sink_providers::{
    init::{init_tracing_with_config, LayerConfig},
    relational::{RelationalSink, RelationalSinkConfig},
    sqlite::SqliteUnitOfWorkFactory,
    Fault, LogLevel, LoggerProvider,
};

fn main() {
    // Example source: ./logs/app.db. The log table is created on first write.
    let mut config = RelationalSinkConfig::from_env().expect("invalid LOG_SINK_* variables");
    if config.source.is_none() {
        config.source = Some("logs/app.db".to_string());
        config.ensure_table_created = true;
    }
    let source = config.source.clone().unwrap_or_default();

    let factory = Arc::new(SqliteUnitOfWorkFactory::new());
    let sink = RelationalSink::new(Arc::clone(&factory));
    let provider = Arc::new(LoggerProvider::with_config(sink, config));

    init_tracing_with_config(
        Arc::clone(&provider),
        LayerConfig {
            enable_stdout: true,
            ..Default::default()
        },
    )
    .expect("a global subscriber is already installed");

    info!("sqlite backend example started");
    error!(error_code = 123, "simulated error sent via the relational sink");

    let fault = Fault::new("connection reset")
        .with_source("payments")
        .caused_by(Fault::new("socket closed"));
    provider
        .get_logger("Payments")
        .expect("provider disposed")
        .log_fault(LogLevel::Critical, "charge failed", &fault)
        .expect("write failed");

    let rows: i64 = factory
        .with_connection(&source, |conn| {
            conn.query_row("SELECT COUNT(*) FROM log_message_entry", [], |r| r.get(0))
        })
        .expect("count failed");
    println!("{} rows in log_message_entry", rows);
}
