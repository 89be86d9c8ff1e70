use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::provider::LoggerProvider;
use crate::record::{EventId, ExceptionInfo, LogLevel};
use crate::sink::LogSink;

/// Field name read as the event id of a `tracing` event.
pub const EVENT_ID_FIELD: &str = "event_id";

/// `tracing_subscriber` layer that routes events into a
/// [`LoggerProvider`], using the event target as the logger category.
///
/// Each event is written synchronously on the thread that emitted it.
/// Level gating is left to the subscriber's filters. Events emitted by
/// this crate itself are skipped so a sink's own diagnostics never loop
/// back into it.
pub struct SinkLayer<S: LogSink> {
    provider: Arc<LoggerProvider<S>>,
    /// Events written to the sink.
    pub written_events: Arc<AtomicU64>,
    /// Events whose write failed; the error is reported on stderr.
    pub failed_events: Arc<AtomicU64>,
}

impl<S: LogSink> SinkLayer<S> {
    pub fn new(provider: Arc<LoggerProvider<S>>) -> Self {
        Self {
            provider,
            written_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Map a `tracing` level onto the sink severity scale.
pub fn map_level(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Information,
        Level::WARN => LogLevel::Warning,
        Level::ERROR => LogLevel::Error,
    }
}

fn is_own_event(target: &str) -> bool {
    target == env!("CARGO_CRATE_NAME") || target.starts_with(concat!(env!("CARGO_CRATE_NAME"), "::"))
}

impl<S, Sub> Layer<Sub> for SinkLayer<S>
where
    S: LogSink,
    Sub: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, Sub>) {
        let meta = event.metadata();
        if is_own_event(meta.target()) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: None,
            exception: None,
            event_id: EventId::default(),
        };
        event.record(&mut visitor);
        let FieldVisitor {
            message,
            exception,
            event_id,
            ..
        } = visitor;

        let message = render_message(message.unwrap_or_default(), &fields);
        let result = self
            .provider
            .get_logger(meta.target())
            .and_then(|logger| logger.write_captured(map_level(meta.level()), event_id, message, exception));

        match result {
            Ok(()) => {
                self.written_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("error writing log record: {}", e);
            }
        }
    }
}

/// Append structured fields to the message as `key=value` pairs.
fn render_message(mut message: String, fields: &BTreeMap<String, serde_json::Value>) -> String {
    for (key, value) in fields {
        if !message.is_empty() {
            message.push(' ');
        }
        let _ = match value {
            serde_json::Value::String(s) => write!(message, "{}={}", key, s),
            other => write!(message, "{}={}", key, other),
        };
    }
    message
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: Option<String>,
    pub exception: Option<ExceptionInfo>,
    pub event_id: EventId,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == EVENT_ID_FIELD {
            if let Ok(id) = i32::try_from(value) {
                self.event_id = EventId(id);
                return;
            }
        }
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == EVENT_ID_FIELD {
            if let Ok(id) = i32::try_from(value) {
                self.event_id = EventId(id);
                return;
            }
        }
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if self.exception.is_none() {
            self.exception = Some(ExceptionInfo::capture(value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
