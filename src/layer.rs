use crate::global;
use crate::logger::Logger;
use crate::record::{Caller, Fields, Level, LogRecord, Value};
use crate::remote;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns `tracing` events into
/// [`LogRecord`]s and routes them through a [`Logger`], so
/// `tracing::warn!(url = "http://x", "ping")` ends up in the same file and
/// remote stream as the facade functions.
///
/// Event fields become record fields; the `message` field becomes the
/// record message. Events raised on a remote client's worker threads are
/// ignored, since they describe the delivery of records already logged.
pub struct FanoutLayer {
    logger: Option<Arc<Logger>>,
}

impl FanoutLayer {
    /// Route to a fixed logger instance.
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    /// Route to whatever [`global::current`] returns at event time, so
    /// re-initialization is picked up without reinstalling the layer.
    pub fn global() -> Self {
        Self { logger: None }
    }
}

impl<S> Layer<S> for FanoutLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if remote::is_delivery_thread() {
            return;
        }

        let logger = match &self.logger {
            Some(logger) => Arc::clone(logger),
            None => match global::current() {
                Some(logger) => logger,
                None => return,
            },
        };

        let meta = event.metadata();
        let level = Level::from(meta.level());
        if !logger.enabled(level) {
            return;
        }

        let mut fields = Fields::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let mut record = LogRecord::new(level, message.unwrap_or_default()).with_fields(fields);
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            record = record.with_caller(Caller::new(file, line));
        }
        logger.log_record(record);
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), Value::String(format!("{:?}", value)));
        }
    }
}
