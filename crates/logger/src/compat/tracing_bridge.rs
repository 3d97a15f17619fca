//! Bridge from tracing to pocs-logger

use crate::{Level, Logger, Record};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{Event, Subscriber, field::Visit};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// A tracing layer that forwards events to a [`Logger`]
///
/// Events emitted by the `pocs_logger*` crates themselves are dropped, so a
/// file logger reporting a rotation cannot end up logging into itself.
pub struct TracingBridge<S> {
    logger: Arc<dyn Logger>,
    _phantom: std::marker::PhantomData<S>,
}

impl<S> TracingBridge<S> {
    /// Create a new tracing bridge
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<S> Layer<S> for TracingBridge<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if super::is_own_target(metadata.target()) {
            return;
        }

        let level = map_level(*metadata.level());
        if !self.logger.is_enabled(level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut spans = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                spans.push(span.name());
            }
        }

        let message = if spans.is_empty() {
            visitor.finish()
        } else {
            format!("{}: {}", spans.join("::"), visitor.finish())
        };

        let mut record = Record::new(level, message).with_target(metadata.target());
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            record = record.with_location(file, line);
        }

        self.logger.log(&record);
    }
}

fn map_level(level: tracing::Level) -> Level {
    match level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warning,
        tracing::Level::INFO => Level::Info,
        tracing::Level::DEBUG | tracing::Level::TRACE => Level::Debug,
    }
}

/// Visitor to extract the message and fields from an event
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: impl std::fmt::Display) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(&mut self.fields, "{name}={value}");
    }

    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.push_field(field.name(), value);
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.push_field(field.name(), value);
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.push_field(field.name(), value);
    }
}

/// Initialize tracing to forward to pocs-logger
///
/// This sets up a global subscriber that captures all tracing events. The
/// `log` crate is left alone; see [`super::log_bridge`] for that.
pub fn init_tracing_bridge(logger: Arc<dyn Logger>) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::prelude::*;

    let subscriber = tracing_subscriber::registry().with(TracingBridge::new(logger));
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
