//! Custom tracing layer that renders log events through the
//! [`OutputCoordinator`].
//!
//! Every event from any thread is formatted into a single line and handed to
//! the coordinator, which decides whether to wrap it in clear sequences.

use crate::output::OutputCoordinator;
use chrono::SecondsFormat;
use std::fmt::Write as _;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// A tracing layer that writes every event to the terminal via the
/// coordinator.
pub struct TerminalLogLayer {
    coordinator: OutputCoordinator,
}

impl TerminalLogLayer {
    /// Create a new layer writing through `coordinator`.
    pub fn new(coordinator: OutputCoordinator) -> Self {
        Self { coordinator }
    }
}

impl<S> Layer<S> for TerminalLogLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        let record = format_record(
            &chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            metadata.level().as_str(),
            metadata.target(),
            &visitor.message,
            &visitor.fields,
        );
        self.coordinator.write_record(&record);
    }
}

/// Renders one log line: `timestamp LEVEL target: message key=value...`.
pub fn format_record(
    timestamp: &str,
    level: &str,
    target: &str,
    message: &str,
    fields: &[(String, String)],
) -> String {
    let mut line = format!("{timestamp} {level:>5} {target}: {message}");
    for (name, value) in fields {
        let _ = write!(line, " {name}={value}");
    }
    line
}

/// Field visitor that separates the message from the structured fields.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }
}
