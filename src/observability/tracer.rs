//! Tracer Module
//!
//! The span API sessions write into, with three implementations:
//! - [`TracingTracer`]: spans of the `tracing` crate, using the `otel.*` field
//!   names an OpenTelemetry layer understands
//! - [`MemoryTracer`]: keeps every span in memory for inspection
//! - [`NoopTracer`]: discards everything

use std::error::Error as StdError;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{display, Empty};

use crate::observability::{Field, Fields};

// == Span Status ==
/// Terminal status of a span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error(String),
}

impl SpanStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SpanStatus::Error(_))
    }
}

// == Span / Tracer Traits ==
/// An open span. Methods take `&self`; implementations are internally
/// synchronized.
pub trait Span: Send + Sync {
    fn add_event(&self, name: &str, fields: &[Field]);
    fn set_attributes(&self, fields: &[Field]);
    fn record_error(&self, error: &dyn StdError);
    fn set_status(&self, status: SpanStatus);
    /// Closes the span. Later calls are ignored by the `tracing` backend.
    fn end(&self);
    /// `tracing` span to instrument downstream futures with.
    fn context(&self) -> tracing::Span;
}

/// Span factory.
pub trait Tracer: Send + Sync {
    fn start_span(&self, name: &str, attributes: &[Field]) -> Box<dyn Span>;
}

// == Tracing Tracer ==
/// Tracer backed by the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTracer;

impl Tracer for TracingTracer {
    fn start_span(&self, name: &str, attributes: &[Field]) -> Box<dyn Span> {
        let span = tracing::info_span!(
            "operation",
            otel.name = name,
            method = name,
            attributes = %Fields(attributes),
            trace.id = Empty,
            exception.message = Empty,
            otel.status_code = Empty,
            otel.status_message = Empty,
        );
        Box::new(TracingSpan {
            span: Mutex::new(Some(span)),
            attributes: Mutex::new(attributes.to_vec()),
        })
    }
}

struct TracingSpan {
    /// `None` once ended
    span: Mutex<Option<tracing::Span>>,
    attributes: Mutex<Vec<Field>>,
}

impl TracingSpan {
    fn current(&self) -> Option<tracing::Span> {
        self.span.lock().clone()
    }
}

impl Span for TracingSpan {
    fn add_event(&self, name: &str, fields: &[Field]) {
        if let Some(span) = self.current() {
            tracing::trace!(parent: &span, event = name, fields = %Fields(fields), "span event");
        }
    }

    fn set_attributes(&self, fields: &[Field]) {
        let Some(span) = self.current() else {
            return;
        };
        let mut attributes = self.attributes.lock();
        for field in fields {
            // Only fields declared at span creation (e.g. trace.id) take effect
            span.record(field.key(), field.value());
            attributes.retain(|existing| existing.key() != field.key());
            attributes.push(field.clone());
        }
        span.record("attributes", display(Fields(&attributes)));
    }

    fn record_error(&self, error: &dyn StdError) {
        if let Some(span) = self.current() {
            span.record("exception.message", display(error));
        }
    }

    fn set_status(&self, status: SpanStatus) {
        let Some(span) = self.current() else {
            return;
        };
        match status {
            SpanStatus::Unset => {}
            SpanStatus::Ok => {
                span.record("otel.status_code", "OK");
            }
            SpanStatus::Error(message) => {
                span.record("otel.status_code", "ERROR");
                span.record("otel.status_message", message.as_str());
            }
        }
    }

    fn end(&self) {
        // Dropping the last handle closes the span
        self.span.lock().take();
    }

    fn context(&self) -> tracing::Span {
        self.current().unwrap_or_else(tracing::Span::none)
    }
}

// == Memory Tracer ==
/// Snapshot of a span recorded by [`MemoryTracer`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordedSpan {
    pub name: String,
    pub attributes: Vec<Field>,
    pub events: Vec<String>,
    pub errors: Vec<String>,
    pub status: SpanStatus,
    /// How many times `end` was called
    pub end_count: usize,
}

impl RecordedSpan {
    /// Latest value of attribute `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|field| field.key() == key)
            .map(Field::value)
    }

    pub fn is_ended(&self) -> bool {
        self.end_count > 0
    }
}

/// Tracer that records every span in memory.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct MemoryTracer {
    spans: Arc<Mutex<Vec<RecordedSpan>>>,
}

impl MemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All spans started so far, in start order.
    pub fn spans(&self) -> Vec<RecordedSpan> {
        self.spans.lock().clone()
    }

    pub fn spans_named(&self, name: &str) -> Vec<RecordedSpan> {
        self.spans
            .lock()
            .iter()
            .filter(|span| span.name == name)
            .cloned()
            .collect()
    }
}

impl Tracer for MemoryTracer {
    fn start_span(&self, name: &str, attributes: &[Field]) -> Box<dyn Span> {
        let mut spans = self.spans.lock();
        spans.push(RecordedSpan {
            name: name.to_string(),
            attributes: attributes.to_vec(),
            ..RecordedSpan::default()
        });
        Box::new(MemorySpan {
            index: spans.len() - 1,
            spans: Arc::clone(&self.spans),
            span: tracing::debug_span!("operation", otel.name = name),
        })
    }
}

struct MemorySpan {
    index: usize,
    spans: Arc<Mutex<Vec<RecordedSpan>>>,
    span: tracing::Span,
}

impl MemorySpan {
    fn update(&self, apply: impl FnOnce(&mut RecordedSpan)) {
        if let Some(recorded) = self.spans.lock().get_mut(self.index) {
            apply(recorded);
        }
    }
}

impl Span for MemorySpan {
    fn add_event(&self, name: &str, _fields: &[Field]) {
        self.update(|span| span.events.push(name.to_string()));
    }

    fn set_attributes(&self, fields: &[Field]) {
        self.update(|span| span.attributes.extend_from_slice(fields));
    }

    fn record_error(&self, error: &dyn StdError) {
        self.update(|span| span.errors.push(error.to_string()));
    }

    fn set_status(&self, status: SpanStatus) {
        self.update(|span| span.status = status);
    }

    fn end(&self) {
        self.update(|span| span.end_count += 1);
    }

    fn context(&self) -> tracing::Span {
        self.span.clone()
    }
}

// == Noop Tracer ==
/// Tracer used when no tracing backend is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn start_span(&self, _name: &str, _attributes: &[Field]) -> Box<dyn Span> {
        Box::new(NoopSpan)
    }
}

struct NoopSpan;

impl Span for NoopSpan {
    fn add_event(&self, _name: &str, _fields: &[Field]) {}
    fn set_attributes(&self, _fields: &[Field]) {}
    fn record_error(&self, _error: &dyn StdError) {}
    fn set_status(&self, _status: SpanStatus) {}
    fn end(&self) {}
    fn context(&self) -> tracing::Span {
        tracing::Span::none()
    }
}
