//! Observability Module
//!
//! Correlated tracing, metrics and structured logging around one logical
//! operation.

mod fields;
mod logging;
mod metrics;
mod session;
mod tracer;

pub use fields::{Field, Fields};
pub use logging::{build_subscriber, init_tracing, DEFAULT_FILTER};
pub use metrics::{MetricsError, MetricsRegistry, OperationMetrics, DURATION_BUCKETS, OPERATION_LABELS};
pub use session::{cancelled_status, Session, Telemetry, STATUS_SUCCESS};
pub use tracer::{
    MemoryTracer, NoopTracer, RecordedSpan, Span, SpanStatus, Tracer, TracingTracer,
};
