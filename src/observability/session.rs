//! Observability Session Module
//!
//! One [`Session`] per logical operation ties together its span, its metric
//! samples and its log lines.
//!
//! # Lifecycle
//! 1. [`Telemetry::start`] opens the span, emits the start event and log line,
//!    and captures the start instant
//! 2. The operation reports at most one outcome through
//!    [`Session::log_success`] / [`Session::log_error`] / [`Session::fail`]
//! 3. The session is finalized exactly once, by [`Session::end`] or by `Drop`
//!    on early return: duration histogram, request counter, terminal span
//!    status, span end
//!
//! A session dropped before any outcome was reported belongs to a cancelled
//! operation (client gone, deadline hit) and is recorded as
//! `cancelled_<method>`, never as a success.

use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::observability::{Field, Fields, OperationMetrics, Span, SpanStatus, Tracer};

/// Status label of an operation that did not fail
pub const STATUS_SUCCESS: &str = "success";

/// Status label of an operation abandoned before it reported an outcome.
pub fn cancelled_status(method: &str) -> String {
    format!("cancelled_{method}")
}

// == Telemetry ==
/// Per-service session factory: a tracer plus the service's operation metrics.
#[derive(Clone)]
pub struct Telemetry {
    tracer: Arc<dyn Tracer>,
    metrics: OperationMetrics,
}

impl Telemetry {
    pub fn new(tracer: Arc<dyn Tracer>, metrics: OperationMetrics) -> Self {
        Self { tracer, metrics }
    }

    // == Start ==
    /// Starts the session of operation `method`.
    ///
    /// Never fails and never blocks: span creation and metric recording are
    /// in-process.
    pub fn start(&self, method: &'static str, attributes: &[Field]) -> Session {
        let span = self.tracer.start_span(method, attributes);
        span.add_event(&format!("Starting {method}"), attributes);
        debug!(method, fields = %Fields(attributes), "Starting {method}");

        Session {
            method,
            span,
            metrics: self.metrics.clone(),
            started: Instant::now(),
            status: STATUS_SUCCESS.to_string(),
            reported: AtomicBool::new(false),
            finished: false,
        }
    }

    pub fn metrics(&self) -> &OperationMetrics {
        &self.metrics
    }
}

// == Session ==
/// Bookkeeping of one running operation.
///
/// Owned by the task running the operation; the status lives in the session
/// itself, so concurrent operations never share a status cell.
pub struct Session {
    method: &'static str,
    span: Box<dyn Span>,
    metrics: OperationMetrics,
    started: Instant,
    status: String,
    /// Set once the operation reported success or failure
    reported: AtomicBool,
    finished: bool,
}

impl Session {
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Current status label; `"success"` until a failure is recorded.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn span(&self) -> &dyn Span {
        self.span.as_ref()
    }

    /// Span to instrument downstream futures with, e.g.
    /// `repository.find(id).instrument(session.context())`.
    pub fn context(&self) -> tracing::Span {
        self.span.context()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    // == Success ==
    /// Records a success event on the span and an info log line. The status
    /// stays `"success"`.
    pub fn log_success(&self, message: &str, fields: &[Field]) {
        self.reported.store(true, Ordering::Relaxed);
        self.span.add_event(message, fields);
        info!(method = self.method, fields = %Fields(fields), "{message}");
    }

    // == Error ==
    /// Marks the session failed with `status`, records `error` on the span,
    /// sets the span status to error and logs at error level.
    pub fn log_error(
        &mut self,
        status: impl Into<String>,
        error: &dyn StdError,
        message: &str,
        fields: &[Field],
    ) {
        self.status = status.into();
        self.reported.store(true, Ordering::Relaxed);
        self.span.record_error(error);
        self.span.set_status(SpanStatus::Error(message.to_string()));
        error!(
            method = self.method,
            status = %self.status,
            error = %error,
            fields = %Fields(fields),
            "{message}"
        );
    }

    /// Overwrites the status label without touching span or logs.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.reported.store(true, Ordering::Relaxed);
    }

    // == End ==
    /// Finalizes the session. Ending without a reported outcome counts as a
    /// success; dropping without one counts as a cancellation.
    pub fn end(mut self) {
        self.reported.store(true, Ordering::Relaxed);
        self.finish();
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if !self.reported.load(Ordering::Relaxed) {
            self.status = cancelled_status(self.method);
            warn!(method = self.method, "{} dropped before completion", self.method);
        }

        let elapsed = self.started.elapsed();
        self.metrics.observe(self.method, &self.status, elapsed);

        if self.status == STATUS_SUCCESS {
            self.span.set_status(SpanStatus::Ok);
        } else {
            self.span.set_status(SpanStatus::Error(self.status.clone()));
        }
        self.span.end();

        debug!(
            method = self.method,
            status = %self.status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Finished {}",
            self.method
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{MemoryTracer, MetricsRegistry, NoopTracer};
    use std::io;

    fn telemetry() -> (MemoryTracer, Telemetry) {
        let tracer = MemoryTracer::new();
        let metrics = OperationMetrics::register(&MetricsRegistry::new(), "test").unwrap();
        (tracer.clone(), Telemetry::new(Arc::new(tracer), metrics))
    }

    #[test]
    fn test_start_opens_span_with_attributes() {
        let (tracer, telemetry) = telemetry();
        let session = telemetry.start("FindById", &[Field::new("saldo.id", 42)]);

        assert_eq!(session.method(), "FindById");
        assert_eq!(session.status(), STATUS_SUCCESS);

        let spans = tracer.spans_named("FindById");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].attribute("saldo.id"), Some("42"));
        assert_eq!(spans[0].events, vec!["Starting FindById".to_string()]);
        assert!(!spans[0].is_ended());
    }

    #[test]
    fn test_end_records_success_once() {
        let (tracer, telemetry) = telemetry();
        let session = telemetry.start("FindById", &[]);
        session.log_success("Found saldo", &[]);
        session.end();

        assert_eq!(telemetry.metrics().request_count("FindById", "success"), 1);
        assert_eq!(telemetry.metrics().duration_samples("FindById", "success"), 1);

        let span = &tracer.spans_named("FindById")[0];
        assert_eq!(span.status, SpanStatus::Ok);
        assert_eq!(span.end_count, 1);
        assert_eq!(
            span.events,
            vec!["Starting FindById".to_string(), "Found saldo".to_string()]
        );
    }

    #[test]
    fn test_drop_finalizes_on_early_return() {
        let (tracer, telemetry) = telemetry();

        fn early_return(telemetry: &Telemetry) -> Option<u8> {
            let session = telemetry.start("FindAll", &[]);
            session.log_success("Fetched from cache", &[]);
            let cached: Option<u8> = None;
            cached?;
            Some(1)
        }
        assert_eq!(early_return(&telemetry), None);

        assert_eq!(telemetry.metrics().request_count("FindAll", "success"), 1);
        assert_eq!(tracer.spans_named("FindAll")[0].end_count, 1);
    }

    #[test]
    fn test_drop_without_outcome_is_cancelled() {
        let (tracer, telemetry) = telemetry();

        drop(telemetry.start("FindById", &[]));

        let metrics = telemetry.metrics();
        assert_eq!(metrics.request_count("FindById", "success"), 0);
        assert_eq!(metrics.request_count("FindById", "cancelled_FindById"), 1);

        let span = &tracer.spans_named("FindById")[0];
        assert_eq!(
            span.status,
            SpanStatus::Error("cancelled_FindById".to_string())
        );
        assert_eq!(span.end_count, 1);
    }

    #[tokio::test]
    async fn test_timed_out_future_is_cancelled() {
        let (_, telemetry) = telemetry();

        let operation = async {
            let session = telemetry.start("FindAll", &[]);
            tokio::time::sleep(Duration::from_secs(10)).await;
            session.log_success("Fetched saldos", &[]);
        };
        let result = tokio::time::timeout(Duration::from_millis(20), operation).await;

        assert!(result.is_err());
        let metrics = telemetry.metrics();
        assert_eq!(metrics.request_count("FindAll", "success"), 0);
        assert_eq!(metrics.request_count("FindAll", "cancelled_FindAll"), 1);
    }

    #[test]
    fn test_log_error_sets_status_and_span() {
        let (tracer, telemetry) = telemetry();
        let mut session = telemetry.start("FindById", &[]);
        let err = io::Error::new(io::ErrorKind::Other, "connection reset");

        session.log_error("repository_error_FindById", &err, "Repository error", &[]);
        assert_eq!(session.status(), "repository_error_FindById");
        session.end();

        let metrics = telemetry.metrics();
        assert_eq!(metrics.request_count("FindById", "repository_error_FindById"), 1);
        assert_eq!(metrics.request_count("FindById", "success"), 0);

        let span = &tracer.spans_named("FindById")[0];
        assert_eq!(span.errors, vec!["connection reset".to_string()]);
        assert_eq!(
            span.status,
            SpanStatus::Error("repository_error_FindById".to_string())
        );
        assert_eq!(span.end_count, 1);
    }

    #[test]
    fn test_concurrent_sessions_keep_their_own_status() {
        let (_, telemetry) = telemetry();
        let mut failing = telemetry.start("FindById", &[]);
        let succeeding = telemetry.start("FindById", &[]);

        failing.set_status("repository_error_FindById");
        succeeding.end();
        failing.end();

        let metrics = telemetry.metrics();
        assert_eq!(metrics.request_count("FindById", "success"), 1);
        assert_eq!(metrics.request_count("FindById", "repository_error_FindById"), 1);
    }

    #[test]
    fn test_noop_tracer_still_records_metrics() {
        let metrics = OperationMetrics::register(&MetricsRegistry::new(), "test").unwrap();
        let telemetry = Telemetry::new(Arc::new(NoopTracer), metrics);

        telemetry.start("FindById", &[]).end();

        assert_eq!(telemetry.metrics().request_count("FindById", "success"), 1);
    }
}
