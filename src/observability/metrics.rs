//! Metrics Module
//!
//! Prometheus registry shared by every session of a process, and the
//! per-operation request counter and duration histogram.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::debug;

/// Failure to register or encode a collector
pub type MetricsError = prometheus::Error;

/// Label names of the operation metrics, in order
pub const OPERATION_LABELS: [&str; 2] = ["method", "status"];

/// Histogram buckets in seconds, from cache hits up to slow repository calls
pub const DURATION_BUCKETS: [f64; 11] = [
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

// == Metrics Registry ==
/// Process-wide registry, constructed once at startup and passed by clone.
///
/// Collectors are registered on first request; asking again for the same name
/// returns the collector registered the first time.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    registry: Registry,
    counters: Mutex<HashMap<String, IntCounterVec>>,
    histograms: Mutex<HashMap<String, HistogramVec>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counter vector `name`, registering it if absent.
    pub fn counter_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<IntCounterVec, MetricsError> {
        let mut counters = self.inner.counters.lock();
        if let Some(existing) = counters.get(name) {
            return Ok(existing.clone());
        }
        let counter = IntCounterVec::new(Opts::new(name, help), labels)?;
        self.inner.registry.register(Box::new(counter.clone()))?;
        counters.insert(name.to_string(), counter.clone());
        Ok(counter)
    }

    /// Returns the histogram vector `name`, registering it if absent.
    pub fn histogram_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
        buckets: &[f64],
    ) -> Result<HistogramVec, MetricsError> {
        let mut histograms = self.inner.histograms.lock();
        if let Some(existing) = histograms.get(name) {
            return Ok(existing.clone());
        }
        let histogram =
            HistogramVec::new(HistogramOpts::new(name, help).buckets(buckets.to_vec()), labels)?;
        self.inner.registry.register(Box::new(histogram.clone()))?;
        histograms.insert(name.to_string(), histogram.clone());
        Ok(histogram)
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        TextEncoder::new().encode_to_string(&self.inner.registry.gather())
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }
}

// == Operation Metrics ==
/// Request counter and duration histogram of one service, both labelled by
/// `(method, status)`.
#[derive(Clone)]
pub struct OperationMetrics {
    requests: IntCounterVec,
    duration: HistogramVec,
}

impl OperationMetrics {
    /// Registers (or looks up) `<service>_requests_total` and
    /// `<service>_request_duration_seconds`.
    pub fn register(registry: &MetricsRegistry, service: &str) -> Result<Self, MetricsError> {
        let prefix = metric_prefix(service);
        let requests = registry.counter_vec(
            &format!("{prefix}_requests_total"),
            &format!("Total number of {service} operations"),
            &OPERATION_LABELS,
        )?;
        let duration = registry.histogram_vec(
            &format!("{prefix}_request_duration_seconds"),
            &format!("Duration of {service} operations in seconds"),
            &OPERATION_LABELS,
            &DURATION_BUCKETS,
        )?;
        Ok(Self { requests, duration })
    }

    /// Counts one finished operation and observes its duration.
    pub fn observe(&self, method: &str, status: &str, elapsed: Duration) {
        let labels = [method, status];
        match self.duration.get_metric_with_label_values(&labels) {
            Ok(histogram) => histogram.observe(elapsed.as_secs_f64()),
            Err(e) => debug!(method, status, error = %e, "Duration sample dropped"),
        }
        match self.requests.get_metric_with_label_values(&labels) {
            Ok(counter) => counter.inc(),
            Err(e) => debug!(method, status, error = %e, "Request count dropped"),
        }
    }

    /// Current value of the request counter for `(method, status)`.
    pub fn request_count(&self, method: &str, status: &str) -> u64 {
        self.requests
            .get_metric_with_label_values(&[method, status])
            .map(|counter| counter.get())
            .unwrap_or_default()
    }

    /// Number of duration samples observed for `(method, status)`.
    pub fn duration_samples(&self, method: &str, status: &str) -> u64 {
        self.duration
            .get_metric_with_label_values(&[method, status])
            .map(|histogram| histogram.get_sample_count())
            .unwrap_or_default()
    }
}

/// Maps a service name onto the metric name alphabet `[a-zA-Z0-9_]`.
fn metric_prefix(service: &str) -> String {
    let prefix: String = service
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    match prefix.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => prefix,
        _ => format!("svc_{prefix}"),
    }
}
