//! Observability infrastructure for the metrics engine
//!
//! Provides:
//! - Prometheus metrics (cache hit ratio, aggregation throughput, report counts)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for operation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    operation_latency_seconds: HistogramVec,
    cache_hits: IntCounterVec,
    cache_misses: IntCounterVec,
    aggregation_records_written: IntCounter,
    reports_generated: IntCounterVec,
    storage_errors: IntCounter,
    scheduled_report_failures: IntCounterVec,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            operation_latency_seconds: register_histogram_vec!(
                "metricflow_operation_latency_seconds",
                "Time spent in engine operations including storage calls",
                &["operation"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register operation_latency_seconds"),

            cache_hits: register_int_counter_vec!(
                "metricflow_cache_hits_total",
                "Analytics results served from the result cache",
                &["cache"]
            )
            .expect("Failed to register cache_hits"),

            cache_misses: register_int_counter_vec!(
                "metricflow_cache_misses_total",
                "Analytics results recomputed after a cache miss",
                &["cache"]
            )
            .expect("Failed to register cache_misses"),

            aggregation_records_written: register_int_counter!(
                "metricflow_aggregation_records_written_total",
                "Aggregation records handed to storage"
            )
            .expect("Failed to register aggregation_records_written"),

            reports_generated: register_int_counter_vec!(
                "metricflow_reports_generated_total",
                "Reports generated by output format",
                &["format"]
            )
            .expect("Failed to register reports_generated"),

            storage_errors: register_int_counter!(
                "metricflow_storage_errors_total",
                "Storage operations that failed"
            )
            .expect("Failed to register storage_errors"),

            scheduled_report_failures: register_int_counter_vec!(
                "metricflow_scheduled_report_failures_total",
                "Scheduled report passes that failed",
                &["kind"]
            )
            .expect("Failed to register scheduled_report_failures"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying collectors.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_latency(&self, operation: &str, duration_secs: f64) {
        self.inner()
            .operation_latency_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn inc_cache_hit(&self, cache: &str) {
        self.inner().cache_hits.with_label_values(&[cache]).inc();
    }

    pub fn inc_cache_miss(&self, cache: &str) {
        self.inner().cache_misses.with_label_values(&[cache]).inc();
    }

    pub fn add_aggregation_records(&self, count: u64) {
        self.inner().aggregation_records_written.inc_by(count);
    }

    pub fn inc_reports_generated(&self, format: &str) {
        self.inner()
            .reports_generated
            .with_label_values(&[format])
            .inc();
    }

    pub fn inc_storage_errors(&self) {
        self.inner().storage_errors.inc();
    }

    pub fn inc_scheduled_report_failures(&self, kind: &str) {
        self.inner()
            .scheduled_report_failures
            .with_label_values(&[kind])
            .inc();
    }

    /// Render every registered collector in the Prometheus text format
    pub fn encode_text(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for pipeline events
///
/// Emits consistent event-tagged lines for report generation, aggregation
/// batches and daemon lifecycle.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log an aggregation batch written for one metric
    pub fn log_aggregations_written(&self, metric_id: &str, granularity: &str, records: usize) {
        info!(
            event = "aggregations_written",
            instance = %self.instance,
            metric_id = %metric_id,
            granularity = %granularity,
            records = records,
            "Aggregation batch persisted"
        );
    }

    /// Log a generated report
    pub fn log_report_generated(&self, kind: &str, format: &str, metrics: usize, bytes: usize) {
        info!(
            event = "report_generated",
            instance = %self.instance,
            kind = %kind,
            format = %format,
            metrics = metrics,
            bytes = bytes,
            "Report generated"
        );
    }

    /// Log a scheduled report pass that failed
    pub fn log_report_failed(&self, kind: &str, error: &str) {
        warn!(
            event = "scheduled_report_failed",
            instance = %self.instance,
            kind = %kind,
            error = %error,
            "Scheduled report pass failed"
        );
    }

    pub fn log_startup(&self, version: &str, metrics: usize) {
        info!(
            event = "daemon_started",
            instance = %self.instance,
            version = %version,
            metrics = metrics,
            "Report daemon started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "daemon_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Report daemon shutting down"
        );
    }
}
