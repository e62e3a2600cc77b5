//! Public entry points of the metrics core
//!
//! `MetricsEngine` validates caller input, reads through a `MetricStore`,
//! runs the synchronous bucketing and statistics once a series is
//! materialized, and memoizes analytics results in TTL caches.

use crate::aggregation::{aggregate_all, IntervalBucketer};
use crate::analytics::{analyze_trend, pearson, unordered_pairs, CorrelationMatrix};
use crate::cache::{ResultCache, DEFAULT_CACHE_TTL};
use crate::error::{MetricsError, Result};
use crate::granularity::Granularity;
use crate::models::{
    DataPoint, MetricDefinition, NewDataPoint, NewMetricDefinition, TimeWindow, TrendResult,
};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::report::{render, MetricReport, MetricSummary, Report, ReportFormat, ReportPayload};
use crate::storage::{MetricStore, StorageResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Granularity at which report trends are always computed
pub const REPORT_TREND_GRANULARITY: &str = "1h";

/// Default interval of the proactive cache sweep (5 minutes)
pub const DEFAULT_CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time-to-live of cached trend and correlation results
    pub cache_ttl: Duration,
    /// Granularity label used for report trends
    pub report_granularity: String,
    /// How often background sweepers purge expired cache entries
    pub cache_sweep_interval: Duration,
    /// Name attached to structured log events
    pub instance_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            report_granularity: REPORT_TREND_GRANULARITY.to_string(),
            cache_sweep_interval: DEFAULT_CACHE_SWEEP_INTERVAL,
            instance_name: "metricflow".to_string(),
        }
    }
}

pub struct MetricsEngine {
    store: Arc<dyn MetricStore>,
    config: EngineConfig,
    trend_cache: Arc<ResultCache<TrendResult>>,
    correlation_cache: Arc<ResultCache<CorrelationMatrix>>,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl MetricsEngine {
    pub fn new(store: Arc<dyn MetricStore>, config: EngineConfig) -> Self {
        Self {
            store,
            trend_cache: Arc::new(ResultCache::new("trends", config.cache_ttl)),
            correlation_cache: Arc::new(ResultCache::new("correlations", config.cache_ttl)),
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new(config.instance_name.clone()),
            config,
        }
    }

    pub fn with_defaults(store: Arc<dyn MetricStore>) -> Self {
        Self::new(store, EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MetricStore> {
        &self.store
    }

    pub fn trend_cache(&self) -> &Arc<ResultCache<TrendResult>> {
        &self.trend_cache
    }

    pub fn correlation_cache(&self) -> &Arc<ResultCache<CorrelationMatrix>> {
        &self.correlation_cache
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    fn storage<T>(&self, result: StorageResult<T>) -> Result<T> {
        result.map_err(|e| {
            self.metrics.inc_storage_errors();
            MetricsError::from(e)
        })
    }

    // ---- ingestion -------------------------------------------------------

    /// Validate and persist a new metric definition
    pub async fn register_metric(&self, input: NewMetricDefinition) -> Result<MetricDefinition> {
        let definition = input.validate()?;
        self.storage(self.store.insert_definition(definition.clone()).await)?;
        info!(metric_id = %definition.id, name = %definition.name, "Registered metric");
        Ok(definition)
    }

    /// Validate and append data points; the batch is rejected as a whole
    pub async fn record_data_points(&self, inputs: Vec<NewDataPoint>) -> Result<usize> {
        let points = inputs
            .into_iter()
            .map(NewDataPoint::validate)
            .collect::<Result<Vec<_>>>()?;
        let count = points.len();
        self.storage(self.store.insert_data_points(points).await)?;
        debug!(count, "Recorded data points");
        Ok(count)
    }

    pub async fn record_data_point(&self, input: NewDataPoint) -> Result<()> {
        self.record_data_points(vec![input]).await.map(|_| ())
    }

    /// Raw series for a metric within the inclusive window
    pub async fn series(
        &self,
        metric_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>> {
        let window = TimeWindow::new(start, end)?;
        self.storage(
            self.store
                .list_data_points(metric_id, window.start, window.end)
                .await,
        )
    }

    pub async fn list_metrics(&self) -> Result<Vec<MetricDefinition>> {
        self.storage(self.store.list_definitions().await)
    }

    pub async fn search_metrics(&self, query: &str) -> Result<Vec<MetricDefinition>> {
        self.storage(self.store.search_definitions(query).await)
    }

    // ---- aggregation -----------------------------------------------------

    /// Bucket a metric's series over the window and persist one aggregation
    /// record per bucket in a single batch
    ///
    /// Returns the number of records written. An empty series writes
    /// nothing. A storage failure leaves no records from this call behind.
    pub async fn process_bucket_range(
        &self,
        metric_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: &str,
    ) -> Result<usize> {
        let timer = Instant::now();
        let window = TimeWindow::new(start, end)?;
        let granularity = Granularity::parse(granularity)?;
        self.require_definitions(&[metric_id.to_string()]).await?;

        let points = self.storage(
            self.store
                .list_data_points(metric_id, window.start, window.end)
                .await,
        )?;
        let buckets = IntervalBucketer::new(&granularity).split(&points);
        let records = aggregate_all(&buckets);
        let written = records.len();

        if written > 0 {
            self.storage(self.store.insert_aggregations(records).await)?;
            self.metrics.add_aggregation_records(written as u64);
        }

        self.logger
            .log_aggregations_written(metric_id, granularity.label(), written);
        self.metrics
            .observe_latency("process_bucket_range", timer.elapsed().as_secs_f64());
        debug!(
            metric_id = %metric_id,
            points = points.len(),
            buckets = written,
            "Processed bucket range"
        );
        Ok(written)
    }

    // ---- analytics -------------------------------------------------------

    /// Trend over stored aggregations carrying the given granularity label
    ///
    /// The label is matched as written on the records, so zero-length
    /// spans such as "0m" are valid.
    pub async fn get_trend(
        &self,
        metric_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: &str,
    ) -> Result<TrendResult> {
        let timer = Instant::now();
        let window = TimeWindow::new(start, end)?;
        let granularity = Granularity::parse_label(granularity)?;

        let key = trend_cache_key(metric_id, &window, granularity.label());
        if let Some(hit) = self.trend_cache.get(&key) {
            self.metrics.inc_cache_hit(self.trend_cache.name());
            return Ok(hit);
        }
        self.metrics.inc_cache_miss(self.trend_cache.name());

        let records = self.storage(
            self.store
                .list_aggregations(
                    metric_id,
                    Some(granularity.label()),
                    window.start,
                    window.end,
                )
                .await,
        )?;
        let result = analyze_trend(&records);
        self.trend_cache.insert(key, result);

        self.metrics
            .observe_latency("get_trend", timer.elapsed().as_secs_f64());
        debug!(
            metric_id = %metric_id,
            records = records.len(),
            trend = %result.trend,
            "Computed trend"
        );
        Ok(result)
    }

    /// Pearson coefficients for every unordered pair of distinct metrics
    pub async fn get_correlations(
        &self,
        metric_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CorrelationMatrix> {
        let timer = Instant::now();
        let ids = normalize_ids(metric_ids)?;
        let window = TimeWindow::new(start, end)?;

        let key = correlation_cache_key(&ids, &window);
        if let Some(hit) = self.correlation_cache.get(&key) {
            self.metrics.inc_cache_hit(self.correlation_cache.name());
            return Ok(hit);
        }
        self.metrics.inc_cache_miss(self.correlation_cache.name());

        let mut matrix = CorrelationMatrix::new();
        for pair in unordered_pairs(&ids) {
            let (a, b) = tokio::try_join!(
                self.store
                    .list_data_points(pair.first(), window.start, window.end),
                self.store
                    .list_data_points(pair.second(), window.start, window.end),
            )
            .map_err(|e| {
                self.metrics.inc_storage_errors();
                MetricsError::from(e)
            })?;

            let coefficient = pearson(&values(&a), &values(&b));
            debug!(
                a = %pair.first(),
                b = %pair.second(),
                n = a.len().min(b.len()),
                coefficient,
                "Computed correlation"
            );
            matrix.insert(pair, coefficient);
        }

        self.correlation_cache.insert(key, matrix.clone());
        self.metrics
            .observe_latency("get_correlations", timer.elapsed().as_secs_f64());
        Ok(matrix)
    }

    // ---- reporting -------------------------------------------------------

    /// Assemble a report for the given metrics and encode it
    ///
    /// Every requested id must have a definition. Trends are computed at
    /// the configured report granularity regardless of the window.
    pub async fn generate_report(
        &self,
        metric_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        format: ReportFormat,
    ) -> Result<ReportPayload> {
        let timer = Instant::now();
        let ids = dedup_preserving_order(metric_ids)?;
        let window = TimeWindow::new(start, end)?;
        let definitions = self.require_definitions(&ids).await?;

        let mut entries = Vec::with_capacity(definitions.len());
        for definition in &definitions {
            let (aggregations, trends) = tokio::try_join!(
                async {
                    self.storage(
                        self.store
                            .list_aggregations(&definition.id, None, window.start, window.end)
                            .await,
                    )
                },
                self.get_trend(
                    &definition.id,
                    window.start,
                    window.end,
                    &self.config.report_granularity,
                ),
            )?;
            entries.push(MetricReport {
                metric: MetricSummary::from(definition),
                aggregations,
                trends,
            });
        }

        let report = Report {
            period: window.into(),
            metrics: entries,
        };
        let payload = render(report, format)?;

        self.metrics.inc_reports_generated(format.as_str());
        self.metrics
            .observe_latency("generate_report", timer.elapsed().as_secs_f64());
        Ok(payload)
    }

    /// Fetch definitions for `ids` in the given order, failing on the first
    /// id that has none
    async fn require_definitions(&self, ids: &[String]) -> Result<Vec<MetricDefinition>> {
        let found = self.storage(self.store.get_definitions(ids).await)?;
        ids.iter()
            .map(|id| {
                found
                    .iter()
                    .find(|d| &d.id == id)
                    .cloned()
                    .ok_or_else(|| MetricsError::not_found(id.clone()))
            })
            .collect()
    }
}

fn values(points: &[DataPoint]) -> Vec<f64> {
    points.iter().map(|p| p.value).collect()
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Cache key of a trend query
pub fn trend_cache_key(metric_id: &str, window: &TimeWindow, granularity: &str) -> String {
    format!(
        "trends:{}:{}:{}:{}",
        metric_id,
        iso(window.start),
        iso(window.end),
        granularity
    )
}

/// Cache key of a correlation query over sorted, deduplicated ids
pub fn correlation_cache_key(sorted_ids: &[String], window: &TimeWindow) -> String {
    format!(
        "correlations:{}:{}:{}",
        sorted_ids.join(","),
        iso(window.start),
        iso(window.end)
    )
}

/// Sorted, deduplicated ids; rejects an empty set
fn normalize_ids(ids: &[String]) -> Result<Vec<String>> {
    let mut ids = dedup_preserving_order(ids)?;
    ids.sort();
    Ok(ids)
}

fn dedup_preserving_order(ids: &[String]) -> Result<Vec<String>> {
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim();
        if id.is_empty() {
            return Err(MetricsError::invalid("metric ids must not be blank"));
        }
        if !unique.iter().any(|u| u == id) {
            unique.push(id.to_string());
        }
    }
    if unique.is_empty() {
        return Err(MetricsError::invalid("at least one metric id is required"));
    }
    Ok(unique)
}
