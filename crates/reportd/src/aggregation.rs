//! Buckets raw series ahead of each scheduled report
//!
//! Reports read stored aggregations, so every pass first buckets the part
//! of its window that no earlier pass has covered.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metricflow_core::{MetricsEngine, PassPreparer, ReportKind, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct AggregationPass {
    engine: Arc<MetricsEngine>,
    granularity: String,
    /// End of the last bucketed window
    watermark: Mutex<Option<DateTime<Utc>>>,
}

impl AggregationPass {
    /// Bucket at the engine's configured report granularity
    pub fn new(engine: Arc<MetricsEngine>) -> Self {
        let granularity = engine.config().report_granularity.clone();
        Self {
            engine,
            granularity,
            watermark: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PassPreparer for AggregationPass {
    async fn prepare(
        &self,
        kind: ReportKind,
        metric_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        let mut watermark = self.watermark.lock().await;

        // Windows are inclusive, so resume just past the last covered instant
        let from = match *watermark {
            Some(last) if last >= end => {
                debug!(kind = %kind, "Window already aggregated");
                return Ok(());
            }
            Some(last) => (last + Duration::nanoseconds(1)).max(start),
            None => start,
        };

        let mut written = 0;
        for id in metric_ids {
            written += self
                .engine
                .process_bucket_range(id, from, end, &self.granularity)
                .await?;
        }
        *watermark = Some(end);

        info!(
            kind = %kind,
            metrics = metric_ids.len(),
            records = written,
            granularity = %self.granularity,
            "Aggregation pass complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use metricflow_core::{
        Dataset, InMemoryStore, MetricStore, Report, ReportPayload, ReportScheduler,
        ReportSchedulerConfig,
    };

    fn engine() -> Arc<MetricsEngine> {
        let dataset = Dataset::from_json(
            r#"{
                "metrics": [
                    {"id": "rps", "name": "Requests", "category": "http", "unit": "req/s"}
                ],
                "data_points": [
                    {"metric_id": "rps", "timestamp": "2024-03-01T11:10:00Z", "value": 10},
                    {"metric_id": "rps", "timestamp": "2024-03-01T11:30:00Z", "value": 20},
                    {"metric_id": "rps", "timestamp": "2024-03-01T11:50:00Z", "value": 30}
                ]
            }"#,
        )
        .unwrap();
        let store = InMemoryStore::from_dataset(dataset).unwrap();
        Arc::new(MetricsEngine::with_defaults(Arc::new(store)))
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn aggregation_rows(payload: ReportPayload) -> usize {
        let ReportPayload::Structured(Report { metrics, .. }) = payload else {
            panic!("hourly pass should produce a structured report");
        };
        metrics.iter().map(|m| m.aggregations.len()).sum()
    }

    #[tokio::test]
    async fn test_scheduled_report_contains_rows() {
        let engine = engine();
        let (scheduler, _rx) = ReportScheduler::new(engine.clone(), ReportSchedulerConfig::default());
        let scheduler = scheduler.with_preparer(Arc::new(AggregationPass::new(engine)));

        let report = scheduler
            .run_pass(ReportKind::Hourly, noon())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(aggregation_rows(report.payload), 1);
    }

    #[tokio::test]
    async fn test_report_without_pass_is_empty() {
        let (scheduler, _rx) = ReportScheduler::new(engine(), ReportSchedulerConfig::default());
        let report = scheduler
            .run_pass(ReportKind::Hourly, noon())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(aggregation_rows(report.payload), 0);
    }

    #[tokio::test]
    async fn test_overlapping_windows_are_not_rebucketed() {
        let engine = engine();
        let pass = AggregationPass::new(engine.clone());
        let ids = vec!["rps".to_string()];

        pass.prepare(ReportKind::Hourly, &ids, noon() - Duration::hours(1), noon())
            .await
            .unwrap();
        pass.prepare(ReportKind::Daily, &ids, noon() - Duration::days(1), noon())
            .await
            .unwrap();

        let rows = engine
            .store()
            .list_aggregations("rps", None, noon() - Duration::days(1), noon())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].avg, 20.0);
        assert_eq!(rows[0].granularity, "40m");
    }
}
