//! Aggregation, trend and correlation commands

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;
use metricflow_core::{AggregationRecord, MetricStore, MetricsEngine};
use serde_json::json;
use tabled::Tabled;

use crate::output::{
    color_coefficient, color_trend, format_change, format_value, print_info, print_json,
    print_success, print_table, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct AggregationRow {
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Span")]
    granularity: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Sum")]
    sum: String,
}

impl From<&AggregationRecord> for AggregationRow {
    fn from(r: &AggregationRecord) -> Self {
        Self {
            start: timestamp(r.start_time),
            end: timestamp(r.end_time),
            granularity: r.granularity.clone(),
            count: r.count,
            min: format_value(r.min),
            max: format_value(r.max),
            avg: format_value(r.avg),
            sum: format_value(r.sum),
        }
    }
}

#[derive(Tabled)]
struct CorrelationRow {
    #[tabled(rename = "Metric A")]
    first: String,
    #[tabled(rename = "Metric B")]
    second: String,
    #[tabled(rename = "Pearson r")]
    coefficient: String,
}

fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Bucket one metric and return the rows now stored for the window
async fn bucket_metric(
    engine: &MetricsEngine,
    metric_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bucket: &str,
) -> Result<Vec<AggregationRecord>> {
    engine
        .process_bucket_range(metric_id, start, end, bucket)
        .await?;
    Ok(engine
        .store()
        .list_aggregations(metric_id, None, start, end)
        .await?)
}

/// Bucket a metric's raw series and show the resulting aggregations
pub async fn process(
    engine: &MetricsEngine,
    metric_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bucket: &str,
    format: OutputFormat,
) -> Result<()> {
    let rows = bucket_metric(engine, metric_id, start, end, bucket).await?;

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => {
            if rows.is_empty() {
                print_warning("No data points in the requested window");
                return Ok(());
            }
            print_success(&format!(
                "Wrote {} aggregation record(s) for {}",
                rows.len(),
                metric_id.cyan()
            ));
            let table: Vec<AggregationRow> = rows.iter().map(AggregationRow::from).collect();
            print_table(&table);
        }
    }
    Ok(())
}

/// Bucket a metric, then report the trend over rows with one span label
///
/// Without an explicit label the span of the first bucket is used.
pub async fn trend(
    engine: &MetricsEngine,
    metric_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bucket: &str,
    label: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let rows = bucket_metric(engine, metric_id, start, end, bucket).await?;
    let label = label
        .or_else(|| rows.first().map(|r| r.granularity.clone()))
        .unwrap_or_else(|| bucket.to_string());

    let result = engine.get_trend(metric_id, start, end, &label).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "metricId": metric_id,
            "granularity": label,
            "result": result,
        }))?,
        OutputFormat::Table => {
            println!("{}", "Trend Analysis".bold());
            println!("{}", "=".repeat(40));
            println!("Metric:       {}", metric_id.cyan());
            println!("Span label:   {}", label);
            println!("Records:      {}", rows.iter().filter(|r| r.granularity == label).count());
            println!();
            println!("Trend:        {}", color_trend(result.trend));
            println!("Change:       {}", format_change(result.percentage_change));
            println!("Volatility:   {}", format_value(result.volatility));
        }
    }
    Ok(())
}

/// Pairwise Pearson coefficients across the given metrics
pub async fn correlate(
    engine: &MetricsEngine,
    metric_ids: &[String],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    format: OutputFormat,
) -> Result<()> {
    let matrix = engine.get_correlations(metric_ids, start, end).await?;

    match format {
        OutputFormat::Json => print_json(&matrix)?,
        OutputFormat::Table => {
            if matrix.is_empty() {
                print_info("At least two distinct metrics are needed for a correlation");
                return Ok(());
            }
            let rows: Vec<CorrelationRow> = matrix
                .iter()
                .map(|(pair, r)| CorrelationRow {
                    first: pair.first().to_string(),
                    second: pair.second().to_string(),
                    coefficient: color_coefficient(r),
                })
                .collect();
            print_table(&rows);
        }
    }
    Ok(())
}
