//! Delimited-text rendering of a report

use super::Report;
use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed first line of every CSV report
pub const CSV_HEADER: &str = "Metric,Category,Unit,Start Time,End Time,Value,Trend";

/// One line per (metric, aggregation) pair after the header, no trailing newline
pub fn to_csv(report: &Report) -> String {
    let mut lines = Vec::with_capacity(report.row_count() + 1);
    lines.push(CSV_HEADER.to_string());

    for entry in &report.metrics {
        let trend = entry.trends.trend.as_str();
        for agg in &entry.aggregations {
            lines.push(
                [
                    escape(&entry.metric.name),
                    escape(&entry.metric.category),
                    escape(&entry.metric.unit),
                    timestamp(agg.start_time),
                    timestamp(agg.end_time),
                    agg.avg.to_string(),
                    trend.to_string(),
                ]
                .join(","),
            );
        }
    }

    lines.join("\n")
}

fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
