//! Report model and output encodings
//!
//! A report covers one period and, per metric, its definition summary,
//! aggregation rows and trend. It can be emitted as the structured value
//! itself, as delimited text, or as opaque bytes reserved for document
//! rendering.

mod csv;

pub use self::csv::{to_csv, CSV_HEADER};

use crate::error::{MetricsError, Result};
use crate::models::{AggregationRecord, MetricDefinition, TimeWindow, TrendResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output encoding requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Structured pass-through
    #[default]
    Json,
    /// One row per (metric, aggregation) pair
    Csv,
    /// Document rendering placeholder: the compact JSON encoding of the
    /// report, carried as opaque bytes. No PDF backend is involved.
    Pdf,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            "pdf" => Ok(ReportFormat::Pdf),
            other => Err(MetricsError::invalid(format!(
                "unknown report format '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<TimeWindow> for Period {
    fn from(window: TimeWindow) -> Self {
        Self {
            start: window.start,
            end: window.end,
        }
    }
}

/// Definition fields carried into a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit: String,
}

impl From<&MetricDefinition> for MetricSummary {
    fn from(def: &MetricDefinition) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            description: def.description.clone(),
            category: def.category.clone(),
            unit: def.unit.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub metric: MetricSummary,
    pub aggregations: Vec<AggregationRecord>,
    pub trends: TrendResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub period: Period,
    pub metrics: Vec<MetricReport>,
}

impl Report {
    /// Total aggregation rows across all metrics
    pub fn row_count(&self) -> usize {
        self.metrics.iter().map(|m| m.aggregations.len()).sum()
    }
}

/// A report rendered in the requested encoding
#[derive(Debug, Clone, PartialEq)]
pub enum ReportPayload {
    Structured(Report),
    Text(String),
    Binary(Vec<u8>),
}

impl ReportPayload {
    pub fn format(&self) -> ReportFormat {
        match self {
            ReportPayload::Structured(_) => ReportFormat::Json,
            ReportPayload::Text(_) => ReportFormat::Csv,
            ReportPayload::Binary(_) => ReportFormat::Pdf,
        }
    }

    /// Bytes suitable for writing the payload to a file or socket
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            ReportPayload::Structured(report) => Ok(serde_json::to_vec_pretty(&report)?),
            ReportPayload::Text(text) => Ok(text.into_bytes()),
            ReportPayload::Binary(bytes) => Ok(bytes),
        }
    }
}

/// Encode an assembled report
pub fn render(report: Report, format: ReportFormat) -> Result<ReportPayload> {
    match format {
        ReportFormat::Json => Ok(ReportPayload::Structured(report)),
        ReportFormat::Csv => Ok(ReportPayload::Text(to_csv(&report))),
        ReportFormat::Pdf => Ok(ReportPayload::Binary(serde_json::to_vec(&report)?)),
    }
}
