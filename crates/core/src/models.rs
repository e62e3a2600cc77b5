//! Core data models for the metrics pipeline
//!
//! Boundary inputs (`NewMetricDefinition`, `NewDataPoint`) are validated
//! into the stored records before they reach the engine.

use crate::error::{MetricsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form string labels attached to a data point or aggregation
pub type Tags = BTreeMap<String, String>;

/// Value type tag of a metric definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    #[default]
    Float,
    Percentage,
}

/// Metric definition registered by an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Unvalidated metric definition as received from a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMetricDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub unit: String,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl NewMetricDefinition {
    pub fn validate(self) -> Result<MetricDefinition> {
        if self.id.trim().is_empty() {
            return Err(MetricsError::invalid("metric id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(MetricsError::invalid(format!(
                "metric {} must have a name",
                self.id
            )));
        }
        Ok(MetricDefinition {
            id: self.id,
            name: self.name,
            description: self.description,
            category: self.category,
            unit: self.unit,
            value_type: self.value_type,
            metadata: self.metadata,
        })
    }
}

/// A single timestamped measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub metric_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

/// Unvalidated data point as received from a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDataPoint {
    pub metric_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default)]
    pub tags: Option<Tags>,
}

impl NewDataPoint {
    pub fn validate(self) -> Result<DataPoint> {
        if self.metric_id.trim().is_empty() {
            return Err(MetricsError::invalid("data point has no metric id"));
        }
        if !self.value.is_finite() {
            return Err(MetricsError::invalid(format!(
                "data point for {} has non-finite value {}",
                self.metric_id, self.value
            )));
        }
        Ok(DataPoint {
            metric_id: self.metric_id,
            timestamp: self.timestamp,
            value: self.value,
            tags: self.tags,
        })
    }
}

/// Summary statistics for one bucket of data points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRecord {
    pub metric_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Label derived from the bucket's actual elapsed time, e.g. "45m"
    pub granularity: String,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

/// Direction of a metric's trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Stable => "stable",
            TrendDirection::InsufficientData => "insufficient_data",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trend and volatility derived from a sequence of aggregations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    pub trend: TrendDirection,
    pub percentage_change: f64,
    pub volatility: f64,
}

impl TrendResult {
    pub fn insufficient_data() -> Self {
        Self {
            trend: TrendDirection::InsufficientData,
            percentage_change: 0.0,
            volatility: 0.0,
        }
    }
}

/// Time window shared by analytics and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting `end < start`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(MetricsError::invalid(format!(
                "window end {} is before start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_rejects_reversed_bounds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            TimeWindow::new(start, end),
            Err(MetricsError::InvalidInput(_))
        ));
        assert!(TimeWindow::new(end, end).is_ok());
    }

    #[test]
    fn test_data_point_validation() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bad = NewDataPoint {
            metric_id: "cpu".to_string(),
            timestamp: ts,
            value: f64::NAN,
            tags: None,
        };
        assert!(bad.validate().is_err());

        let empty_id = NewDataPoint {
            metric_id: " ".to_string(),
            timestamp: ts,
            value: 1.0,
            tags: None,
        };
        assert!(empty_id.validate().is_err());
    }

    #[test]
    fn test_trend_serializes_snake_case() {
        let json = serde_json::to_value(TrendResult::insufficient_data()).unwrap();
        assert_eq!(json["trend"], "insufficient_data");
        assert_eq!(json["percentageChange"], 0.0);
    }

    #[test]
    fn test_definition_requires_name() {
        let def = NewMetricDefinition {
            id: "cpu".to_string(),
            name: String::new(),
            description: String::new(),
            category: "system".to_string(),
            unit: "%".to_string(),
            value_type: ValueType::Percentage,
            metadata: BTreeMap::new(),
        };
        assert!(def.validate().is_err());
    }
}
