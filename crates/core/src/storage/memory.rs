//! In-memory `MetricStore`
//!
//! Series are kept sorted by timestamp on insert. Aggregations live behind
//! a single write lock so a batch becomes visible atomically.

use super::{async_trait, MetricStore, StorageResult};
use crate::error::{MetricsError, Result, StorageError};
use crate::models::{
    AggregationRecord, DataPoint, MetricDefinition, NewDataPoint, NewMetricDefinition,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Seed document: definitions plus their raw points
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub metrics: Vec<NewMetricDefinition>,
    #[serde(default)]
    pub data_points: Vec<NewDataPoint>,
}

impl Dataset {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MetricsError::invalid(format!("cannot read dataset {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    definitions: DashMap<String, MetricDefinition>,
    series: DashMap<String, Vec<DataPoint>>,
    aggregations: RwLock<Vec<AggregationRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a dataset, validating every record first
    pub fn from_dataset(dataset: Dataset) -> Result<Self> {
        let definitions = dataset
            .metrics
            .into_iter()
            .map(NewMetricDefinition::validate)
            .collect::<Result<Vec<_>>>()?;
        let points = dataset
            .data_points
            .into_iter()
            .map(NewDataPoint::validate)
            .collect::<Result<Vec<_>>>()?;

        let store = Self::new();
        for definition in definitions {
            if store.definitions.contains_key(&definition.id) {
                return Err(MetricsError::invalid(format!(
                    "dataset defines metric {} twice",
                    definition.id
                )));
            }
            store.definitions.insert(definition.id.clone(), definition);
        }
        store.append_points(points)?;

        info!(
            metrics = store.definitions.len(),
            series = store.series.len(),
            "Loaded dataset into memory store"
        );
        Ok(store)
    }

    fn append_points(&self, points: Vec<DataPoint>) -> std::result::Result<(), StorageError> {
        if let Some(orphan) = points
            .iter()
            .find(|p| !self.definitions.contains_key(&p.metric_id))
        {
            return Err(StorageError::failed(
                "insert_data_points",
                format!("metric {} is not defined", orphan.metric_id),
            ));
        }

        for point in points {
            let mut series = self.series.entry(point.metric_id.clone()).or_default();
            let at = series.partition_point(|p| p.timestamp <= point.timestamp);
            series.insert(at, point);
        }
        Ok(())
    }

    /// Number of stored aggregation rows
    pub async fn aggregation_count(&self) -> usize {
        self.aggregations.read().await.len()
    }
}

#[async_trait]
impl MetricStore for InMemoryStore {
    async fn list_data_points(
        &self,
        metric_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<DataPoint>> {
        let Some(series) = self.series.get(metric_id) else {
            return Ok(Vec::new());
        };
        let from = series.partition_point(|p| p.timestamp < start);
        let to = series.partition_point(|p| p.timestamp <= end);
        Ok(series[from..to.max(from)].to_vec())
    }

    async fn insert_aggregations(&self, records: Vec<AggregationRecord>) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut rows = self.aggregations.write().await;
        debug!(count = records.len(), "Appending aggregation batch");
        rows.extend(records);
        Ok(())
    }

    async fn list_aggregations(
        &self,
        metric_id: &str,
        granularity: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<AggregationRecord>> {
        let rows = self.aggregations.read().await;
        let mut matched: Vec<AggregationRecord> = rows
            .iter()
            .filter(|r| r.metric_id == metric_id)
            .filter(|r| granularity.map_or(true, |g| r.granularity == g))
            .filter(|r| r.start_time >= start && r.start_time <= end)
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.start_time);
        Ok(matched)
    }

    async fn get_definitions(&self, ids: &[String]) -> StorageResult<Vec<MetricDefinition>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.definitions.get(id).map(|d| d.clone()))
            .collect())
    }

    async fn list_definitions(&self) -> StorageResult<Vec<MetricDefinition>> {
        let mut all: Vec<MetricDefinition> =
            self.definitions.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn insert_definition(&self, definition: MetricDefinition) -> StorageResult<()> {
        match self.definitions.entry(definition.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StorageError::failed(
                "insert_definition",
                format!("metric {} already exists", definition.id),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(definition);
                Ok(())
            }
        }
    }

    async fn insert_data_points(&self, points: Vec<DataPoint>) -> StorageResult<()> {
        self.append_points(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const DATASET: &str = r#"{
        "metrics": [
            {"id": "cpu", "name": "CPU usage", "description": "Host CPU", "category": "system", "unit": "%"},
            {"id": "mem", "name": "Memory", "category": "system", "unit": "bytes", "value_type": "integer"}
        ],
        "data_points": [
            {"metric_id": "cpu", "timestamp": "2024-01-01T00:02:00Z", "value": 3.0},
            {"metric_id": "cpu", "timestamp": "2024-01-01T00:00:00Z", "value": 1.0},
            {"metric_id": "cpu", "timestamp": "2024-01-01T00:01:00Z", "value": 2.0},
            {"metric_id": "mem", "timestamp": "2024-01-01T00:00:00Z", "value": 512.0}
        ]
    }"#;

    fn ts(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
    }

    #[tokio::test]
    async fn test_dataset_points_sorted_and_range_inclusive() {
        let store = InMemoryStore::from_dataset(Dataset::from_json(DATASET).unwrap()).unwrap();
        let points = store.list_data_points("cpu", ts(0), ts(2)).await.unwrap();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);

        let inner = store.list_data_points("cpu", ts(1), ts(1)).await.unwrap();
        assert_eq!(inner.len(), 1);
        assert!(store.list_data_points("nope", ts(0), ts(9)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_timestamps_keep_arrival_order() {
        let store = InMemoryStore::from_dataset(Dataset::from_json(DATASET).unwrap()).unwrap();
        let dup = |v| DataPoint {
            metric_id: "mem".to_string(),
            timestamp: ts(0),
            value: v,
            tags: None,
        };
        store.insert_data_points(vec![dup(1.0), dup(2.0)]).await.unwrap();
        let values: Vec<f64> = store
            .list_data_points("mem", ts(0), ts(0))
            .await
            .unwrap()
            .iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(values, vec![512.0, 1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_orphan_points_rejected_as_batch() {
        let store = InMemoryStore::from_dataset(Dataset::from_json(DATASET).unwrap()).unwrap();
        let batch = vec![
            DataPoint {
                metric_id: "cpu".to_string(),
                timestamp: ts(5),
                value: 9.0,
                tags: None,
            },
            DataPoint {
                metric_id: "ghost".to_string(),
                timestamp: ts(5),
                value: 9.0,
                tags: None,
            },
        ];
        assert!(store.insert_data_points(batch).await.is_err());
        assert_eq!(store.list_data_points("cpu", ts(0), ts(10)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_definitions_lookup_and_search() {
        let store = InMemoryStore::from_dataset(Dataset::from_json(DATASET).unwrap()).unwrap();
        let found = store
            .get_definitions(&["mem".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].unit, "bytes");

        let hits = store.search_definitions("host").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "cpu");
        assert_eq!(store.list_definitions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_definition_rejected() {
        let store = InMemoryStore::from_dataset(Dataset::from_json(DATASET).unwrap()).unwrap();
        let existing = store.get_definitions(&["cpu".to_string()]).await.unwrap();
        assert!(store.insert_definition(existing[0].clone()).await.is_err());
    }

    #[tokio::test]
    async fn test_aggregation_filters() {
        let store = InMemoryStore::new();
        let record = |minute, label: &str| AggregationRecord {
            metric_id: "cpu".to_string(),
            start_time: ts(minute),
            end_time: ts(minute),
            granularity: label.to_string(),
            min: 1.0,
            max: 1.0,
            avg: 1.0,
            sum: 1.0,
            count: 1,
            tags: None,
        };
        store
            .insert_aggregations(vec![record(60, "1h"), record(0, "1h"), record(30, "5m")])
            .await
            .unwrap();

        let hourly = store
            .list_aggregations("cpu", Some("1h"), ts(0), ts(120))
            .await
            .unwrap();
        assert_eq!(hourly.len(), 2);
        assert!(hourly[0].start_time < hourly[1].start_time);

        let any = store.list_aggregations("cpu", None, ts(0), ts(30)).await.unwrap();
        assert_eq!(any.len(), 2);
        assert_eq!(store.aggregation_count().await, 3);
    }
}
