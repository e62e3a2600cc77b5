//! Storage boundary consumed by the engine
//!
//! The engine never owns persisted records; it reads series and definitions
//! and hands aggregation batches to a `MetricStore`. `InMemoryStore` is a
//! reference implementation used by the offline tools and tests.

mod memory;

pub use memory::{Dataset, InMemoryStore};

use crate::error::StorageError;
use crate::models::{AggregationRecord, DataPoint, MetricDefinition};
use chrono::{DateTime, Utc};

pub use async_trait::async_trait;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Persistence operations the metrics core depends on
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Data points for a metric with `start <= timestamp <= end`, ascending
    async fn list_data_points(
        &self,
        metric_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<DataPoint>>;

    /// Persist a batch of aggregation records; all or nothing
    async fn insert_aggregations(&self, records: Vec<AggregationRecord>) -> StorageResult<()>;

    /// Aggregations for a metric with `start <= start_time <= end`, ascending
    /// by start time, optionally restricted to one granularity label
    async fn list_aggregations(
        &self,
        metric_id: &str,
        granularity: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<AggregationRecord>>;

    /// Definitions for the given ids; unknown ids are omitted
    async fn get_definitions(&self, ids: &[String]) -> StorageResult<Vec<MetricDefinition>>;

    async fn list_definitions(&self) -> StorageResult<Vec<MetricDefinition>>;

    async fn insert_definition(&self, definition: MetricDefinition) -> StorageResult<()>;

    async fn insert_data_points(&self, points: Vec<DataPoint>) -> StorageResult<()>;

    /// Case-insensitive substring search over name and description
    async fn search_definitions(&self, query: &str) -> StorageResult<Vec<MetricDefinition>> {
        let needle = query.to_lowercase();
        Ok(self
            .list_definitions()
            .await?
            .into_iter()
            .filter(|d| {
                d.name.to_lowercase().contains(&needle)
                    || d.description.to_lowercase().contains(&needle)
            })
            .collect())
    }
}
