//! Time-series metrics core
//!
//! This crate provides:
//! - Interval bucketing and per-bucket aggregation of raw data points
//! - Trend and pairwise correlation analytics over stored series
//! - A TTL result cache for analytics queries
//! - Report assembly in structured, delimited and document encodings
//! - A scheduler for periodic report passes
//! - Prometheus metrics and structured logging

pub mod aggregation;
pub mod analytics;
pub mod cache;
pub mod engine;
pub mod error;
pub mod granularity;
pub mod models;
pub mod observability;
pub mod report;
pub mod scheduler;
pub mod storage;

pub use analytics::{CorrelationMatrix, MetricPair};
pub use cache::ResultCache;
pub use engine::{EngineConfig, MetricsEngine};
pub use error::{MetricsError, Result, StorageError};
pub use granularity::Granularity;
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use report::{Report, ReportFormat, ReportPayload};
pub use scheduler::{
    PassPreparer, ReportKind, ReportScheduler, ReportSchedulerConfig, ScheduledReport,
};
pub use storage::{Dataset, InMemoryStore, MetricStore};
