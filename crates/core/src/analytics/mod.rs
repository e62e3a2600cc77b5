//! Analytics over stored aggregations and raw series
//!
//! This module provides:
//! - Trend direction, percentage change and volatility
//! - Pairwise Pearson correlation between metrics

mod correlation;
mod stats;
mod trend;

pub use correlation::{unordered_pairs, CorrelationMatrix, MetricPair};
pub use stats::{mean, pearson, population_std_dev};
pub use trend::analyze as analyze_trend;
