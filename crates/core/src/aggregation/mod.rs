//! Bucketing and aggregation of raw series
//!
//! This module provides:
//! - Data-anchored interval bucketing
//! - Reduction of each bucket into an aggregation record

mod aggregator;
mod bucketer;

pub use aggregator::{aggregate, aggregate_all};
pub use bucketer::{Bucket, IntervalBucketer};
