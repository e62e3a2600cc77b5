pub mod analytics;
pub mod metrics;
pub mod report;
