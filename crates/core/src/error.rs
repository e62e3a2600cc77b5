//! Error taxonomy for the metrics core

use thiserror::Error;

/// Errors surfaced by the engine and its components
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Malformed caller input, rejected before any I/O
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A referenced metric has no definition
    #[error("Metric not found: {metric_id}")]
    NotFound { metric_id: String },

    /// The backing store rejected a read or write
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MetricsError {
    pub fn invalid(message: impl Into<String>) -> Self {
        MetricsError::InvalidInput(message.into())
    }

    pub fn not_found(metric_id: impl Into<String>) -> Self {
        MetricsError::NotFound {
            metric_id: metric_id.into(),
        }
    }
}

/// Errors reported by a `MetricStore` implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage operation failed: {operation} - {details}")]
    OperationFailed { operation: String, details: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn failed(operation: &str, details: impl Into<String>) -> Self {
        StorageError::OperationFailed {
            operation: operation.to_string(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_is_transparent() {
        let err: MetricsError = StorageError::failed("insert_aggregations", "disk full").into();
        assert_eq!(
            err.to_string(),
            "Storage operation failed: insert_aggregations - disk full"
        );
    }
}
