//! Report generation command

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use metricflow_core::{MetricsEngine, ReportFormat};
use std::path::Path;

use crate::output::{print_info, print_success};

/// Options for a one-off report
pub struct ReportRequest<'a> {
    pub metric_ids: &'a [String],
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Bucket each metric at this granularity before assembling
    pub bucket: Option<&'a str>,
    pub format: ReportFormat,
    pub out: Option<&'a Path>,
}

/// Generate a report and write it to a file or stdout
pub async fn generate(engine: &MetricsEngine, request: ReportRequest<'_>) -> Result<()> {
    if let Some(bucket) = request.bucket {
        for id in request.metric_ids {
            let written = engine
                .process_bucket_range(id, request.start, request.end, bucket)
                .await?;
            if request.out.is_some() {
                print_info(&format!("Bucketed {} into {} record(s)", id, written));
            }
        }
    }

    let payload = engine
        .generate_report(request.metric_ids, request.start, request.end, request.format)
        .await?;
    let bytes = payload.into_bytes()?;

    match request.out {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("writing report to {}", path.display()))?;
            print_success(&format!(
                "Wrote {} report ({} bytes) to {}",
                request.format.as_str().to_uppercase(),
                bytes.len(),
                path.display().to_string().cyan()
            ));
        }
        None => {
            println!("{}", String::from_utf8_lossy(&bytes));
        }
    }
    Ok(())
}
