//! Persists scheduled reports to the output directory
//!
//! After every report the engine's Prometheus collectors are written next
//! to it as `metrics.prom`, in the text exposition format.

use anyhow::{Context, Result};
use metricflow_core::{EngineMetrics, ScheduledReport, StructuredLogger};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Snapshot file for the Prometheus collectors
pub const METRICS_FILE: &str = "metrics.prom";

pub struct ReportWriter {
    output_dir: PathBuf,
    logger: StructuredLogger,
    metrics: EngineMetrics,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, logger: StructuredLogger) -> Self {
        Self {
            output_dir: output_dir.into(),
            logger,
            metrics: EngineMetrics::new(),
        }
    }

    /// File name for a report, e.g. `hourly-20240301T120000Z.json`
    pub fn file_name(report: &ScheduledReport) -> String {
        format!(
            "{}-{}.{}",
            report.kind,
            report.generated_at.format("%Y%m%dT%H%M%SZ"),
            report.payload.format()
        )
    }

    /// Write one report and return its path
    pub async fn write(&self, report: ScheduledReport) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        let path = self.output_dir.join(Self::file_name(&report));
        let kind = report.kind;
        let format = report.payload.format();
        let metrics = report.metrics;
        let bytes = report.payload.into_bytes()?;

        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        self.logger
            .log_report_generated(kind.as_str(), format.as_str(), metrics, bytes.len());
        Ok(path)
    }

    /// Overwrite the metrics snapshot and return its path
    pub async fn write_metrics(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        let path = self.output_dir.join(METRICS_FILE);
        tokio::fs::write(&path, self.metrics.encode_text())
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Drain the scheduler channel until every sender is gone
    pub async fn run(self, mut rx: mpsc::Receiver<ScheduledReport>) {
        info!(output_dir = %self.output_dir.display(), "Starting report writer");
        while let Some(report) = rx.recv().await {
            if let Err(e) = self.write(report).await {
                error!(error = %e, "Failed to write report");
            }
            if let Err(e) = self.write_metrics().await {
                warn!(error = %e, "Failed to write metrics snapshot");
            }
        }
        if let Err(e) = self.write_metrics().await {
            warn!(error = %e, "Failed to write final metrics snapshot");
        }
        info!("Report writer stopped");
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use metricflow_core::{ReportKind, ReportPayload};

    fn scheduled(kind: ReportKind, payload: ReportPayload) -> ScheduledReport {
        ScheduledReport {
            kind,
            generated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            metrics: 1,
            payload,
        }
    }

    #[test]
    fn test_file_name() {
        let report = scheduled(ReportKind::Daily, ReportPayload::Binary(vec![]));
        assert_eq!(ReportWriter::file_name(&report), "daily-20240301T120000Z.pdf");
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("out"), StructuredLogger::new("test"));

        let path = writer
            .write(scheduled(
                ReportKind::Hourly,
                ReportPayload::Binary(b"{\"ok\":true}".to_vec()),
            ))
            .await
            .unwrap();

        assert!(path.starts_with(writer.output_dir()));
        let written = tokio::fs::read(&path).await.unwrap();
        assert_eq!(written, b"{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), StructuredLogger::new("test"));
        let (tx, rx) = mpsc::channel(2);

        tx.send(scheduled(ReportKind::Daily, ReportPayload::Binary(vec![1, 2])))
            .await
            .unwrap();
        drop(tx);
        writer.run(rx).await;

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["daily-20240301T120000Z.pdf", METRICS_FILE]);
    }

    #[tokio::test]
    async fn test_metrics_snapshot_exposes_collectors() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), StructuredLogger::new("test"));
        EngineMetrics::new().inc_reports_generated("json");

        let path = writer.write_metrics().await.unwrap();

        assert_eq!(path, dir.path().join(METRICS_FILE));
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.contains("metricflow_reports_generated_total"), "{}", text);
    }
}
