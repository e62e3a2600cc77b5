//! Periodic report generation
//!
//! Runs an hourly pass (structured report over the last hour) and a daily
//! pass (document report over the last day) for every registered metric,
//! forwarding each result over a channel.

use crate::engine::MetricsEngine;
use crate::error::Result;
use crate::report::{ReportFormat, ReportPayload};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

/// Default spacing of hourly passes
pub const DEFAULT_HOURLY_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default spacing of daily passes
pub const DEFAULT_DAILY_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Hourly,
    Daily,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Hourly => "hourly",
            ReportKind::Daily => "daily",
        }
    }

    /// Encoding produced by this pass
    pub fn format(&self) -> ReportFormat {
        match self {
            ReportKind::Hourly => ReportFormat::Json,
            ReportKind::Daily => ReportFormat::Pdf,
        }
    }

    /// How far back the report window reaches from the pass time
    pub fn lookback(&self) -> chrono::Duration {
        match self {
            ReportKind::Hourly => chrono::Duration::hours(1),
            ReportKind::Daily => chrono::Duration::days(1),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ReportSchedulerConfig {
    pub hourly_interval: Duration,
    pub daily_interval: Duration,
    /// Capacity of the outgoing report channel
    pub channel_capacity: usize,
}

impl Default for ReportSchedulerConfig {
    fn default() -> Self {
        Self {
            hourly_interval: DEFAULT_HOURLY_INTERVAL,
            daily_interval: DEFAULT_DAILY_INTERVAL,
            channel_capacity: 16,
        }
    }
}

/// Work run over a pass window before its report is assembled
#[async_trait]
pub trait PassPreparer: Send + Sync {
    async fn prepare(
        &self,
        kind: ReportKind,
        metric_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()>;
}

/// Output of one scheduled pass
#[derive(Debug, Clone)]
pub struct ScheduledReport {
    pub kind: ReportKind,
    pub generated_at: DateTime<Utc>,
    pub metrics: usize,
    pub payload: ReportPayload,
}

pub struct ReportScheduler {
    engine: Arc<MetricsEngine>,
    config: ReportSchedulerConfig,
    preparers: Vec<Arc<dyn PassPreparer>>,
    report_tx: mpsc::Sender<ScheduledReport>,
}

impl ReportScheduler {
    pub fn new(
        engine: Arc<MetricsEngine>,
        config: ReportSchedulerConfig,
    ) -> (Self, mpsc::Receiver<ScheduledReport>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let scheduler = Self {
            engine,
            config,
            preparers: Vec::new(),
            report_tx: tx,
        };
        (scheduler, rx)
    }

    /// Register work to run, in order, before every pass
    pub fn with_preparer(mut self, preparer: Arc<dyn PassPreparer>) -> Self {
        self.preparers.push(preparer);
        self
    }

    /// Run both passes until shutdown is signalled
    ///
    /// The first pass of each kind fires one full interval after start.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            hourly_secs = self.config.hourly_interval.as_secs(),
            daily_secs = self.config.daily_interval.as_secs(),
            "Starting report scheduler"
        );

        let now = Instant::now();
        let mut hourly = interval_at(now + self.config.hourly_interval, self.config.hourly_interval);
        let mut daily = interval_at(now + self.config.daily_interval, self.config.daily_interval);

        loop {
            tokio::select! {
                _ = hourly.tick() => {
                    self.dispatch(ReportKind::Hourly).await;
                }
                _ = daily.tick() => {
                    self.dispatch(ReportKind::Daily).await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down report scheduler");
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, kind: ReportKind) {
        match self.run_pass(kind, Utc::now()).await {
            Ok(Some(report)) => {
                if self.report_tx.send(report).await.is_err() {
                    warn!(kind = %kind, "Report receiver dropped");
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.engine.metrics().inc_scheduled_report_failures(kind.as_str());
                self.engine
                    .logger()
                    .log_report_failed(kind.as_str(), &e.to_string());
            }
        }
    }

    /// Generate one report of `kind` ending at `now`
    ///
    /// Returns `None` when no metrics are registered. A failing preparer
    /// aborts the pass.
    pub async fn run_pass(
        &self,
        kind: ReportKind,
        now: DateTime<Utc>,
    ) -> Result<Option<ScheduledReport>> {
        let ids: Vec<String> = self
            .engine
            .list_metrics()
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

        if ids.is_empty() {
            debug!(kind = %kind, "No metrics registered, skipping report pass");
            return Ok(None);
        }

        let start = now - kind.lookback();
        for preparer in &self.preparers {
            preparer.prepare(kind, &ids, start, now).await?;
        }

        let payload = self
            .engine
            .generate_report(&ids, start, now, kind.format())
            .await?;

        Ok(Some(ScheduledReport {
            kind,
            generated_at: now,
            metrics: ids.len(),
            payload,
        }))
    }
}
