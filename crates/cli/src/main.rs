//! Metricflow CLI
//!
//! Runs bucketing, trend, correlation and report operations against a
//! JSON dataset loaded into an in-memory store.

mod commands;
mod output;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use commands::{analytics, metrics, report};
use metricflow_core::{Dataset, InMemoryStore, MetricsEngine, ReportFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Metricflow CLI
#[derive(Parser)]
#[command(name = "mfx")]
#[command(author, version, about = "Time-series aggregation and analytics over metric datasets", long_about = None)]
pub struct Cli {
    /// Dataset file with metric definitions and data points (can also be set via MFX_DATASET env var)
    #[arg(long, short = 'd', env = "MFX_DATASET")]
    pub dataset: PathBuf,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Inclusive time window shared by the analytics commands
#[derive(clap::Args, Clone, Copy)]
pub struct WindowArgs {
    /// Window start (RFC 3339)
    #[arg(long)]
    pub start: DateTime<Utc>,

    /// Window end (RFC 3339)
    #[arg(long)]
    pub end: DateTime<Utc>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect the metric catalogue
    #[command(subcommand)]
    Metrics(MetricsCommands),

    /// Bucket a metric's raw series and show the aggregations
    Process {
        /// Metric ID
        metric: String,

        #[command(flatten)]
        window: WindowArgs,

        /// Bucket width (e.g. 30s, 5m, 1h, 1d)
        #[arg(long, short, default_value = "1h")]
        granularity: String,
    },

    /// Bucket a metric and analyze the trend of its aggregations
    Trend {
        /// Metric ID
        metric: String,

        #[command(flatten)]
        window: WindowArgs,

        /// Bucket width used before analysis
        #[arg(long, short, default_value = "1h")]
        granularity: String,

        /// Span label of the records to analyze (defaults to the first bucket's)
        #[arg(long)]
        label: Option<String>,
    },

    /// Pairwise correlation between metrics
    Correlate {
        /// Metric IDs
        #[arg(required = true)]
        metrics: Vec<String>,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Generate a report
    Report {
        /// Metric IDs
        #[arg(required = true)]
        metrics: Vec<String>,

        #[command(flatten)]
        window: WindowArgs,

        /// Bucket each metric at this width before reporting
        #[arg(long, short)]
        granularity: Option<String>,

        /// Report encoding (json, csv, pdf)
        #[arg(long, default_value = "json")]
        output_format: ReportFormat,

        /// Write the report to a file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum MetricsCommands {
    /// List every metric
    List,

    /// Search metrics by name or description
    Search {
        /// Case-insensitive search text
        query: String,
    },
}

fn load_engine(path: &Path) -> Result<MetricsEngine> {
    let dataset = Dataset::load(path)
        .with_context(|| format!("loading dataset {}", path.display()))?;
    let store = InMemoryStore::from_dataset(dataset)?;
    Ok(MetricsEngine::with_defaults(Arc::new(store)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let engine = load_engine(&cli.dataset)?;

    match cli.command {
        Commands::Metrics(metrics_cmd) => match metrics_cmd {
            MetricsCommands::List => {
                metrics::list_metrics(&engine, cli.format).await?;
            }
            MetricsCommands::Search { query } => {
                metrics::search_metrics(&engine, &query, cli.format).await?;
            }
        },
        Commands::Process {
            metric,
            window,
            granularity,
        } => {
            analytics::process(&engine, &metric, window.start, window.end, &granularity, cli.format)
                .await?;
        }
        Commands::Trend {
            metric,
            window,
            granularity,
            label,
        } => {
            analytics::trend(
                &engine,
                &metric,
                window.start,
                window.end,
                &granularity,
                label,
                cli.format,
            )
            .await?;
        }
        Commands::Correlate { metrics, window } => {
            analytics::correlate(&engine, &metrics, window.start, window.end, cli.format).await?;
        }
        Commands::Report {
            metrics,
            window,
            granularity,
            output_format,
            out,
        } => {
            report::generate(
                &engine,
                report::ReportRequest {
                    metric_ids: &metrics,
                    start: window.start,
                    end: window.end,
                    bucket: granularity.as_deref(),
                    format: output_format,
                    out: out.as_deref(),
                },
            )
            .await?;
        }
    }

    Ok(())
}
