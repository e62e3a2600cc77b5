//! Metricflow report daemon
//!
//! Loads a dataset into an in-memory store, keeps the analytics caches
//! swept, buckets each pass window and writes hourly and daily reports to
//! disk until interrupted.

use anyhow::{Context, Result};
use metricflow_core::{Dataset, InMemoryStore, MetricsEngine, ReportScheduler};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinError;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod aggregation;
mod config;
mod writer;

const REPORTD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting metricflow-reportd");

    let config = config::ReportdConfig::load()?;
    info!(instance = %config.instance_name, output_dir = %config.output_dir.display(), "Daemon configured");

    let store = load_store(config.dataset_path.as_deref())?;

    let engine_config = config.engine_config();
    let sweep_every = engine_config.cache_sweep_interval;
    let engine = Arc::new(MetricsEngine::new(Arc::new(store), engine_config));

    let logger = engine.logger().clone();
    logger.log_startup(REPORTD_VERSION, engine.list_metrics().await?.len());

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let trend_sweeper = tokio::spawn(
        engine
            .trend_cache()
            .clone()
            .run_sweeper(sweep_every, shutdown_tx.subscribe()),
    );
    let correlation_sweeper = tokio::spawn(
        engine
            .correlation_cache()
            .clone()
            .run_sweeper(sweep_every, shutdown_tx.subscribe()),
    );

    let (scheduler, report_rx) = ReportScheduler::new(engine.clone(), config.scheduler_config());
    let scheduler =
        scheduler.with_preparer(Arc::new(aggregation::AggregationPass::new(engine.clone())));
    let scheduler_handle = tokio::spawn(Arc::new(scheduler).run(shutdown_tx.subscribe()));

    let writer = writer::ReportWriter::new(config.output_dir.clone(), logger.clone());
    let writer_handle = tokio::spawn(writer.run(report_rx));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    // The writer exits once the scheduler drops its sender
    let (scheduler_done, trend_done, correlation_done, writer_done) = tokio::join!(
        scheduler_handle,
        trend_sweeper,
        correlation_sweeper,
        writer_handle
    );
    log_task_exit("scheduler", scheduler_done);
    log_task_exit("trend_sweeper", trend_done);
    log_task_exit("correlation_sweeper", correlation_done);
    log_task_exit("writer", writer_done);
    info!("Shutdown complete");

    Ok(())
}

/// Seed the store from the configured dataset, or start empty
fn load_store(dataset_path: Option<&Path>) -> Result<InMemoryStore> {
    let Some(path) = dataset_path else {
        return Ok(InMemoryStore::new());
    };
    let dataset =
        Dataset::load(path).with_context(|| format!("loading dataset {}", path.display()))?;
    InMemoryStore::from_dataset(dataset)
        .with_context(|| format!("indexing dataset {}", path.display()))
}

fn log_task_exit(task: &str, result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(task, error = %e, "Task failed");
    }
}
