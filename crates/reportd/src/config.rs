//! Daemon configuration

use anyhow::Result;
use metricflow_core::scheduler::ReportSchedulerConfig;
use metricflow_core::EngineConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Report daemon configuration, read from `REPORTD_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct ReportdConfig {
    /// JSON dataset seeding the in-memory store; empty store when unset
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,

    /// Directory receiving generated report files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_sweep")]
    pub cache_sweep_secs: u64,

    #[serde(default = "default_hourly_interval")]
    pub hourly_interval_secs: u64,

    #[serde(default = "default_daily_interval")]
    pub daily_interval_secs: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "metricflow".to_string())
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_cache_sweep() -> u64 {
    300
}

fn default_hourly_interval() -> u64 {
    3600
}

fn default_daily_interval() -> u64 {
    86400
}

impl ReportdConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_builder(
            config::Config::builder().add_source(config::Environment::with_prefix("REPORTD")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("cache_sweep_secs", self.cache_sweep_secs),
            ("hourly_interval_secs", self.hourly_interval_secs),
            ("daily_interval_secs", self.daily_interval_secs),
        ] {
            anyhow::ensure!(secs > 0, "{} must be greater than zero", name);
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            cache_sweep_interval: Duration::from_secs(self.cache_sweep_secs),
            instance_name: self.instance_name.clone(),
            ..EngineConfig::default()
        }
    }

    pub fn scheduler_config(&self) -> ReportSchedulerConfig {
        ReportSchedulerConfig {
            hourly_interval: Duration::from_secs(self.hourly_interval_secs),
            daily_interval: Duration::from_secs(self.daily_interval_secs),
            ..ReportSchedulerConfig::default()
        }
    }
}
