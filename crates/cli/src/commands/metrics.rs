//! Metric catalogue commands

use anyhow::Result;
use metricflow_core::{MetricDefinition, MetricsEngine};
use tabled::Tabled;

use crate::output::{print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&MetricDefinition> for MetricRow {
    fn from(def: &MetricDefinition) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            category: def.category.clone(),
            unit: def.unit.clone(),
            description: def.description.clone(),
        }
    }
}

fn print_definitions(definitions: &[MetricDefinition], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(definitions),
        OutputFormat::Table => {
            let rows: Vec<MetricRow> = definitions.iter().map(MetricRow::from).collect();
            print_table(&rows);
            Ok(())
        }
    }
}

/// List every registered metric
pub async fn list_metrics(engine: &MetricsEngine, format: OutputFormat) -> Result<()> {
    let definitions = engine.list_metrics().await?;
    print_definitions(&definitions, format)
}

/// Search metrics by name or description
pub async fn search_metrics(engine: &MetricsEngine, query: &str, format: OutputFormat) -> Result<()> {
    let definitions = engine.search_metrics(query).await?;
    print_definitions(&definitions, format)
}
