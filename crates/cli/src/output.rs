//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use metricflow_core::TrendDirection;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        print_warning("No items found");
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a value with up to four decimals, trimming trailing zeros
pub fn format_value(value: f64) -> String {
    let formatted = format!("{:.4}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Format a percentage change with an explicit sign
pub fn format_change(pct: f64) -> String {
    format!("{:+.2}%", pct)
}

/// Color a trend direction
pub fn color_trend(trend: TrendDirection) -> String {
    let label = trend.as_str();
    match trend {
        TrendDirection::Up => label.green().to_string(),
        TrendDirection::Down => label.red().to_string(),
        TrendDirection::Stable => label.blue().to_string(),
        TrendDirection::InsufficientData => label.dimmed().to_string(),
    }
}

/// Color a correlation coefficient by strength
pub fn color_coefficient(r: f64) -> String {
    let formatted = format!("{:+.3}", r);
    if r.abs() >= 0.7 {
        formatted.green().bold().to_string()
    } else if r.abs() >= 0.3 {
        formatted.yellow().to_string()
    } else {
        formatted.dimmed().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(14.0), "14");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(1.0 / 3.0), "0.3333");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(71.428), "+71.43%");
        assert_eq!(format_change(-5.0), "-5.00%");
    }
}
