//! Trend direction and volatility over aggregation records

use super::stats::population_std_dev;
use crate::models::{AggregationRecord, TrendDirection, TrendResult};

/// Derive a trend from records ordered ascending by start time
///
/// Percentage change compares the `avg` of the first and last record only.
/// Volatility is the population standard deviation of every record's `avg`.
/// A zero first average has no defined percentage change; it yields a
/// change of 0 and a `stable` trend while volatility is still reported.
pub fn analyze(records: &[AggregationRecord]) -> TrendResult {
    let [first, .., last] = records else {
        return TrendResult::insufficient_data();
    };

    let averages: Vec<f64> = records.iter().map(|r| r.avg).collect();
    let volatility = population_std_dev(&averages);

    let percentage_change = if first.avg == 0.0 {
        0.0
    } else {
        let change = (last.avg - first.avg) / first.avg * 100.0;
        if change.is_finite() {
            change
        } else {
            0.0
        }
    };

    TrendResult {
        trend: direction(percentage_change),
        percentage_change,
        volatility,
    }
}

fn direction(percentage_change: f64) -> TrendDirection {
    if percentage_change > 0.0 {
        TrendDirection::Up
    } else if percentage_change < 0.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn records(avgs: &[f64]) -> Vec<AggregationRecord> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        avgs.iter()
            .enumerate()
            .map(|(i, avg)| AggregationRecord {
                metric_id: "cpu".to_string(),
                start_time: base + Duration::hours(i as i64),
                end_time: base + Duration::hours(i as i64) + Duration::minutes(59),
                granularity: "59m".to_string(),
                min: *avg,
                max: *avg,
                avg: *avg,
                sum: *avg,
                count: 1,
                tags: None,
            })
            .collect()
    }

    #[test]
    fn test_insufficient_data() {
        assert_eq!(analyze(&[]), TrendResult::insufficient_data());
        assert_eq!(analyze(&records(&[5.0])), TrendResult::insufficient_data());
    }

    #[test]
    fn test_up_trend_worked_example() {
        let result = analyze(&records(&[14.0, 24.0]));
        assert_eq!(result.trend, TrendDirection::Up);
        assert!((result.percentage_change - 71.428_571).abs() < 1e-3);
        assert!((result.volatility - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_uses_endpoints_not_extremes() {
        let result = analyze(&records(&[10.0, 100.0, 1.0, 9.0]));
        assert_eq!(result.trend, TrendDirection::Down);
        assert!((result.percentage_change + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_stable_trend() {
        let result = analyze(&records(&[3.0, 6.0, 3.0]));
        assert_eq!(result.trend, TrendDirection::Stable);
        assert_eq!(result.percentage_change, 0.0);
        assert!(result.volatility > 0.0);
    }

    #[test]
    fn test_zero_baseline_is_stable_and_finite() {
        let result = analyze(&records(&[0.0, 12.0]));
        assert_eq!(result.trend, TrendDirection::Stable);
        assert_eq!(result.percentage_change, 0.0);
        assert!((result.volatility - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_baseline_sign() {
        // (-5 - -10) / -10 = -50 %
        let result = analyze(&records(&[-10.0, -5.0]));
        assert_eq!(result.trend, TrendDirection::Down);
        assert!((result.percentage_change + 50.0).abs() < 1e-9);
    }
}
