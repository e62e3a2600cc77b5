//! Bucket reduction into aggregation records

use super::Bucket;
use crate::granularity::elapsed_label;
use crate::models::AggregationRecord;

/// Reduce one bucket to min/max/sum/avg/count
///
/// Tags are taken from the bucket's first point. The granularity label is
/// derived from the bucket's own span, so a bucket closed early by the end
/// of input carries a shorter label than the requested granularity.
pub fn aggregate(bucket: &Bucket<'_>) -> AggregationRecord {
    let first = bucket.first();
    let mut min = first.value;
    let mut max = first.value;
    let mut sum = 0.0;

    for point in bucket.points() {
        min = min.min(point.value);
        max = max.max(point.value);
        sum += point.value;
    }

    let count = bucket.len() as u64;

    AggregationRecord {
        metric_id: first.metric_id.clone(),
        start_time: bucket.start(),
        end_time: bucket.end(),
        granularity: elapsed_label(bucket.start(), bucket.end()),
        min,
        max,
        avg: sum / count as f64,
        sum,
        count,
        tags: first.tags.clone(),
    }
}

/// Aggregate every bucket in order
pub fn aggregate_all(buckets: &[Bucket<'_>]) -> Vec<AggregationRecord> {
    buckets.iter().map(aggregate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::IntervalBucketer;
    use crate::models::{DataPoint, Tags};
    use chrono::{Duration, TimeZone, Utc};

    fn point(minute: i64, value: f64, tag: Option<&str>) -> DataPoint {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        DataPoint {
            metric_id: "cpu".to_string(),
            timestamp: base + Duration::minutes(minute),
            value,
            tags: tag.map(|t| Tags::from([("host".to_string(), t.to_string())])),
        }
    }

    #[test]
    fn test_statistics_invariants() {
        let points: Vec<_> = [3.0, -1.5, 7.25, 0.0, 2.0]
            .iter()
            .enumerate()
            .map(|(i, v)| point(i as i64, *v, None))
            .collect();
        let buckets = IntervalBucketer::with_window(Duration::hours(1)).split(&points);
        let record = aggregate(&buckets[0]);

        assert_eq!(record.count, 5);
        assert_eq!(record.min, -1.5);
        assert_eq!(record.max, 7.25);
        assert!((record.sum - 10.75).abs() < 1e-9);
        assert!((record.avg - record.sum / record.count as f64).abs() < 1e-12);
        assert!(record.min <= record.avg && record.avg <= record.max);
        assert!(record.start_time <= record.end_time);
    }

    #[test]
    fn test_first_point_tags_win() {
        let points = vec![point(0, 1.0, Some("a")), point(1, 2.0, Some("b"))];
        let buckets = IntervalBucketer::with_window(Duration::hours(1)).split(&points);
        let record = aggregate(&buckets[0]);
        assert_eq!(record.tags.unwrap()["host"], "a");
    }

    #[test]
    fn test_label_reflects_actual_span() {
        let points = vec![point(0, 1.0, None), point(45, 2.0, None)];
        let buckets = IntervalBucketer::with_window(Duration::hours(1)).split(&points);
        let record = aggregate(&buckets[0]);
        assert_eq!(record.granularity, "45m");
        assert_eq!(record.end_time, points[1].timestamp);
    }

    #[test]
    fn test_worked_example_five_minute_buckets() {
        let points: Vec<_> = (0..10).map(|m| point(m, 10.0 + 2.0 * m as f64, None)).collect();
        let buckets = IntervalBucketer::with_window(Duration::minutes(5)).split(&points);
        let records = aggregate_all(&buckets);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].avg, 14.0);
        assert_eq!(records[1].avg, 24.0);
        assert_eq!(records[0].start_time, points[0].timestamp);
        assert_eq!(records[0].end_time, points[4].timestamp);
        assert_eq!(records[1].start_time, points[5].timestamp);
        assert_eq!(records[1].end_time, points[9].timestamp);
        assert_eq!(records[0].granularity, "4m");
    }
}
