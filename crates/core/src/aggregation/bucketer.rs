//! Interval bucketing of an ordered series
//!
//! Buckets are anchored to the first point of the series, not to calendar
//! boundaries. A new bucket opens at the first point whose elapsed time
//! since the current bucket's anchor reaches the window.

use crate::granularity::Granularity;
use crate::models::DataPoint;
use chrono::{DateTime, Duration, Utc};

/// A contiguous, non-empty run of points from one series
#[derive(Debug, Clone, Copy)]
pub struct Bucket<'a> {
    start: DateTime<Utc>,
    points: &'a [DataPoint],
}

impl<'a> Bucket<'a> {
    /// Anchor timestamp (timestamp of the point that opened the bucket)
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Timestamp of the last point folded into the bucket
    pub fn end(&self) -> DateTime<Utc> {
        self.last().timestamp
    }

    pub fn points(&self) -> &'a [DataPoint] {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &'a DataPoint {
        &self.points[0]
    }

    pub fn last(&self) -> &'a DataPoint {
        &self.points[self.points.len() - 1]
    }
}

/// Splits a timestamp-ordered series into fixed-duration buckets
#[derive(Debug, Clone)]
pub struct IntervalBucketer {
    window: Duration,
}

impl IntervalBucketer {
    pub fn new(granularity: &Granularity) -> Self {
        Self {
            window: granularity.duration(),
        }
    }

    pub fn with_window(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Partition `points` into consecutive buckets
    ///
    /// Empty input yields no buckets. Every point lands in exactly one
    /// bucket and order within each bucket is preserved.
    pub fn split<'a>(&self, points: &'a [DataPoint]) -> Vec<Bucket<'a>> {
        let mut buckets = Vec::new();
        let Some(first) = points.first() else {
            return buckets;
        };

        let mut anchor = first.timestamp;
        let mut open = 0usize;

        for (idx, point) in points.iter().enumerate().skip(1) {
            if point.timestamp - anchor >= self.window {
                buckets.push(Bucket {
                    start: anchor,
                    points: &points[open..idx],
                });
                anchor = point.timestamp;
                open = idx;
            }
        }

        buckets.push(Bucket {
            start: anchor,
            points: &points[open..],
        });
        buckets
    }
}
