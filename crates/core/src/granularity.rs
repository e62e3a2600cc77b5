//! Granularity tokens such as "30", "5m", "1h" or "2d"
//!
//! A token is a leading integer magnitude followed by an optional unit
//! suffix. `m`, `h` and `d` select minutes, hours and days; any other
//! suffix (including none) counts the magnitude in seconds.

use crate::error::{MetricsError, Result};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranularityUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl GranularityUnit {
    fn secs(&self) -> i64 {
        match self {
            GranularityUnit::Seconds => 1,
            GranularityUnit::Minutes => SECS_PER_MINUTE,
            GranularityUnit::Hours => SECS_PER_HOUR,
            GranularityUnit::Days => SECS_PER_DAY,
        }
    }
}

/// Bucket duration or span label, keeping the caller's token as its label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Granularity {
    magnitude: u32,
    unit: GranularityUnit,
    label: String,
}

impl Granularity {
    pub fn parse(token: &str) -> Result<Self> {
        token.parse()
    }

    /// Parse a span label as written on aggregation records
    ///
    /// Same grammar as a bucket token, but a zero magnitude is accepted
    /// since buckets shorter than a minute are labelled "0m".
    pub fn parse_label(token: &str) -> Result<Self> {
        split_token(token)
    }

    pub fn magnitude(&self) -> u32 {
        self.magnitude
    }

    pub fn unit(&self) -> GranularityUnit {
        self.unit
    }

    /// The token as the caller supplied it (trimmed)
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.magnitude as i64 * self.unit.secs())
    }
}

impl FromStr for Granularity {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        let granularity = split_token(s)?;
        if granularity.magnitude == 0 {
            return Err(MetricsError::invalid(format!(
                "granularity '{}' must be greater than zero",
                s
            )));
        }
        Ok(granularity)
    }
}

fn split_token(s: &str) -> Result<Granularity> {
    let token = s.trim();
    let digits_end = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    if digits_end == 0 {
        return Err(MetricsError::invalid(format!(
            "granularity '{}' must start with an integer magnitude",
            s
        )));
    }

    let magnitude: u32 = token[..digits_end].parse().map_err(|_| {
        MetricsError::invalid(format!("granularity '{}' magnitude is out of range", s))
    })?;

    let unit = match token[digits_end..].chars().last() {
        Some('m') => GranularityUnit::Minutes,
        Some('h') => GranularityUnit::Hours,
        Some('d') => GranularityUnit::Days,
        _ => GranularityUnit::Seconds,
    };

    Ok(Granularity {
        magnitude,
        unit,
        label: token.to_string(),
    })
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Label describing the actual elapsed time between two instants
///
/// Whole minutes below an hour render as "Nm", below a day as "Nh",
/// otherwise "Nd". Partial units are floored.
pub fn elapsed_label(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let minutes = (end - start).num_minutes().max(0);
    if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 24 * 60 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}d", minutes / (24 * 60))
    }
}
