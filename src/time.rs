//! Time-to-live policy and date arithmetic.

use crate::error::{HookError, Result};
use chrono::{Datelike, Local, NaiveDate, TimeZone};
use std::time::SystemTime;
#[cfg(test)]
use std::time::Duration;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Number of whole days between two instants, rounded up.
///
/// Symmetric in its arguments. Any fraction of a day past a whole-day boundary
/// counts as the next day, so a file exactly `ttl` days old is still within a
/// `ttl` policy while anything older is not.
pub fn days_apart(a: SystemTime, b: SystemTime) -> u64 {
    let diff = match a.duration_since(b) {
        Ok(diff) => diff,
        Err(err) => err.duration(),
    };

    let secs = diff.as_secs();
    let whole_days = secs / SECONDS_PER_DAY;
    if secs % SECONDS_PER_DAY != 0 || diff.subsec_nanos() != 0 {
        whole_days + 1
    } else {
        whole_days
    }
}

/// Retention threshold evaluated against a fixed reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    ttl_days: u64,
    now: SystemTime,
}

impl TtlPolicy {
    pub fn new(ttl_days: u64, now: SystemTime) -> Self {
        TtlPolicy { ttl_days, now }
    }

    pub fn ttl_days(&self) -> u64 {
        self.ttl_days
    }

    pub fn now(&self) -> SystemTime {
        self.now
    }

    /// True once a file modified at `mtime` is more than `ttl_days` days away from `now`.
    pub fn is_expired(&self, mtime: SystemTime) -> bool {
        days_apart(mtime, self.now) > self.ttl_days
    }
}

/// Parse a TTL into whole days.
///
/// Plain numbers are days. Suffixes: h (hours), d (days), w (weeks), m (months of
/// 30 days). Hour values round up to the next whole day.
/// Examples: "15", "15d", "2w", "3m", "48h"
pub fn parse_ttl(ttl_str: &str) -> Result<u64> {
    let ttl_str = ttl_str.trim();

    let (num_str, unit) = if let Some(pos) = ttl_str.find(|c: char| c.is_alphabetic()) {
        let (num, unit) = ttl_str.split_at(pos);
        (num, Some(unit))
    } else {
        (ttl_str, None)
    };

    let value: u64 = num_str.trim().parse().map_err(|_| {
        HookError::Config(format!(
            "Invalid ttl format. Expected a number, got: {}",
            num_str
        ))
    })?;

    let days = match unit {
        None | Some("d") | Some("D") => Some(value),
        Some("h") | Some("H") => Some(value.div_ceil(24)),
        Some("w") | Some("W") => value.checked_mul(7),
        Some("m") | Some("M") => value.checked_mul(30),
        Some(unknown) => {
            return Err(HookError::Config(format!(
                "Invalid ttl unit '{}'. Supported units: h (hours), d (days), w (weeks), m (months)",
                unknown
            )));
        }
    };

    days.ok_or_else(|| HookError::Config(format!("ttl '{}' is too large", ttl_str)))
}

/// Parse a date string in YYYY-MM-DD format to local midnight of that day.
pub fn parse_date(date_str: &str) -> Result<SystemTime> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
        HookError::Config(format!(
            "Invalid date format. Expected YYYY-MM-DD, got: {}",
            date_str
        ))
    })?;

    // NaiveDate doesn't have year limits
    let year = date.year();
    if !(1970..=2100).contains(&year) {
        return Err(HookError::Config(format!(
            "Year must be between 1970 and 2100, got: {}",
            year
        )));
    }

    let naive_datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| HookError::Config("Failed to create midnight time".to_string()))?;
    let local_datetime = Local
        .from_local_datetime(&naive_datetime)
        .single()
        .ok_or_else(|| {
            HookError::Config(format!("Ambiguous or invalid local time for {}", date_str))
        })?;

    Ok(local_datetime.into())
}

/// `days` whole days expressed as a [`Duration`], saturating on overflow.
#[cfg(test)]
pub(crate) fn days(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY))
}
