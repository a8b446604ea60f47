//! Busy intervals and the overlap test behind every availability query.
//!
//! Intervals are half-open `[start, end)`. A meeting that starts exactly when a
//! busy interval ends, or ends exactly when one starts, is NOT a conflict.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::{resolve_local, DstPolicy};

/// A time range during which the calendar owner is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

impl BusyInterval {
    /// Create an interval, returning `None` when `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, label: impl Into<String>) -> Option<Self> {
        if end < start {
            return None;
        }
        Some(Self {
            start,
            end,
            label: label.into(),
        })
    }

    /// Full-day interval for a date-only marker: local midnight to the next
    /// local midnight in the reference timezone.
    pub fn all_day(date: NaiveDate, tz: Tz, label: impl Into<String>) -> Option<Self> {
        let next = date.succ_opt()?;
        let start = resolve_local(tz, date.and_hms_opt(0, 0, 0)?, DstPolicy::ShiftForward)?;
        let end = resolve_local(tz, next.and_hms_opt(0, 0, 0)?, DstPolicy::ShiftForward)?;
        Self::new(start, end, label)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Does a meeting of `tolerance_minutes` starting at `point` collide with `interval`?
///
/// True iff `point < interval.end && point + tolerance > interval.start`.
pub fn overlaps(interval: &BusyInterval, point: DateTime<Utc>, tolerance_minutes: i64) -> bool {
    let candidate_end = point + Duration::minutes(tolerance_minutes);
    point < interval.end && candidate_end > interval.start
}
