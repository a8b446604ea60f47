//! Availability index built from a raw calendar feed.
//!
//! The index is the set of busy intervals intersecting a lookahead horizon,
//! kept sorted by start time. It is built once per poll cycle and never
//! mutated afterwards; the next cycle builds a fresh one.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::RawEvent;
use crate::dst::{resolve_local, DstPolicy};
use crate::interval::{overlaps, BusyInterval};

/// The forward window `[start, end)` an index was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Horizon {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[now, now + days)`.
    pub fn from_now(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: now,
            end: now + Duration::days(i64::from(days)),
        }
    }

    fn intersects(&self, interval: &BusyInterval) -> bool {
        // Zero-length markers at the horizon start still count.
        interval.start < self.end && (interval.end > self.start || interval.start == self.start)
    }
}

/// Busy intervals for one poll cycle.
#[derive(Debug, Clone)]
pub struct AvailabilityIndex {
    intervals: Vec<BusyInterval>,
    horizon: Horizon,
    tz: Tz,
}

impl AvailabilityIndex {
    /// Build the index from a raw calendar feed.
    ///
    /// Non-blocking items are dropped. Items whose times fail to parse are
    /// logged and skipped; a single bad record never aborts the build.
    pub fn build(events: &[RawEvent], horizon: Horizon, tz: Tz, policy: DstPolicy) -> Self {
        let intervals = events
            .iter()
            .filter(|event| !event.is_non_blocking())
            .filter_map(|event| match event.to_interval(tz, policy) {
                Ok(interval) => Some(interval),
                Err(e) => {
                    tracing::warn!(event_id = %event.id, error = %e, "skipping unparseable calendar item");
                    None
                }
            })
            .filter(|interval| horizon.intersects(interval))
            .collect();

        Self::from_intervals(intervals, horizon, tz)
    }

    /// Build the index from already-normalized intervals.
    pub fn from_intervals(mut intervals: Vec<BusyInterval>, horizon: Horizon, tz: Tz) -> Self {
        intervals.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
        Self {
            intervals,
            horizon,
            tz,
        }
    }

    pub fn intervals(&self) -> &[BusyInterval] {
        &self.intervals
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// The instant the index was built at (the horizon start).
    pub fn now(&self) -> DateTime<Utc> {
        self.horizon.start
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Test whether a meeting of `duration_minutes` starting at `candidate` is free.
    ///
    /// Returns `(false, Some(label))` for the first conflicting interval found.
    /// Which label is reported when several intervals conflict is unspecified.
    pub fn is_free(&self, candidate: DateTime<Utc>, duration_minutes: i64) -> (bool, Option<String>) {
        let candidate_end = candidate + Duration::minutes(duration_minutes);
        // Only intervals starting before the candidate ends can collide.
        let upper = self.intervals.partition_point(|iv| iv.start < candidate_end);

        match self.intervals[..upper]
            .iter()
            .find(|iv| overlaps(iv, candidate, duration_minutes))
        {
            Some(conflict) => (false, Some(conflict.label.clone())),
            None => (true, None),
        }
    }

    /// [`is_free`](Self::is_free) for a timezone-naive candidate, fixed to the
    /// reference timezone first. A wall-clock time that does not exist under
    /// `policy` is reported as not free, with no label.
    pub fn is_free_local(
        &self,
        candidate: NaiveDateTime,
        duration_minutes: i64,
        policy: DstPolicy,
    ) -> (bool, Option<String>) {
        match resolve_local(self.tz, candidate, policy) {
            Some(instant) => self.is_free(instant, duration_minutes),
            None => (false, None),
        }
    }

    /// Merge overlapping or adjacent busy periods, clipped to the horizon.
    ///
    /// Returns a sorted, non-overlapping list of (start, end) intervals.
    pub fn merged(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();

        // Intervals are already sorted by (start, end).
        for iv in &self.intervals {
            let start = iv.start.max(self.horizon.start);
            let end = iv.end.min(self.horizon.end);
            if start >= end {
                continue;
            }
            if let Some(last) = merged.last_mut() {
                if start <= last.1 {
                    last.1 = last.1.max(end);
                    continue;
                }
            }
            merged.push((start, end));
        }

        merged
    }
}
