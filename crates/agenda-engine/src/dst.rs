//! DST transition policies for local wall-clock times.
//!
//! Daily slot windows and naive calendar timestamps are expressed in the
//! reference timezone's wall clock. Around DST transitions a wall-clock time
//! may not exist (spring forward) or may exist twice (fall back).

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Policy for local times that fall into a DST gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Drop the time entirely (e.g. 02:30 during spring forward yields nothing).
    Skip,
    /// Move to the first valid wall-clock time after the gap.
    #[default]
    ShiftForward,
}

/// Resolve a local wall-clock time in `tz` to a UTC instant.
///
/// Ambiguous times (fall back) resolve to the earlier instant. Nonexistent
/// times follow `policy`.
pub fn resolve_local(tz: Tz, local: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return Some(dt.with_timezone(&Utc));
    }

    match policy {
        DstPolicy::Skip => None,
        DstPolicy::ShiftForward => {
            // Gaps are at most a few hours; step minute by minute up to a day.
            let mut shifted = local;
            for _ in 0..(24 * 60) {
                shifted += Duration::minutes(1);
                if let Some(dt) = tz.from_local_datetime(&shifted).earliest() {
                    return Some(dt.with_timezone(&Utc));
                }
            }
            None
        }
    }
}
