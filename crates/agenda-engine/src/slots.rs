//! Alternative slot search within category-specific daily windows.
//!
//! Each meeting category has a fixed wall-clock window in the reference
//! timezone. Search starts the day after "now" and walks forward one day at a
//! time, probing candidates every [`SLOT_STEP_MINUTES`] from the window start.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityIndex;
use crate::dst::{resolve_local, DstPolicy};

/// Spacing between probed candidate start times.
pub const SLOT_STEP_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum MeetingCategory {
    Breakfast,
    Lunch,
    Dinner,
    #[default]
    General,
}

/// A daily `[start, end)` wall-clock window, in minutes after local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl DailyWindow {
    const fn hm(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> Self {
        Self {
            start_minute: start_h * 60 + start_m,
            end_minute: end_h * 60 + end_m,
        }
    }

    fn local_bound(minute: u32, day: NaiveDate) -> Option<NaiveDateTime> {
        day.and_hms_opt(minute / 60, minute % 60, 0)
    }
}

const BREAKFAST: DailyWindow = DailyWindow::hm(8, 0, 11, 45);
const LUNCH: DailyWindow = DailyWindow::hm(12, 0, 14, 30);
const DINNER: DailyWindow = DailyWindow::hm(17, 0, 21, 0);
const GENERAL: DailyWindow = DailyWindow::hm(9, 0, 17, 0);

impl MeetingCategory {
    pub fn window(self) -> DailyWindow {
        match self {
            MeetingCategory::Breakfast => BREAKFAST,
            MeetingCategory::Lunch => LUNCH,
            MeetingCategory::Dinner => DINNER,
            MeetingCategory::General => GENERAL,
        }
    }

    /// Infer a category from an item label by keyword containment.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("lunch") {
            MeetingCategory::Lunch
        } else if label.contains("dinner") {
            MeetingCategory::Dinner
        } else if label.contains("breakfast") {
            MeetingCategory::Breakfast
        } else {
            MeetingCategory::General
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeetingCategory::Breakfast => "breakfast",
            MeetingCategory::Lunch => "lunch",
            MeetingCategory::Dinner => "dinner",
            MeetingCategory::General => "general",
        }
    }
}

impl fmt::Display for MeetingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized names fall back to `general`.
impl FromStr for MeetingCategory {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "breakfast" => MeetingCategory::Breakfast,
            "lunch" => MeetingCategory::Lunch,
            "dinner" => MeetingCategory::Dinner,
            _ => MeetingCategory::General,
        })
    }
}

impl From<String> for MeetingCategory {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(category) => category,
            Err(never) => match never {},
        }
    }
}

/// Find up to `limit` free start times for a meeting of `duration_minutes`.
///
/// Searches the `lookahead_days` days following the index's current day,
/// earliest first. Returns an empty list when nothing fits; that means "no
/// alternative available", not failure.
pub fn find_slots(
    index: &AvailabilityIndex,
    category: MeetingCategory,
    duration_minutes: u32,
    limit: usize,
    lookahead_days: u32,
) -> Vec<DateTime<Utc>> {
    find_slots_with_policy(
        index,
        category,
        duration_minutes,
        limit,
        lookahead_days,
        DstPolicy::default(),
    )
}

/// [`find_slots`] with an explicit policy for window boundaries inside DST gaps.
pub fn find_slots_with_policy(
    index: &AvailabilityIndex,
    category: MeetingCategory,
    duration_minutes: u32,
    limit: usize,
    lookahead_days: u32,
    policy: DstPolicy,
) -> Vec<DateTime<Utc>> {
    let mut found = Vec::new();
    if limit == 0 || duration_minutes == 0 {
        return found;
    }

    let tz = index.timezone();
    let today = index.now().with_timezone(&tz).date_naive();
    let window = category.window();
    let duration = Duration::minutes(i64::from(duration_minutes));
    let step = Duration::minutes(SLOT_STEP_MINUTES);

    for offset in 1..=u64::from(lookahead_days) {
        let Some(day) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        let bounds = (
            DailyWindow::local_bound(window.start_minute, day)
                .and_then(|local| resolve_local(tz, local, policy)),
            DailyWindow::local_bound(window.end_minute, day)
                .and_then(|local| resolve_local(tz, local, policy)),
        );
        let (Some(window_start), Some(window_end)) = bounds else {
            tracing::debug!(%day, %category, "window boundary skipped by DST policy");
            continue;
        };

        let mut candidate = window_start;
        while candidate + duration <= window_end {
            if index.is_free(candidate, i64::from(duration_minutes)).0 {
                found.push(candidate);
                if found.len() >= limit {
                    return found;
                }
            }
            candidate += step;
        }
    }

    found
}
