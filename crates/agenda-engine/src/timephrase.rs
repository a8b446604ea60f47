//! Turn an extracted time phrase into an instant.
//!
//! The extractor hands back free text such as "next Tuesday 2pm" or an ISO
//! timestamp. Exact formats are tried first; anything else goes through the
//! `interim` natural-language parser relative to "now" in the reference
//! timezone. Results are pushed into the future when the phrase leaves the
//! date implicit.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use interim::{parse_date_string, Dialect};

use crate::calendar::parse_timestamp;
use crate::dst::DstPolicy;

const NONE_MARKERS: &[&str] = &["none", "none found", "n/a", "na", "null", "unknown", "tbd"];
const FILLER_WORDS: &[&str] = &["at", "around", "about", "on", "@", "for"];
const WEEKDAYS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "mon", "tue",
    "tues", "wed", "thu", "thurs", "fri", "sat", "sun",
];

/// Parse `phrase` into a future instant, or `None` when it names no usable time.
pub fn parse_time_phrase(
    phrase: &str,
    now: DateTime<Utc>,
    tz: Tz,
    policy: DstPolicy,
) -> Option<DateTime<Utc>> {
    let trimmed = phrase.trim().trim_end_matches(['.', '?', '!', ',']);
    if trimmed.is_empty() || NONE_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
        return None;
    }

    if let Ok(exact) = parse_timestamp(trimmed, tz, policy) {
        return (exact > now).then_some(exact);
    }

    let normalized = normalize(trimmed);
    let parsed = match parse_date_string(&normalized, now.with_timezone(&tz), Dialect::Us) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            tracing::debug!(phrase = %trimmed, error = ?e, "time phrase not understood");
            return None;
        }
    };

    prefer_future(parsed, now, names_weekday(&normalized))
}

/// Roll a past result forward once: by a week for weekday phrases, else a day.
fn prefer_future(
    parsed: DateTime<Utc>,
    now: DateTime<Utc>,
    weekday: bool,
) -> Option<DateTime<Utc>> {
    if parsed > now {
        return Some(parsed);
    }
    let rolled = parsed + if weekday { Duration::days(7) } else { Duration::days(1) };
    (rolled > now).then_some(rolled)
}

fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| c == ',' || c == '?' || c == '!'))
        .filter(|word| !word.is_empty())
        .filter(|word| !FILLER_WORDS.contains(&word.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn names_weekday(phrase: &str) -> bool {
    phrase
        .split_whitespace()
        .any(|word| WEEKDAYS.contains(&word.to_lowercase().as_str()))
}
