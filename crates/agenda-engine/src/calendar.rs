//! Raw scheduled-item records as delivered by a calendar store.
//!
//! The shape mirrors common calendar REST feeds: each boundary carries either
//! a precise `dateTime` or a date-only `date`, items may be flagged
//! `transparent` (non-blocking), and attendees identify counterparts.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::{resolve_local, DstPolicy};
use crate::error::{EngineError, Result};
use crate::interval::BusyInterval;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// One boundary of a scheduled item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// A boundary after parsing, before it is placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTime {
    Instant(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(instant.to_rfc3339()),
            date: None,
        }
    }

    pub fn on(date: NaiveDate) -> Self {
        Self {
            date_time: None,
            date: Some(date.format("%Y-%m-%d").to_string()),
        }
    }

    /// Parse the boundary, preferring `dateTime` and falling back to `date`.
    ///
    /// Offset-less timestamps are interpreted in `tz`.
    pub fn resolve(&self, tz: Tz, policy: DstPolicy) -> Result<ResolvedTime> {
        if let Some(raw) = self.date_time.as_deref() {
            return parse_timestamp(raw, tz, policy).map(ResolvedTime::Instant);
        }
        if let Some(raw) = self.date.as_deref() {
            let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|e| EngineError::Malformed(format!("invalid date '{}': {}", raw, e)))?;
            return Ok(ResolvedTime::Date(date));
        }
        Err(EngineError::Malformed("time has neither dateTime nor date".to_string()))
    }
}

/// Parse an RFC 3339 timestamp, or a naive one interpreted in `tz`.
pub fn parse_timestamp(raw: &str, tz: Tz, policy: DstPolicy) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return resolve_local(tz, naive, policy).ok_or_else(|| {
                EngineError::Malformed(format!("'{}' does not exist in {}", raw, tz))
            });
        }
    }
    Err(EngineError::Malformed(format!("invalid timestamp '{}'", raw)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    #[serde(default, rename = "self")]
    pub is_self: bool,
}

/// A scheduled item as listed by the calendar store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

impl RawEvent {
    /// Items marked `transparent` do not block time.
    pub fn is_non_blocking(&self) -> bool {
        self.transparency
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("transparent"))
    }

    pub fn label(&self) -> &str {
        self.summary.as_deref().unwrap_or("Busy")
    }

    /// The first attendee that is not the calendar owner.
    pub fn counterpart(&self) -> Option<&str> {
        self.attendees
            .iter()
            .find(|a| !a.is_self && !a.email.trim().is_empty())
            .map(|a| a.email.as_str())
    }

    pub fn has_counterpart(&self, counterpart: &str) -> bool {
        self.attendees
            .iter()
            .any(|a| !a.is_self && a.email.eq_ignore_ascii_case(counterpart))
    }

    /// Convert into a busy interval on the reference timeline.
    ///
    /// Date-only boundaries are local midnights. A date-only item whose end is
    /// not after its start covers the whole start day.
    pub fn to_interval(&self, tz: Tz, policy: DstPolicy) -> Result<BusyInterval> {
        let start = self.start.resolve(tz, policy)?;
        let end = self.end.resolve(tz, policy)?;
        let label = self.label();

        let interval = match (start, end) {
            (ResolvedTime::Date(s), ResolvedTime::Date(e)) if e <= s => {
                BusyInterval::all_day(s, tz, label)
            }
            _ => BusyInterval::new(midnight(start, tz)?, midnight(end, tz)?, label),
        };
        interval.ok_or_else(|| {
            EngineError::Malformed(format!("event '{}' ends before it starts", self.id))
        })
    }

    /// Start instant of the item, if it parses.
    pub fn start_instant(&self, tz: Tz, policy: DstPolicy) -> Result<DateTime<Utc>> {
        midnight(self.start.resolve(tz, policy)?, tz)
    }
}

fn midnight(time: ResolvedTime, tz: Tz) -> Result<DateTime<Utc>> {
    match time {
        ResolvedTime::Instant(dt) => Ok(dt),
        ResolvedTime::Date(date) => date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| resolve_local(tz, naive, DstPolicy::ShiftForward))
            .ok_or_else(|| EngineError::Malformed(format!("cannot place date {}", date))),
    }
}

/// An item the engine asks the calendar store to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<String>,
}

impl NewEvent {
    pub fn meeting(
        summary: impl Into<String>,
        start: DateTime<Utc>,
        duration_minutes: u32,
        counterpart: impl Into<String>,
    ) -> Self {
        Self {
            summary: summary.into(),
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
            attendees: vec![counterpart.into()],
        }
    }
}
