//! Tests for building the availability index and testing candidate times.

use agenda_engine::{
    AvailabilityIndex, Attendee, BusyInterval, DstPolicy, EventTime, Horizon, RawEvent,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn utc() -> Tz {
    "UTC".parse().unwrap()
}

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn timed(id: &str, summary: &str, start: &str, end: &str) -> RawEvent {
    RawEvent {
        id: id.to_string(),
        summary: Some(summary.to_string()),
        start: EventTime {
            date_time: Some(start.to_string()),
            date: None,
        },
        end: EventTime {
            date_time: Some(end.to_string()),
            date: None,
        },
        transparency: None,
        attendees: vec![],
    }
}

fn horizon() -> Horizon {
    Horizon::from_now(ts("2026-03-16T08:00:00Z"), 7)
}

fn standup_and_lunch() -> AvailabilityIndex {
    let events = vec![
        timed("a", "Standup", "2026-03-17T09:00:00Z", "2026-03-17T09:30:00Z"),
        timed("b", "Lunch", "2026-03-17T12:00:00Z", "2026-03-17T13:00:00Z"),
    ];
    AvailabilityIndex::build(&events, horizon(), utc(), DstPolicy::default())
}

// ── Scenario: Standup and Lunch ─────────────────────────────────────────────

#[test]
fn standup_conflict_reports_label() {
    let index = standup_and_lunch();
    assert_eq!(
        index.is_free(ts("2026-03-17T09:15:00Z"), 15),
        (false, Some("Standup".to_string()))
    );
}

#[test]
fn gap_between_standup_and_lunch_is_free() {
    let index = standup_and_lunch();
    assert_eq!(index.is_free(ts("2026-03-17T10:00:00Z"), 30), (true, None));
}

#[test]
fn boundaries_are_half_open() {
    let index = standup_and_lunch();
    // Starts exactly when Standup ends.
    assert!(index.is_free(ts("2026-03-17T09:30:00Z"), 30).0);
    // Ends exactly when Lunch starts.
    assert!(index.is_free(ts("2026-03-17T11:30:00Z"), 30).0);
    // One minute too long.
    assert!(!index.is_free(ts("2026-03-17T11:30:00Z"), 31).0);
}

#[test]
fn long_interval_before_candidate_still_conflicts() {
    let events = vec![
        timed("long", "Offsite", "2026-03-17T08:00:00Z", "2026-03-17T18:00:00Z"),
        timed("short", "Call", "2026-03-17T09:00:00Z", "2026-03-17T09:15:00Z"),
    ];
    let index = AvailabilityIndex::build(&events, horizon(), utc(), DstPolicy::default());

    assert_eq!(
        index.is_free(ts("2026-03-17T15:00:00Z"), 30),
        (false, Some("Offsite".to_string()))
    );
}

#[test]
fn multiple_conflicts_report_one_of_them() {
    let events = vec![
        timed("x", "Review", "2026-03-17T14:00:00Z", "2026-03-17T15:00:00Z"),
        timed("y", "Interview", "2026-03-17T14:30:00Z", "2026-03-17T15:30:00Z"),
    ];
    let index = AvailabilityIndex::build(&events, horizon(), utc(), DstPolicy::default());

    let (free, label) = index.is_free(ts("2026-03-17T14:45:00Z"), 30);
    assert!(!free);
    let label = label.unwrap();
    assert!(label == "Review" || label == "Interview");
}

// ── Build filtering ─────────────────────────────────────────────────────────

#[test]
fn transparent_items_do_not_block() {
    let mut event = timed("t", "Focus (free)", "2026-03-17T10:00:00Z", "2026-03-17T11:00:00Z");
    event.transparency = Some("transparent".to_string());
    let index = AvailabilityIndex::build(&[event], horizon(), utc(), DstPolicy::default());

    assert!(index.is_empty());
    assert!(index.is_free(ts("2026-03-17T10:00:00Z"), 60).0);
}

#[test]
fn opaque_items_block() {
    let mut event = timed("o", "Review", "2026-03-17T10:00:00Z", "2026-03-17T11:00:00Z");
    event.transparency = Some("opaque".to_string());
    let index = AvailabilityIndex::build(&[event], horizon(), utc(), DstPolicy::default());

    assert_eq!(index.len(), 1);
}

#[test]
fn malformed_items_are_skipped_not_fatal() {
    let events = vec![
        timed("bad", "Broken", "not a time", "2026-03-17T11:00:00Z"),
        timed("backwards", "Backwards", "2026-03-17T11:00:00Z", "2026-03-17T10:00:00Z"),
        RawEvent {
            id: "empty".to_string(),
            summary: None,
            start: EventTime::default(),
            end: EventTime::default(),
            transparency: None,
            attendees: vec![],
        },
        timed("good", "Standup", "2026-03-17T09:00:00Z", "2026-03-17T09:30:00Z"),
    ];
    let index = AvailabilityIndex::build(&events, horizon(), utc(), DstPolicy::default());

    assert_eq!(index.len(), 1);
    assert_eq!(index.intervals()[0].label, "Standup");
}

#[test]
fn items_outside_horizon_are_dropped() {
    let events = vec![
        timed("past", "Yesterday", "2026-03-15T09:00:00Z", "2026-03-15T10:00:00Z"),
        timed("far", "Next month", "2026-04-20T09:00:00Z", "2026-04-20T10:00:00Z"),
        timed("in", "Tomorrow", "2026-03-17T09:00:00Z", "2026-03-17T10:00:00Z"),
    ];
    let index = AvailabilityIndex::build(&events, horizon(), utc(), DstPolicy::default());

    assert_eq!(index.len(), 1);
    assert_eq!(index.intervals()[0].label, "Tomorrow");
}

#[test]
fn missing_summary_is_labelled_busy() {
    let mut event = timed("n", "", "2026-03-17T09:00:00Z", "2026-03-17T10:00:00Z");
    event.summary = None;
    let index = AvailabilityIndex::build(&[event], horizon(), utc(), DstPolicy::default());

    assert_eq!(
        index.is_free(ts("2026-03-17T09:00:00Z"), 30),
        (false, Some("Busy".to_string()))
    );
}

#[test]
fn intervals_are_sorted_regardless_of_feed_order() {
    let events = vec![
        timed("c", "Late", "2026-03-18T15:00:00Z", "2026-03-18T16:00:00Z"),
        timed("a", "Early", "2026-03-17T09:00:00Z", "2026-03-17T10:00:00Z"),
        timed("b", "Middle", "2026-03-17T13:00:00Z", "2026-03-17T14:00:00Z"),
    ];
    let index = AvailabilityIndex::build(&events, horizon(), utc(), DstPolicy::default());

    let labels: Vec<&str> = index.intervals().iter().map(|iv| iv.label.as_str()).collect();
    assert_eq!(labels, vec!["Early", "Middle", "Late"]);
}

// ── Timezone normalization ──────────────────────────────────────────────────

#[test]
fn naive_event_times_use_reference_timezone() {
    let tz: Tz = "America/New_York".parse().unwrap();
    // 09:00 local New York == 13:00 UTC (EDT, after 2026-03-08).
    let events = vec![timed("ny", "Standup", "2026-03-17T09:00:00", "2026-03-17T09:30:00")];
    let index = AvailabilityIndex::build(&events, horizon(), tz, DstPolicy::default());

    assert_eq!(index.intervals()[0].start, ts("2026-03-17T13:00:00Z"));
    assert!(!index.is_free(ts("2026-03-17T13:15:00Z"), 15).0);
    assert!(index.is_free(ts("2026-03-17T09:15:00Z"), 15).0);
}

#[test]
fn offset_event_times_are_respected() {
    let events = vec![timed(
        "off",
        "Call",
        "2026-03-17T10:00:00+02:00",
        "2026-03-17T11:00:00+02:00",
    )];
    let index = AvailabilityIndex::build(&events, horizon(), utc(), DstPolicy::default());

    assert_eq!(index.intervals()[0].start, ts("2026-03-17T08:00:00Z"));
}

#[test]
fn naive_candidate_is_fixed_to_reference_timezone() {
    let tz: Tz = "America/New_York".parse().unwrap();
    let events = vec![timed("ny", "Standup", "2026-03-17T13:00:00Z", "2026-03-17T13:30:00Z")];
    let index = AvailabilityIndex::build(&events, horizon(), tz, DstPolicy::default());

    let local_nine = NaiveDate::from_ymd_opt(2026, 3, 17)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    assert_eq!(
        index.is_free_local(local_nine, 15, DstPolicy::default()),
        (false, Some("Standup".to_string()))
    );
}

#[test]
fn date_only_items_block_the_whole_local_day() {
    let tz: Tz = "America/New_York".parse().unwrap();
    let event = RawEvent {
        id: "holiday".to_string(),
        summary: Some("Holiday".to_string()),
        start: EventTime::on(NaiveDate::from_ymd_opt(2026, 3, 18).unwrap()),
        end: EventTime::on(NaiveDate::from_ymd_opt(2026, 3, 19).unwrap()),
        transparency: None,
        attendees: vec![Attendee {
            email: "me@example.com".to_string(),
            is_self: true,
        }],
    };
    let index = AvailabilityIndex::build(&[event], horizon(), tz, DstPolicy::default());

    // Local midnight 2026-03-18 in New York is 04:00 UTC.
    assert_eq!(index.intervals()[0].start, ts("2026-03-18T04:00:00Z"));
    assert_eq!(index.intervals()[0].end, ts("2026-03-19T04:00:00Z"));
    assert!(!index.is_free(ts("2026-03-18T20:00:00Z"), 30).0);
    assert!(index.is_free(ts("2026-03-19T04:00:00Z"), 30).0);
}

#[test]
fn same_day_date_only_item_becomes_full_day() {
    let day = NaiveDate::from_ymd_opt(2026, 3, 18).unwrap();
    let event = RawEvent {
        id: "ooo".to_string(),
        summary: Some("Out of office".to_string()),
        start: EventTime::on(day),
        end: EventTime::on(day),
        transparency: None,
        attendees: vec![],
    };
    let index = AvailabilityIndex::build(&[event], horizon(), utc(), DstPolicy::default());

    assert_eq!(index.intervals()[0].duration_minutes(), 24 * 60);
}

// ── Merged view ─────────────────────────────────────────────────────────────

#[test]
fn merged_combines_overlapping_and_adjacent_intervals() {
    let events = vec![
        timed("a", "A", "2026-03-17T09:00:00Z", "2026-03-17T10:00:00Z"),
        timed("b", "B", "2026-03-17T09:30:00Z", "2026-03-17T10:30:00Z"),
        timed("c", "C", "2026-03-17T10:30:00Z", "2026-03-17T11:00:00Z"),
        timed("d", "D", "2026-03-17T14:00:00Z", "2026-03-17T15:00:00Z"),
    ];
    let index = AvailabilityIndex::build(&events, horizon(), utc(), DstPolicy::default());

    assert_eq!(
        index.merged(),
        vec![
            (ts("2026-03-17T09:00:00Z"), ts("2026-03-17T11:00:00Z")),
            (ts("2026-03-17T14:00:00Z"), ts("2026-03-17T15:00:00Z")),
        ]
    );
}

#[test]
fn merged_clips_to_horizon() {
    let intervals = vec![BusyInterval::new(
        ts("2026-03-16T06:00:00Z"),
        ts("2026-03-16T09:00:00Z"),
        "Early",
    )
    .unwrap()];
    let index = AvailabilityIndex::from_intervals(intervals, horizon(), utc());

    assert_eq!(
        index.merged(),
        vec![(ts("2026-03-16T08:00:00Z"), ts("2026-03-16T09:00:00Z"))]
    );
}

#[test]
fn empty_feed_builds_empty_index() {
    let index = AvailabilityIndex::build(&[], horizon(), utc(), DstPolicy::default());
    assert!(index.is_empty());
    assert!(index.merged().is_empty());
    assert_eq!(index.now(), ts("2026-03-16T08:00:00Z"));
    assert_eq!(index.horizon().end, ts("2026-03-23T08:00:00Z"));
}

#[test]
fn timestamps_helper_matches_utc_constructor() {
    assert_eq!(ts("2026-03-17T09:00:00Z"), Utc.with_ymd_and_hms(2026, 3, 17, 9, 0, 0).unwrap());
}
