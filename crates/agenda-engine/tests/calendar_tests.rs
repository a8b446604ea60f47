use agenda_engine::calendar::parse_timestamp;
use agenda_engine::collaborators::counterpart_address;
use agenda_engine::{DstPolicy, EngineError, InboundMessage, NewEvent, RawEvent};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use chrono_tz::UTC;

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn feed_item(json: &str) -> RawEvent {
    serde_json::from_str(json).unwrap()
}

// ── Timestamps ──────────────────────────────────────────────────────────────

#[test]
fn offset_timestamp_is_normalized() {
    let parsed = parse_timestamp("2026-03-17T09:00:00-04:00", UTC, DstPolicy::ShiftForward);
    assert_eq!(parsed.unwrap(), ts("2026-03-17T13:00:00Z"));
}

#[test]
fn naive_timestamp_uses_reference_zone() {
    let parsed = parse_timestamp("2026-03-17 09:00", New_York, DstPolicy::ShiftForward);
    assert_eq!(parsed.unwrap(), ts("2026-03-17T13:00:00Z"));
}

#[test]
fn skipped_local_time_is_malformed_under_skip_policy() {
    let parsed = parse_timestamp("2026-03-08T02:30:00", New_York, DstPolicy::Skip);
    assert!(matches!(parsed, Err(EngineError::Malformed(_))));
}

#[test]
fn garbage_timestamp_is_malformed() {
    assert!(parse_timestamp("next tuesday-ish", UTC, DstPolicy::ShiftForward).is_err());
}

// ── Feed records ────────────────────────────────────────────────────────────

#[test]
fn feed_record_deserializes() {
    let event = feed_item(
        r#"{
            "id": "evt-1",
            "summary": "Lunch with Ada",
            "start": {"dateTime": "2026-03-17T12:00:00Z"},
            "end": {"dateTime": "2026-03-17T13:00:00Z"},
            "attendees": [
                {"email": "me@example.com", "self": true},
                {"email": "ada@example.com"}
            ]
        }"#,
    );

    assert_eq!(event.label(), "Lunch with Ada");
    assert_eq!(event.counterpart(), Some("ada@example.com"));
    assert!(event.has_counterpart("ADA@example.com"));
    assert!(!event.has_counterpart("me@example.com"));
    assert!(!event.is_non_blocking());

    let interval = event.to_interval(UTC, DstPolicy::ShiftForward).unwrap();
    assert_eq!(interval.start, ts("2026-03-17T12:00:00Z"));
    assert_eq!(interval.duration_minutes(), 60);
}

#[test]
fn untitled_item_is_labelled_busy() {
    let event = feed_item(
        r#"{"id": "x", "start": {"dateTime": "2026-03-17T12:00:00Z"}, "end": {"dateTime": "2026-03-17T13:00:00Z"}}"#,
    );
    assert_eq!(event.label(), "Busy");
    assert_eq!(event.counterpart(), None);
}

#[test]
fn transparency_flag_is_case_insensitive() {
    let event = feed_item(
        r#"{"id": "x", "transparency": "Transparent", "start": {"date": "2026-03-17"}, "end": {"date": "2026-03-18"}}"#,
    );
    assert!(event.is_non_blocking());
}

#[test]
fn date_only_item_spans_local_days() {
    let event = feed_item(
        r#"{"id": "trip", "summary": "Conference", "start": {"date": "2026-03-17"}, "end": {"date": "2026-03-19"}}"#,
    );
    let interval = event.to_interval(New_York, DstPolicy::ShiftForward).unwrap();
    assert_eq!(interval.start, ts("2026-03-17T04:00:00Z"));
    assert_eq!(interval.end, ts("2026-03-19T04:00:00Z"));
}

#[test]
fn boundary_without_time_is_malformed() {
    let event = feed_item(r#"{"id": "x", "start": {}, "end": {"date": "2026-03-18"}}"#);
    assert!(matches!(
        event.to_interval(UTC, DstPolicy::ShiftForward),
        Err(EngineError::Malformed(_))
    ));
}

#[test]
fn reversed_item_is_malformed() {
    let event = feed_item(
        r#"{"id": "x", "start": {"dateTime": "2026-03-17T13:00:00Z"}, "end": {"dateTime": "2026-03-17T12:00:00Z"}}"#,
    );
    assert!(event.to_interval(UTC, DstPolicy::ShiftForward).is_err());
}

#[test]
fn new_meeting_spans_duration() {
    let meeting = NewEvent::meeting("Meeting with ada", ts("2026-03-17T10:00:00Z"), 45, "ada@example.com");
    assert_eq!(meeting.end, ts("2026-03-17T10:45:00Z"));
    assert_eq!(meeting.attendees, vec!["ada@example.com".to_string()]);
}

#[test]
fn event_time_helpers_round_trip_through_resolve() {
    let date = NaiveDate::from_ymd_opt(2026, 3, 17).unwrap();
    let event = RawEvent {
        id: "x".to_string(),
        summary: None,
        start: agenda_engine::EventTime::on(date),
        end: agenda_engine::EventTime::at(ts("2026-03-17T06:00:00Z")),
        transparency: None,
        attendees: Vec::new(),
    };
    let interval = event.to_interval(UTC, DstPolicy::ShiftForward).unwrap();
    assert_eq!(interval.duration_minutes(), 360);
}

// ── Counterparts ────────────────────────────────────────────────────────────

#[test]
fn display_name_is_stripped_from_sender() {
    assert_eq!(counterpart_address("Ada Lovelace <ada@example.com>"), "ada@example.com");
    assert_eq!(counterpart_address("  ada@example.com "), "ada@example.com");
    assert_eq!(counterpart_address("\"Lovelace, Ada\" < ada@example.com >"), "ada@example.com");
}

#[test]
fn message_counterpart_uses_sender_address() {
    let message = InboundMessage {
        id: "m1".to_string(),
        sender: "Ada <ada@example.com>".to_string(),
        body: String::new(),
    };
    assert_eq!(message.counterpart(), "ada@example.com");
}
