//! Property-based tests for the conflict test using proptest.
//!
//! For any set of busy intervals and any candidate, `is_free` must be false
//! exactly when some interval satisfies `t < a.end && t + d > a.start`.

use agenda_engine::{AvailabilityIndex, BusyInterval, Horizon};
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap()
}

/// Intervals within a three-day span at 5-minute granularity, so boundaries
/// collide with candidates often.
fn arb_interval() -> impl Strategy<Value = BusyInterval> {
    (0i64..864, 0i64..48).prop_map(|(start_slot, len_slots)| {
        let start = base() + Duration::minutes(start_slot * 5);
        let end = start + Duration::minutes(len_slots * 5);
        BusyInterval::new(start, end, format!("busy-{}", start_slot)).unwrap()
    })
}

fn arb_candidate() -> impl Strategy<Value = (DateTime<Utc>, i64)> {
    (0i64..864, 1i64..=24).prop_map(|(slot, len)| (base() + Duration::minutes(slot * 5), len * 5))
}

proptest! {
    #[test]
    fn is_free_matches_brute_force(
        intervals in prop::collection::vec(arb_interval(), 0..40),
        (candidate, duration) in arb_candidate(),
    ) {
        let tz: Tz = "UTC".parse().unwrap();
        let horizon = Horizon::from_now(base(), 7);
        let index = AvailabilityIndex::from_intervals(intervals.clone(), horizon, tz);

        let expected_busy = intervals.iter().any(|a| {
            candidate < a.end && candidate + Duration::minutes(duration) > a.start
        });
        let (free, label) = index.is_free(candidate, duration);

        prop_assert_eq!(free, !expected_busy);
        prop_assert_eq!(label.is_some(), expected_busy);
    }

    #[test]
    fn reported_label_belongs_to_a_conflicting_interval(
        intervals in prop::collection::vec(arb_interval(), 1..40),
        (candidate, duration) in arb_candidate(),
    ) {
        let tz: Tz = "UTC".parse().unwrap();
        let horizon = Horizon::from_now(base(), 7);
        let index = AvailabilityIndex::from_intervals(intervals.clone(), horizon, tz);

        if let (false, Some(label)) = index.is_free(candidate, duration) {
            let conflicting = intervals.iter().any(|a| {
                a.label == label
                    && candidate < a.end
                    && candidate + Duration::minutes(duration) > a.start
            });
            prop_assert!(conflicting, "label {} does not conflict", label);
        }
    }
}
