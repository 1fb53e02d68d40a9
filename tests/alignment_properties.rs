//! Property tests for transition detection and the as-of join.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use darkonset::classify::classify_stream;
use darkonset::join::assign_onsets;
use darkonset::onset::detect_onsets;
use darkonset::{EventRecord, LightState, OnsetEvent, SensorSample};
use proptest::prelude::*;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn at_minute(minute: u32) -> NaiveDateTime {
    base() + Duration::minutes(minute as i64)
}

fn event_at(at: NaiveDateTime) -> EventRecord {
    EventRecord::new(at.date(), at.time())
}

/// Sorted, de-duplicated minute offsets spanning a few weeks
fn arb_minutes(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..40_000, 0..max_len).prop_map(|mut v| {
        v.sort_unstable();
        v.dedup();
        v
    })
}

fn arb_onsets() -> impl Strategy<Value = Vec<OnsetEvent>> {
    arb_minutes(30).prop_map(|v| {
        v.into_iter()
            .map(|m| OnsetEvent::from_datetime(at_minute(m)))
            .collect()
    })
}

fn arb_events() -> impl Strategy<Value = Vec<EventRecord>> {
    prop::collection::vec(0u32..40_000, 0..60).prop_map(|mut v| {
        v.sort_unstable();
        v.into_iter().map(|m| event_at(at_minute(m))).collect()
    })
}

/// Reference: latest onset at or before the event
fn latest_onset(onsets: &[OnsetEvent], at: NaiveDateTime) -> Option<OnsetEvent> {
    onsets.iter().filter(|o| o.at() <= at).max().copied()
}

proptest! {
    #[test]
    fn onset_count_equals_off_transitions(lit in prop::collection::vec(any::<bool>(), 0..200)) {
        let samples: Vec<SensorSample> = lit
            .iter()
            .enumerate()
            .map(|(i, &on)| {
                let at = at_minute(i as u32 * 5);
                SensorSample::new(at.date(), at.time(), if on { 80.0 } else { 0.0 })
            })
            .collect();

        let expected = lit.windows(2).filter(|w| w[0] && !w[1]).count();
        let detected = detect_onsets(classify_stream(&samples, 5.0)).count();
        prop_assert_eq!(detected, expected);
    }

    #[test]
    fn classification_matches_threshold(reading in 0.0f64..1000.0, threshold in 0.0f64..1000.0) {
        let at = base();
        let samples = vec![SensorSample::new(at.date(), at.time(), reading)];
        let state = classify_stream(&samples, threshold).next().unwrap().state;
        prop_assert_eq!(state == LightState::On, reading >= threshold);
    }

    #[test]
    fn join_matches_reference(onsets in arb_onsets(), events in arb_events()) {
        let joined = assign_onsets(&events, &onsets);
        prop_assert_eq!(joined.len(), events.len());
        for (rec, ev) in joined.iter().zip(&events) {
            prop_assert_eq!(&rec.event, ev);
            prop_assert_eq!(rec.assigned_onset(), latest_onset(&onsets, ev.at()));
        }
    }

    #[test]
    fn join_is_idempotent_on_onset_keys(onsets in arb_onsets(), events in arb_events()) {
        let first = assign_onsets(&events, &onsets);
        let rekeyed: Vec<EventRecord> = first
            .iter()
            .filter_map(|r| r.assigned_onset())
            .map(|o| event_at(o.at()))
            .collect();

        let second = assign_onsets(&rekeyed, &onsets);
        let expected: Vec<_> = first.iter().filter_map(|r| r.assigned_onset()).collect();
        let again: Vec<_> = second.iter().filter_map(|r| r.assigned_onset()).collect();
        prop_assert_eq!(again, expected);
        prop_assert!(second.iter().all(|r| r.offset_seconds == Some(0)));
    }

    #[test]
    fn no_onset_between_means_same_assignment(onsets in arb_onsets(), events in arb_events()) {
        let joined = assign_onsets(&events, &onsets);
        for pair in joined.windows(2) {
            let (a, b) = (pair[0].event.at(), pair[1].event.at());
            let between = onsets.iter().any(|o| o.at() > a && o.at() <= b);
            if !between {
                prop_assert_eq!(pair[0].assigned_onset(), pair[1].assigned_onset());
            }
        }
    }

    #[test]
    fn event_at_onset_gets_that_onset(onsets in arb_onsets()) {
        let events: Vec<EventRecord> = onsets.iter().map(|o| event_at(o.at())).collect();
        let joined = assign_onsets(&events, &onsets);
        for (rec, onset) in joined.iter().zip(&onsets) {
            prop_assert_eq!(rec.assigned_onset(), Some(*onset));
            prop_assert_eq!(rec.offset_seconds, Some(0));
        }
    }
}
