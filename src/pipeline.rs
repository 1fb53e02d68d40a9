//! Composed alignment run.
//!
//! sensor samples -> classified -> transitions -> boundary repair ->
//! plausibility filter -> cleaned onsets
//! events + cleaned onsets -> as-of join -> offsets -> (normalization)
//!
//! Inputs are validated up front: the join is only correct on sorted
//! streams, so ordering problems fail the run instead of being repaired.

use chrono::NaiveDateTime;
use tracing::{debug, info, info_span, warn};

use crate::boundary;
use crate::classify::classify_stream;
use crate::config::AlignConfig;
use crate::error::{AlignError, AlignResult, Stream};
use crate::join::assign_onsets;
use crate::offset;
use crate::onset::TransitionDetector;
use crate::outlier;
use crate::records::{AnnotatedEventRecord, EventRecord, OnsetEvent, SensorSample};

/// Onset sequence after repair and filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedOnsets {
    pub onsets: Vec<OnsetEvent>,
    /// Leading synthetic onset, if it survived filtering
    pub synthetic: Option<OnsetEvent>,
    pub rejected: Vec<OnsetEvent>,
}

/// Result of a full run
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// One record per input event, in input order
    pub records: Vec<AnnotatedEventRecord>,
    pub onsets: Vec<OnsetEvent>,
    pub synthetic_onset: Option<OnsetEvent>,
    pub rejected_onsets: Vec<OnsetEvent>,
    /// Indices into `records` of events preceding every onset
    pub unassigned: Vec<usize>,
}

fn ensure_ordered<I>(keys: I, stream: Stream) -> AlignResult<()>
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let mut previous: Option<NaiveDateTime> = None;
    for (index, at) in keys.into_iter().enumerate() {
        if let Some(prev) = previous {
            if at < prev {
                return Err(AlignError::MalformedInput {
                    stream,
                    index,
                    reason: format!("timestamp {at} precedes {prev}"),
                });
            }
        }
        previous = Some(at);
    }
    Ok(())
}

pub fn check_sensor_stream(samples: &[SensorSample]) -> AlignResult<()> {
    if let Some(index) = samples.iter().position(|s| !s.illumination.is_finite()) {
        return Err(AlignError::MalformedInput {
            stream: Stream::Sensor,
            index,
            reason: format!("illumination reading {} is not finite", samples[index].illumination),
        });
    }
    ensure_ordered(samples.iter().map(SensorSample::at), Stream::Sensor)
}

pub fn check_event_stream(events: &[EventRecord]) -> AlignResult<()> {
    for (index, event) in events.iter().enumerate() {
        if let Some(key) = event.reserved_key() {
            return Err(AlignError::MalformedInput {
                stream: Stream::Event,
                index,
                reason: format!("payload field '{key}' collides with an output annotation"),
            });
        }
    }
    ensure_ordered(events.iter().map(EventRecord::at), Stream::Event)
}

/// Detect, repair, and filter dark-cycle onsets from one sensor stream
pub fn clean_onsets(samples: &[SensorSample], config: &AlignConfig) -> AlignResult<CleanedOnsets> {
    config.validate()?;
    check_sensor_stream(samples)?;

    let mut detected = Vec::new();
    let mut first_light = None;
    for transition in TransitionDetector::new(classify_stream(samples, config.illumination_threshold)) {
        if transition.is_dark_onset() {
            detected.push(OnsetEvent::from_datetime(transition.at));
        } else if first_light.is_none() {
            first_light = Some(transition.at);
        }
    }
    debug!(
        samples = samples.len(),
        dark_onsets = detected.len(),
        first_light_onset = ?first_light,
        "transitions detected"
    );

    let repaired = boundary::repair(&detected, first_light, config.half_cycle());
    let candidates = repaired.onsets.len();

    let filtered = outlier::filter(&repaired.onsets, config.plausibility_window.as_ref());
    if !filtered.rejected.is_empty() {
        info!(rejected = filtered.rejected.len(), "dropped implausible onset candidates");
    }

    if filtered.kept.is_empty() {
        return Err(AlignError::NoOnsetDetected { candidates });
    }

    let synthetic = repaired
        .synthetic
        .filter(|s| filtered.kept.first() == Some(s));

    Ok(CleanedOnsets {
        onsets: filtered.kept,
        synthetic,
        rejected: filtered.rejected,
    })
}

fn apply_normalization(mut record: AnnotatedEventRecord) -> AnnotatedEventRecord {
    if let Some(raw) = record.offset {
        let (wrapped, cycle_date) = offset::normalize(raw, record.event.date);
        record.offset = Some(wrapped);
        record.offset_seconds = Some(wrapped.num_seconds());
        record.cycle_date = cycle_date;
    }
    record
}

/// Align events to the dark-cycle onsets found in `samples`
pub fn normalize(
    events: &[EventRecord],
    samples: &[SensorSample],
    config: &AlignConfig,
) -> AlignResult<Alignment> {
    let span = info_span!("darkonset.normalize", events = events.len(), samples = samples.len());
    let _enter = span.enter();

    check_event_stream(events)?;
    let cleaned = clean_onsets(samples, config)?;

    let mut records = assign_onsets(events, &cleaned.onsets);
    if config.normalize_to_positive_cycle {
        records = records.into_iter().map(apply_normalization).collect();
    }

    let unassigned: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_unassigned())
        .map(|(i, _)| i)
        .collect();

    if !unassigned.is_empty() {
        warn!(
            count = unassigned.len(),
            first_onset = %cleaned.onsets[0].at(),
            "events precede every dark-cycle onset and stay unassigned"
        );
    }
    info!(
        onsets = cleaned.onsets.len(),
        synthetic = cleaned.synthetic.is_some(),
        annotated = records.len() - unassigned.len(),
        unassigned = unassigned.len(),
        "alignment complete"
    );

    Ok(Alignment {
        records,
        onsets: cleaned.onsets,
        synthetic_onset: cleaned.synthetic,
        rejected_onsets: cleaned.rejected,
        unassigned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn sample(day: u32, h: u32, lux: f64) -> SensorSample {
        SensorSample::new(date(day), NaiveTime::from_hms_opt(h, 0, 0).unwrap(), lux)
    }

    fn event(day: u32, h: u32) -> EventRecord {
        EventRecord::new(date(day), NaiveTime::from_hms_opt(h, 0, 0).unwrap())
    }

    #[test]
    fn test_out_of_order_events_fail_fast() {
        let samples = vec![sample(1, 12, 50.0), sample(1, 18, 0.0)];
        let events = vec![event(1, 20), event(1, 19)];
        let err = normalize(&events, &samples, &AlignConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AlignError::MalformedInput { stream: Stream::Event, index: 1, .. }
        ));
    }

    #[test]
    fn test_payload_shadowing_annotation_is_malformed() {
        let samples = vec![sample(1, 12, 50.0), sample(1, 18, 0.0)];
        let events = vec![event(1, 19), event(1, 20).with_field("assignment", 3)];
        let err = normalize(&events, &samples, &AlignConfig::default()).unwrap_err();
        match err {
            AlignError::MalformedInput { stream, index, reason } => {
                assert_eq!(stream, Stream::Event);
                assert_eq!(index, 1);
                assert!(reason.contains("'assignment'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_order_samples_fail_fast() {
        let samples = vec![sample(2, 12, 50.0), sample(1, 18, 0.0)];
        let err = clean_onsets(&samples, &AlignConfig::default()).unwrap_err();
        assert!(matches!(err, AlignError::MalformedInput { stream: Stream::Sensor, .. }));
    }

    #[test]
    fn test_nan_reading_is_malformed() {
        let samples = vec![sample(1, 12, 50.0), sample(1, 13, f64::NAN)];
        let err = clean_onsets(&samples, &AlignConfig::default()).unwrap_err();
        assert!(matches!(err, AlignError::MalformedInput { index: 1, .. }));
    }

    #[test]
    fn test_constant_light_reports_no_onset() {
        let samples = vec![sample(1, 12, 50.0), sample(1, 18, 60.0)];
        let err = clean_onsets(&samples, &AlignConfig::default()).unwrap_err();
        assert!(matches!(err, AlignError::NoOnsetDetected { candidates: 0 }));
    }

    #[test]
    fn test_overaggressive_window_reports_no_onset() {
        let samples = vec![sample(1, 12, 50.0), sample(1, 18, 0.0)];
        let config = AlignConfig {
            plausibility_window: Some("06:00-08:00".parse().unwrap()),
            ..AlignConfig::default()
        };
        let err = clean_onsets(&samples, &config).unwrap_err();
        assert!(matches!(err, AlignError::NoOnsetDetected { candidates: 1 }));
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let config = AlignConfig {
            illumination_threshold: f64::INFINITY,
            ..AlignConfig::default()
        };
        let err = clean_onsets(&[], &config).unwrap_err();
        assert!(matches!(err, AlignError::InvalidConfig(_)));
    }

    #[test]
    fn test_synthetic_onset_dropped_by_window() {
        // Window starts dark; first light onset at 06:00 gives synthetic 18:00,
        // outside a morning-only window.
        let samples = vec![sample(1, 0, 0.0), sample(1, 6, 50.0), sample(2, 9, 0.0)];
        let config = AlignConfig {
            plausibility_window: Some("08:00-10:00".parse().unwrap()),
            ..AlignConfig::default()
        };
        let cleaned = clean_onsets(&samples, &config).unwrap();
        assert!(cleaned.synthetic.is_none());
        assert_eq!(cleaned.onsets.len(), 1);
        assert_eq!(cleaned.rejected.len(), 1);
    }
}
