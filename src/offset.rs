//! Offsets from the assigned dark-cycle onset.
//!
//! Offsets are clock-time differences (event time-of-day minus onset
//! time-of-day); the date component is ignored. An event after midnight
//! therefore comes out negative against the previous evening's onset.
//! Normalization wraps negatives into [0, 24h) and moves the reporting
//! date back one day.

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Serialize, Serializer};

use crate::records::{EventRecord, OnsetEvent};
use crate::SECONDS_PER_DAY;

/// Signed duration since dark onset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleOffset(Duration);

impl CycleOffset {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self(Duration::seconds(seconds))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    pub fn num_seconds(&self) -> i64 {
        self.0.num_seconds()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Duration::zero()
    }
}

impl fmt::Display for CycleOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.num_seconds();
        let sign = if secs < 0 { '-' } else { '+' };
        let abs = secs.unsigned_abs();
        write!(f, "{}{:02}:{:02}:{:02}", sign, abs / 3600, (abs / 60) % 60, abs % 60)
    }
}

impl Serialize for CycleOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Time-of-day difference between an event and its onset
pub fn offset(event: &EventRecord, onset: &OnsetEvent) -> CycleOffset {
    CycleOffset(event.time - onset.time)
}

/// Wrap a negative offset into [0, 24h), returning the adjusted date.
/// At the earliest representable date there is no previous day, so the
/// offset stays raw and the date unchanged.
pub fn normalize(offset: CycleOffset, date: NaiveDate) -> (CycleOffset, NaiveDate) {
    if !offset.is_negative() {
        return (offset, date);
    }
    match date.pred_opt() {
        Some(previous) => (CycleOffset(offset.0 + Duration::seconds(SECONDS_PER_DAY)), previous),
        None => (offset, date),
    }
}
