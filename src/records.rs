//! Record types flowing through the pipeline.
//!
//! All records are immutable values: every stage reads its input and
//! produces new records. Timestamps are kept as a (date, time) pair the way
//! the loggers write them; ordering is by date, then time.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::offset::CycleOffset;
use crate::{LEVEL_OFF, LEVEL_ON};

/// One illumination reading from an environment sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub illumination: f64,
    #[serde(default)]
    pub location: String,
}

impl SensorSample {
    pub fn new(date: NaiveDate, time: NaiveTime, illumination: f64) -> Self {
        Self {
            date,
            time,
            illumination,
            location: String::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Binary light state of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    On,
    Off,
}

impl LightState {
    pub fn level(self) -> i32 {
        match self {
            LightState::On => LEVEL_ON,
            LightState::Off => LEVEL_OFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSample {
    pub sample: SensorSample,
    pub state: LightState,
}

impl ClassifiedSample {
    pub fn at(&self) -> NaiveDateTime {
        self.sample.at()
    }
}

/// Start of a dark phase (ON -> OFF transition point)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OnsetEvent {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl OnsetEvent {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    pub fn from_datetime(at: NaiveDateTime) -> Self {
        Self {
            date: at.date(),
            time: at.time(),
        }
    }

    pub fn at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Externally supplied behavioral event. Everything except the timestamp is
/// opaque payload and passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl EventRecord {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date,
            time,
            payload: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// First payload key that collides with an annotation key
    pub fn reserved_key(&self) -> Option<&'static str> {
        ANNOTATION_KEYS
            .iter()
            .copied()
            .find(|key| self.payload.contains_key(*key))
    }
}

/// Onset stamped onto an event by the as-of join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Assignment {
    Assigned { onset: OnsetEvent },
    /// No onset precedes the event, even after boundary repair
    Unassigned,
}

impl Assignment {
    pub fn onset(&self) -> Option<OnsetEvent> {
        match self {
            Assignment::Assigned { onset } => Some(*onset),
            Assignment::Unassigned => None,
        }
    }
}

impl From<Option<OnsetEvent>> for Assignment {
    fn from(onset: Option<OnsetEvent>) -> Self {
        match onset {
            Some(onset) => Assignment::Assigned { onset },
            None => Assignment::Unassigned,
        }
    }
}

/// Output keys written next to the event payload. A payload field with one
/// of these names would be shadowed in the annotated record.
pub const ANNOTATION_KEYS: [&str; 4] = ["cycle_date", "assignment", "offset", "offset_seconds"];

/// Event plus its assigned onset and offset into the dark cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedEventRecord {
    #[serde(flatten)]
    pub event: EventRecord,
    /// Calendar date the offset is reported against. Equals the event date
    /// unless normalization wrapped the offset into the previous day.
    pub cycle_date: NaiveDate,
    pub assignment: Assignment,
    pub offset: Option<CycleOffset>,
    pub offset_seconds: Option<i64>,
}

impl AnnotatedEventRecord {
    pub fn new(event: EventRecord, assignment: Assignment, offset: Option<CycleOffset>) -> Self {
        Self {
            cycle_date: event.date,
            offset_seconds: offset.map(|o| o.num_seconds()),
            event,
            assignment,
            offset,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self.assignment, Assignment::Unassigned)
    }

    pub fn assigned_onset(&self) -> Option<OnsetEvent> {
        self.assignment.onset()
    }
}
