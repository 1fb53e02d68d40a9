//! darkonset - realign behavioral event timestamps to the dark cycle.
//!
//! Wall-clock time shifts across a daylight-saving transition while the
//! facility light schedule does not. This crate detects dark-cycle onsets
//! from an illumination sensor stream and re-expresses every event (cage
//! visits, nosepokes, ...) as an offset from the most recent onset.
//!
//! Stages, leaves first:
//!   classify -> onset -> boundary -> outlier -> join -> offset
//!
//! `pipeline::normalize` composes all of them.

pub mod boundary;
pub mod classify;
pub mod config;
pub mod error;
pub mod io;
pub mod join;
pub mod offset;
pub mod onset;
pub mod outlier;
pub mod pipeline;
pub mod records;

pub use config::AlignConfig;
pub use error::AlignError;
pub use outlier::PlausibilityWindow;
pub use pipeline::{normalize, Alignment};
pub use records::{
    AnnotatedEventRecord, Assignment, ClassifiedSample, EventRecord, LightState, OnsetEvent,
    SensorSample,
};

/// Illumination below this reading counts as dark (sensor units)
pub const DEFAULT_ILLUMINATION_THRESHOLD: f64 = 5.0;

/// Half of the assumed 24h light/dark split, used by boundary repair
pub const DEFAULT_HALF_CYCLE_MINUTES: i64 = 12 * 60;

/// Numeric levels for the two light states. The gap keeps its sign so one
/// subtraction tells dark onsets (negative) from light onsets (positive).
pub const LEVEL_ON: i32 = 10;
pub const LEVEL_OFF: i32 = 0;

pub const MINUTES_PER_DAY: i64 = 24 * 60;
pub const SECONDS_PER_DAY: i64 = 86400;
