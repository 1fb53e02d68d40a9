//! JSON record streams in and out.
//!
//! Sensor file: array of {date, time, illumination, location}.
//! Event file:  array of {date, time, ...}; extra fields pass through.
//! Output:      array of annotated events.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{AlignError, AlignResult, Stream};
use crate::pipeline::check_event_stream;
use crate::records::{AnnotatedEventRecord, EventRecord, SensorSample};

const MAX_INPUT_BYTES: u64 = 1 << 30;

/// Parse a JSON array of records. A file that is not a JSON array is a
/// `Json` error; a record that does not fit `T` is `MalformedInput` at its
/// index.
fn read_json_array<T: DeserializeOwned>(path: &Path, stream: Stream, limit: u64) -> AlignResult<Vec<T>> {
    let len = fs::metadata(path)?.len();
    if len > limit {
        return Err(AlignError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is {} bytes, limit is {}", path.display(), len, limit),
        )));
    }
    let content = fs::read_to_string(path)?;
    let raw: Vec<Value> = serde_json::from_str(&content)?;
    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value).map_err(|e| AlignError::MalformedInput {
                stream,
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Keep the samples of one location. Without a selection the stream must
/// already be single-location.
pub fn select_location(
    samples: Vec<SensorSample>,
    location: Option<&str>,
) -> AlignResult<Vec<SensorSample>> {
    match location {
        Some(wanted) => {
            let selected: Vec<SensorSample> =
                samples.into_iter().filter(|s| s.location == wanted).collect();
            if selected.is_empty() {
                return Err(AlignError::InvalidConfig(format!(
                    "no sensor samples for location '{wanted}'"
                )));
            }
            Ok(selected)
        }
        None => {
            let locations: BTreeSet<&str> = samples.iter().map(|s| s.location.as_str()).collect();
            if locations.len() > 1 {
                let index = samples
                    .iter()
                    .position(|s| s.location != samples[0].location)
                    .unwrap_or(0);
                return Err(AlignError::MalformedInput {
                    stream: Stream::Sensor,
                    index,
                    reason: format!(
                        "stream mixes {} locations, select one with --location",
                        locations.len()
                    ),
                });
            }
            Ok(samples)
        }
    }
}

pub fn read_sensor_stream(path: &Path, location: Option<&str>) -> AlignResult<Vec<SensorSample>> {
    let samples: Vec<SensorSample> = read_json_array(path, Stream::Sensor, MAX_INPUT_BYTES)?;
    let total = samples.len();
    let selected = select_location(samples, location)?;
    debug!(path = %path.display(), total, selected = selected.len(), "loaded sensor stream");
    Ok(selected)
}

pub fn read_event_stream(path: &Path) -> AlignResult<Vec<EventRecord>> {
    let events: Vec<EventRecord> = read_json_array(path, Stream::Event, MAX_INPUT_BYTES)?;
    check_event_stream(&events)?;
    debug!(path = %path.display(), events = events.len(), "loaded event stream");
    Ok(events)
}

pub fn write_annotated<W: Write>(mut out: W, records: &[AnnotatedEventRecord]) -> AlignResult<()> {
    serde_json::to_writer_pretty(&mut out, records)?;
    writeln!(out)?;
    Ok(())
}
