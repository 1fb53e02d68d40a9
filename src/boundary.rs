//! Boundary repair for windows that start inside a dark phase.
//!
//! If recording begins after lights-off, the real onset predates the data
//! and early events have nothing to attach to. The first light onset is
//! shifted back by half a cycle and used as a synthetic leading onset.

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::records::OnsetEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    /// Strictly increasing onsets, synthetic one first when present
    pub onsets: Vec<OnsetEvent>,
    pub synthetic: Option<OnsetEvent>,
}

/// Synthetic onset half a cycle before the first light onset
pub fn synthesize_onset(first_light_onset: NaiveDateTime, half_cycle: Duration) -> Option<OnsetEvent> {
    first_light_onset
        .checked_sub_signed(half_cycle)
        .map(OnsetEvent::from_datetime)
}

/// Prepend the synthetic onset when it falls strictly before every detected
/// onset. A later or equal synthetic onset means the window already opens in
/// the light phase and the detected onsets cover it.
pub fn repair(
    detected: &[OnsetEvent],
    first_light_onset: Option<NaiveDateTime>,
    half_cycle: Duration,
) -> Repaired {
    let mut onsets: Vec<OnsetEvent> = detected.to_vec();
    onsets.dedup();

    let synthetic = first_light_onset
        .and_then(|at| synthesize_onset(at, half_cycle))
        .filter(|candidate| onsets.first().map_or(true, |first| candidate < first));

    match synthetic {
        Some(onset) => {
            debug!(date = %onset.date, time = %onset.time, "synthesized leading onset");
            onsets.insert(0, onset);
        }
        None if first_light_onset.is_none() => {
            debug!("no light onset in sensor stream, boundary repair skipped");
        }
        None => {}
    }

    Repaired { onsets, synthetic }
}
