//! Light transition detection.
//!
//! Walks a time-ordered classified stream keeping only the previous state.
//! delta = level(current) - level(previous):
//!   delta < 0  -> dark onset (ON -> OFF)
//!   delta > 0  -> light onset (OFF -> ON)
//! The first sample has no previous state and never emits.
//!
//! The detector is a lazy iterator adapter: one pass, O(1) state, no
//! assumption about cycle period.

use chrono::NaiveDateTime;

use crate::records::{ClassifiedSample, LightState, OnsetEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    DarkOnset,
    LightOnset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub at: NaiveDateTime,
}

impl Transition {
    pub fn is_dark_onset(&self) -> bool {
        self.kind == TransitionKind::DarkOnset
    }

    pub fn is_light_onset(&self) -> bool {
        self.kind == TransitionKind::LightOnset
    }
}

pub struct TransitionDetector<I> {
    samples: I,
    previous: Option<LightState>,
}

impl<I> TransitionDetector<I>
where
    I: Iterator<Item = ClassifiedSample>,
{
    pub fn new(samples: I) -> Self {
        Self {
            samples,
            previous: None,
        }
    }
}

impl<I> Iterator for TransitionDetector<I>
where
    I: Iterator<Item = ClassifiedSample>,
{
    type Item = Transition;

    fn next(&mut self) -> Option<Transition> {
        for current in self.samples.by_ref() {
            let previous = self.previous.replace(current.state);
            let Some(previous) = previous else {
                continue;
            };

            let delta = current.state.level() - previous.level();
            let kind = match delta.signum() {
                -1 => TransitionKind::DarkOnset,
                1 => TransitionKind::LightOnset,
                _ => continue,
            };
            return Some(Transition {
                kind,
                at: current.at(),
            });
        }
        None
    }
}

/// Lazily yield every dark-cycle onset in a classified stream
pub fn detect_onsets<I>(samples: I) -> impl Iterator<Item = OnsetEvent>
where
    I: IntoIterator<Item = ClassifiedSample>,
{
    TransitionDetector::new(samples.into_iter())
        .filter(Transition::is_dark_onset)
        .map(|t| OnsetEvent::from_datetime(t.at))
}

/// Timestamp of the first OFF -> ON transition, if any
pub fn first_light_onset<I>(samples: I) -> Option<NaiveDateTime>
where
    I: IntoIterator<Item = ClassifiedSample>,
{
    TransitionDetector::new(samples.into_iter())
        .find(Transition::is_light_onset)
        .map(|t| t.at)
}
