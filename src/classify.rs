//! Illumination classifier.
//!
//! Fixed threshold, no hysteresis or self-calibration. The threshold is a
//! per-installation calibration value and comes from `AlignConfig`.

use crate::records::{ClassifiedSample, LightState, SensorSample};

pub fn state_for(illumination: f64, threshold: f64) -> LightState {
    if illumination < threshold {
        LightState::Off
    } else {
        LightState::On
    }
}

pub fn classify(sample: &SensorSample, threshold: f64) -> ClassifiedSample {
    ClassifiedSample {
        state: state_for(sample.illumination, threshold),
        sample: sample.clone(),
    }
}

/// Lazily classify a stream of samples
pub fn classify_stream<'a, I>(samples: I, threshold: f64) -> impl Iterator<Item = ClassifiedSample> + 'a
where
    I: IntoIterator<Item = &'a SensorSample>,
    I::IntoIter: 'a,
{
    samples.into_iter().map(move |s| classify(s, threshold))
}
