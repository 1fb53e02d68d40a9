//! Alignment errors.
//!
//! Events that precede every onset are not errors: they come back marked
//! `Assignment::Unassigned` and are listed in the run report.

use std::fmt;

/// Which input stream a malformed record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Sensor,
    Event,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Sensor => write!(f, "sensor"),
            Stream::Event => write!(f, "event"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    #[error("malformed {stream} stream at record {index}: {reason}")]
    MalformedInput {
        stream: Stream,
        index: usize,
        reason: String,
    },

    /// `candidates == 0`: the stream never crossed the threshold.
    /// Otherwise the plausibility window rejected every candidate.
    #[error("no dark-cycle onset detected ({})", no_onset_hint(.candidates))]
    NoOnsetDetected { candidates: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn no_onset_hint(candidates: &usize) -> String {
    if *candidates == 0 {
        "no light transition in sensor stream, check illumination threshold".to_string()
    } else {
        format!("plausibility window rejected all {candidates} candidates")
    }
}

pub type AlignResult<T> = Result<T, AlignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_cause() {
        let e = AlignError::NoOnsetDetected { candidates: 0 };
        assert!(e.to_string().contains("threshold"));

        let e = AlignError::NoOnsetDetected { candidates: 4 };
        assert!(e.to_string().contains("rejected all 4"));

        let e = AlignError::MalformedInput {
            stream: Stream::Event,
            index: 7,
            reason: "out of order".into(),
        };
        assert_eq!(e.to_string(), "malformed event stream at record 7: out of order");
    }
}
