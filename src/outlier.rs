//! Time-of-day plausibility filter for onset candidates.
//!
//! A light switched on briefly during the night produces a real OFF -> ON ->
//! OFF pair that the detector cannot tell from a cycle boundary. Candidates
//! whose clock time falls outside the configured window are dropped.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::records::OnsetEvent;

/// Half-open clock range `[start, end)`. `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlausibilityWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PlausibilityWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.wraps_midnight() {
            time >= self.start || time < self.end
        } else {
            time >= self.start && time < self.end
        }
    }
}

impl fmt::Display for PlausibilityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

impl FromStr for PlausibilityWindow {
    type Err = String;

    /// Parse `HH:MM-HH:MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid window '{s}', expected HH:MM-HH:MM"))?;
        Ok(Self {
            start: parse_clock(start)?,
            end: parse_clock(end)?,
        })
    }
}

/// Parse `HH:MM` or `HH:MM:SS`
pub fn parse_clock(s: &str) -> Result<NaiveTime, String> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| format!("invalid time of day '{s}'"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    pub kept: Vec<OnsetEvent>,
    pub rejected: Vec<OnsetEvent>,
}

/// Split onsets into plausible and rejected. No window keeps everything.
pub fn filter(onsets: &[OnsetEvent], window: Option<&PlausibilityWindow>) -> Filtered {
    let Some(window) = window else {
        return Filtered {
            kept: onsets.to_vec(),
            rejected: Vec::new(),
        };
    };

    let (kept, rejected): (Vec<OnsetEvent>, Vec<OnsetEvent>) =
        onsets.iter().copied().partition(|o| window.contains(o.time));

    for onset in &rejected {
        debug!(date = %onset.date, time = %onset.time, %window, "rejected implausible onset");
    }

    Filtered { kept, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn onset(day: u32, h: u32, m: u32) -> OnsetEvent {
        OnsetEvent::new(NaiveDate::from_ymd_opt(2024, 2, day).unwrap(), hm(h, m))
    }

    #[test]
    fn test_night_toggle_removed() {
        let window = PlausibilityWindow::new(hm(17, 0), hm(19, 0));
        let onsets = vec![onset(1, 18, 2), onset(2, 18, 5), onset(3, 3, 10), onset(3, 18, 7)];
        let filtered = filter(&onsets, Some(&window));
        assert_eq!(filtered.kept, vec![onset(1, 18, 2), onset(2, 18, 5), onset(3, 18, 7)]);
        assert_eq!(filtered.rejected, vec![onset(3, 3, 10)]);
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let window = PlausibilityWindow::new(hm(17, 0), hm(19, 0));
        assert!(window.contains(hm(17, 0)));
        assert!(!window.contains(hm(19, 0)));
    }

    #[test]
    fn test_wrapping_window() {
        let window = PlausibilityWindow::new(hm(22, 0), hm(2, 0));
        assert!(window.wraps_midnight());
        assert!(window.contains(hm(23, 30)));
        assert!(window.contains(hm(1, 59)));
        assert!(!window.contains(hm(2, 0)));
        assert!(!window.contains(hm(12, 0)));
    }

    #[test]
    fn test_no_window_keeps_all() {
        let onsets = vec![onset(1, 3, 0), onset(1, 18, 0)];
        let filtered = filter(&onsets, None);
        assert_eq!(filtered.kept, onsets);
        assert!(filtered.rejected.is_empty());
    }

    #[test]
    fn test_parse_window() {
        let window: PlausibilityWindow = "17:00-19:30".parse().unwrap();
        assert_eq!(window, PlausibilityWindow::new(hm(17, 0), hm(19, 30)));
        assert_eq!(window.to_string(), "17:00-19:30");
        assert!("17:00".parse::<PlausibilityWindow>().is_err());
        assert!("25:00-01:00".parse::<PlausibilityWindow>().is_err());
    }
}
