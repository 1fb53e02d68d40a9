//! Run configuration, INI persistence, and path resolution.
//!
//! `[calibration]` section of $HOME/.config/darkonset/config.ini:
//!
//! ```ini
//! [calibration]
//! threshold = 5
//! window_start = 17:00
//! window_end = 19:00
//! half_cycle_minutes = 720
//! normalize = true
//! ```
//!
//! Missing keys keep their defaults. Values that do not parse are errors.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, AlignResult};
use crate::outlier::{parse_clock, PlausibilityWindow};
use crate::{DEFAULT_HALF_CYCLE_MINUTES, DEFAULT_ILLUMINATION_THRESHOLD, MINUTES_PER_DAY};

const MAX_CONFIG_BYTES: u64 = 16 * 1024;

/// Resolved filesystem paths
#[derive(Clone)]
pub struct Paths {
    pub config_file: PathBuf,
}

impl Paths {
    pub fn init() -> Result<Self, io::Error> {
        let home = std::env::var("HOME").map_err(|_| {
            io::Error::new(io::ErrorKind::NotFound, "HOME not set")
        })?;

        let config_dir = PathBuf::from(&home).join(".config").join("darkonset");
        fs::create_dir_all(&config_dir)?;

        Ok(Self {
            config_file: config_dir.join("config.ini"),
        })
    }
}

/// Parameters shared by every stage of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignConfig {
    pub illumination_threshold: f64,
    /// None accepts every onset candidate
    pub plausibility_window: Option<PlausibilityWindow>,
    pub half_cycle_minutes: i64,
    pub normalize_to_positive_cycle: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            illumination_threshold: DEFAULT_ILLUMINATION_THRESHOLD,
            plausibility_window: None,
            half_cycle_minutes: DEFAULT_HALF_CYCLE_MINUTES,
            normalize_to_positive_cycle: true,
        }
    }
}

impl AlignConfig {
    pub fn half_cycle(&self) -> Duration {
        Duration::minutes(self.half_cycle_minutes)
    }

    pub fn validate(&self) -> AlignResult<()> {
        if !self.illumination_threshold.is_finite() {
            return Err(AlignError::InvalidConfig(format!(
                "illumination threshold must be finite, got {}",
                self.illumination_threshold
            )));
        }
        if self.half_cycle_minutes <= 0 || self.half_cycle_minutes >= MINUTES_PER_DAY {
            return Err(AlignError::InvalidConfig(format!(
                "half cycle must be between 0 and 24h, got {} min",
                self.half_cycle_minutes
            )));
        }
        if let Some(w) = &self.plausibility_window {
            if w.start == w.end {
                return Err(AlignError::InvalidConfig(format!(
                    "plausibility window {w} is empty"
                )));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> AlignError {
    AlignError::InvalidConfig(format!("bad value for '{key}': '{value}'"))
}

/// Parse the [calibration] section on top of defaults
pub fn parse_ini(content: &str) -> AlignResult<AlignConfig> {
    let mut cfg = AlignConfig::default();
    let mut window_start = None;
    let mut window_end = None;
    let mut in_calibration = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if trimmed.starts_with('[') {
            in_calibration = trimmed == "[calibration]";
            continue;
        }

        if !in_calibration {
            continue;
        }

        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            match key {
                "threshold" => {
                    cfg.illumination_threshold = value.parse().map_err(|_| invalid(key, value))?
                }
                "window_start" => window_start = Some(parse_clock(value).map_err(AlignError::InvalidConfig)?),
                "window_end" => window_end = Some(parse_clock(value).map_err(AlignError::InvalidConfig)?),
                "half_cycle_minutes" => {
                    cfg.half_cycle_minutes = value.parse().map_err(|_| invalid(key, value))?
                }
                "normalize" => {
                    cfg.normalize_to_positive_cycle = value.parse().map_err(|_| invalid(key, value))?
                }
                _ => {}
            }
        }
    }

    cfg.plausibility_window = match (window_start, window_end) {
        (Some(start), Some(end)) => Some(PlausibilityWindow::new(start, end)),
        (None, None) => None,
        _ => {
            return Err(AlignError::InvalidConfig(
                "window_start and window_end must be set together".to_string(),
            ))
        }
    };

    Ok(cfg)
}

pub fn render_ini(cfg: &AlignConfig) -> String {
    let mut out = String::from("[calibration]\n");
    out.push_str(&format!("threshold = {}\n", cfg.illumination_threshold));
    if let Some(w) = &cfg.plausibility_window {
        out.push_str(&format!("window_start = {}\n", w.start.format("%H:%M")));
        out.push_str(&format!("window_end = {}\n", w.end.format("%H:%M")));
    }
    out.push_str(&format!("half_cycle_minutes = {}\n", cfg.half_cycle_minutes));
    out.push_str(&format!("normalize = {}\n", cfg.normalize_to_positive_cycle));
    out
}

/// Load config from an INI file. A missing file yields defaults.
pub fn load_from(path: &Path) -> AlignResult<AlignConfig> {
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AlignConfig::default()),
        Err(e) => return Err(e.into()),
    };
    if meta.len() > MAX_CONFIG_BYTES {
        return Err(AlignError::InvalidConfig(format!(
            "{} exceeds {} bytes",
            path.display(),
            MAX_CONFIG_BYTES
        )));
    }
    parse_ini(&fs::read_to_string(path)?)
}

pub fn load(paths: &Paths) -> AlignResult<AlignConfig> {
    load_from(&paths.config_file)
}

pub fn save(paths: &Paths, cfg: &AlignConfig) -> Result<(), io::Error> {
    fs::write(&paths.config_file, render_ini(cfg))
}
