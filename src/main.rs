//! darkonset - align behavioral events to dark-cycle onset
//!
//! Commands:
//!   --align SENSORS EVENTS   Annotate events with dark-cycle offsets
//!   --onsets SENSORS         List cleaned dark-cycle onsets
//!   --show-config            Print the effective configuration
//!   --save-config            Persist overrides to config.ini
//!   --help                   Show usage

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process;

use darkonset::config::{self, Paths};
use darkonset::pipeline;
use darkonset::{io as records_io, AlignConfig, PlausibilityWindow};
use tracing::error;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DARKONSET_LOG";

enum Command {
    Align { sensors: PathBuf, events: PathBuf },
    Onsets { sensors: PathBuf },
    ShowConfig,
    SaveConfig,
}

/// Per-invocation overrides on top of config.ini
#[derive(Default)]
struct Overrides {
    threshold: Option<f64>,
    window: Option<PlausibilityWindow>,
    half_cycle_minutes: Option<i64>,
    no_normalize: bool,
    location: Option<String>,
    out: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, cfg: &mut AlignConfig) {
        if let Some(t) = self.threshold {
            cfg.illumination_threshold = t;
        }
        if let Some(w) = self.window {
            cfg.plausibility_window = Some(w);
        }
        if let Some(m) = self.half_cycle_minutes {
            cfg.half_cycle_minutes = m;
        }
        if self.no_normalize {
            cfg.normalize_to_positive_cycle = false;
        }
    }
}

fn print_usage() {
    eprintln!("darkonset - align behavioral events to dark-cycle onset");
    eprintln!();
    eprintln!("Usage: darkonset COMMAND [OPTIONS]");
    eprintln!();
    eprintln!("  --align SENSORS EVENTS  Annotate EVENTS with offsets from dark onset");
    eprintln!("  --onsets SENSORS        List cleaned dark-cycle onsets");
    eprintln!("  --show-config           Print effective configuration");
    eprintln!("  --save-config           Save option overrides to config.ini");
    eprintln!("  --help                  Show this help");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --threshold N           Illumination below N is dark (default 5)");
    eprintln!("  --window HH:MM-HH:MM    Plausible clock range for dark onset");
    eprintln!("  --half-cycle MIN        Boundary repair shift in minutes (default 720)");
    eprintln!("  --no-normalize          Keep negative offsets instead of wrapping");
    eprintln!("  --location ID           Sensor location to use");
    eprintln!("  --out FILE              Write annotated events to FILE (default stdout)");
    eprintln!();
    eprintln!("Log level via {LOG_ENV} (default info).");
}

fn fail(msg: &str) -> ! {
    eprintln!("{msg}");
    print_usage();
    process::exit(1);
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v.as_str(),
        None => fail(&format!("{flag} requires a value")),
    }
}

fn parse_args() -> (Command, Overrides) {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let mut overrides = Overrides::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--threshold" => {
                let v = value_of(&args, i, flag);
                overrides.threshold = match v.parse() {
                    Ok(t) => Some(t),
                    Err(_) => fail(&format!("Invalid threshold: {v}")),
                };
                i += 1;
            }
            "--window" => {
                let v = value_of(&args, i, flag);
                overrides.window = match v.parse() {
                    Ok(w) => Some(w),
                    Err(e) => fail(&e),
                };
                i += 1;
            }
            "--half-cycle" => {
                let v = value_of(&args, i, flag);
                overrides.half_cycle_minutes = match v.parse() {
                    Ok(m) => Some(m),
                    Err(_) => fail(&format!("Invalid half cycle: {v}")),
                };
                i += 1;
            }
            "--location" => {
                overrides.location = Some(value_of(&args, i, flag).to_string());
                i += 1;
            }
            "--out" => {
                overrides.out = Some(PathBuf::from(value_of(&args, i, flag)));
                i += 1;
            }
            "--no-normalize" => overrides.no_normalize = true,
            other if other.starts_with("--") => fail(&format!("Unknown option: {other}")),
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let command = match args[1].as_str() {
        "--align" | "align" => {
            if positional.len() != 2 {
                eprintln!("--align requires SENSORS and EVENTS files");
                eprintln!("  Example: darkonset --align env.json visits.json --window 17:00-19:00");
                process::exit(1);
            }
            Command::Align {
                sensors: PathBuf::from(&positional[0]),
                events: PathBuf::from(&positional[1]),
            }
        }
        "--onsets" | "onsets" => {
            if positional.len() != 1 {
                eprintln!("--onsets requires a SENSORS file");
                process::exit(1);
            }
            Command::Onsets {
                sensors: PathBuf::from(&positional[0]),
            }
        }
        "--show-config" | "show-config" => Command::ShowConfig,
        "--save-config" | "save-config" => Command::SaveConfig,
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => fail(&format!("Unknown command: {other}")),
    };

    (command, overrides)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let (command, overrides) = parse_args();
    init_logging();

    let paths = match Paths::init() {
        Ok(p) => p,
        Err(e) => {
            error!("failed to initialize paths: {e}");
            process::exit(1);
        }
    };

    let mut cfg = match config::load(&paths) {
        Ok(c) => c,
        Err(e) => {
            error!(path = %paths.config_file.display(), "{e}");
            process::exit(1);
        }
    };
    overrides.apply(&mut cfg);

    let result = match command {
        Command::Align { sensors, events } => cmd_align(&sensors, &events, &cfg, &overrides),
        Command::Onsets { sensors } => cmd_onsets(&sensors, &cfg, &overrides),
        Command::ShowConfig => {
            cmd_show_config(&cfg, &paths);
            0
        }
        Command::SaveConfig => cmd_save_config(&cfg, &paths),
    };

    process::exit(result);
}

fn cmd_align(sensors: &Path, events: &Path, cfg: &AlignConfig, ovr: &Overrides) -> i32 {
    let run = || -> darkonset::error::AlignResult<()> {
        let samples = records_io::read_sensor_stream(sensors, ovr.location.as_deref())?;
        let events = records_io::read_event_stream(events)?;
        let alignment = pipeline::normalize(&events, &samples, cfg)?;

        match &ovr.out {
            Some(path) => records_io::write_annotated(BufWriter::new(File::create(path)?), &alignment.records),
            None => records_io::write_annotated(io::stdout().lock(), &alignment.records),
        }
    };

    match run() {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            1
        }
    }
}

fn cmd_onsets(sensors: &Path, cfg: &AlignConfig, ovr: &Overrides) -> i32 {
    let cleaned = match records_io::read_sensor_stream(sensors, ovr.location.as_deref())
        .and_then(|samples| pipeline::clean_onsets(&samples, cfg))
    {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return 1;
        }
    };

    for onset in &cleaned.onsets {
        let mark = if cleaned.synthetic == Some(*onset) { "  (synthetic)" } else { "" };
        println!("{} {}{}", onset.date, onset.time, mark);
    }
    for onset in &cleaned.rejected {
        println!("{} {}  (rejected)", onset.date, onset.time);
    }
    0
}

fn cmd_show_config(cfg: &AlignConfig, paths: &Paths) {
    println!("Config file: {}\n", paths.config_file.display());
    println!("Illumination threshold: {}", cfg.illumination_threshold);
    match &cfg.plausibility_window {
        Some(w) => println!("Plausibility window: {w}"),
        None => println!("Plausibility window: any time"),
    }
    println!("Half cycle: {} min", cfg.half_cycle_minutes);
    println!(
        "Normalize offsets: {}",
        if cfg.normalize_to_positive_cycle { "yes" } else { "no" }
    );
}

fn cmd_save_config(cfg: &AlignConfig, paths: &Paths) -> i32 {
    if let Err(e) = cfg.validate() {
        error!("{e}");
        return 1;
    }
    if let Err(e) = config::save(paths, cfg) {
        error!("failed to save config: {e}");
        return 1;
    }
    println!("Saved {}", paths.config_file.display());
    0
}
