//! CLI entry point: load a configuration, run the pipeline, write the
//! output artifacts (spec.md §6.5).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use jetting_grid::config::Config;
use jetting_grid::pipeline;
use tracing::error;

/// Generate a jetting-grid actuation schedule from a noise configuration.
#[derive(Parser, Debug)]
#[command(name = "jetting-gridgen", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    config: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match run(&args.config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &PathBuf) -> Result<(), jetting_grid::error::Error> {
    let config = Config::load(config_path)?;
    let layout = jetting_grid::grid::ValveLayout::new();
    let output = pipeline::run(&config)?;

    let timestamp = current_timestamp();
    pipeline::export_all(&config, &layout, &output, &timestamp)?;
    Ok(())
}

/// `YYYY-MM-DD HH:MM:SS`, wall-clock time. Isolated in its own function
/// because the rest of the pipeline never calls a clock, which keeps it
/// deterministic and testable.
fn current_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    // Minimal civil-from-unix-seconds conversion (UTC), avoiding a
    // datetime-formatting dependency for a single header line.
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (hour, minute, second) = (rem / 3600, (rem % 3600) / 60, rem % 60);

    let (year, month, day) = civil_from_days(days as i64);
    format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
}

/// Howard Hinnant's `civil_from_days` algorithm, days since the Unix epoch
/// to a proleptic-Gregorian `(year, month, day)`.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civil_from_days_matches_known_epoch_offsets() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_956), (2024, 8, 21));
    }
}
