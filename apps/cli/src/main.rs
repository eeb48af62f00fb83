//! Command-line driver: load a track and a vehicle, solve, report, export.

mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use solver::{LapSolver, SolverConfig};

#[derive(Parser)]
#[command(name = "vsim")]
#[command(about = "Quasi-steady-state lap time simulator", version)]
struct Cli {
    /// Track file: centerline .csv or track .json
    track: PathBuf,

    /// Vehicle description .json
    vehicle: PathBuf,

    /// Telemetry CSV output (auto-named under outputs/ when omitted)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Telemetry JSON output
    #[arg(long)]
    json: Option<PathBuf>,

    /// Acceleration envelope CSV output
    #[arg(long)]
    ggv: Option<PathBuf>,

    /// Maximum solver iterations
    #[arg(long, default_value_t = 10)]
    iterations: u32,

    /// Convergence tolerance on the lap time (s)
    #[arg(long, default_value_t = 0.001)]
    tolerance: f64,

    /// Per-iteration solver logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let track = if is_csv(&args.track) {
        iox::import_track_csv(&args.track)?
    } else {
        iox::import_track_json(&args.track)?
    };
    let vehicle = iox::import_vehicle_json(&args.vehicle)?;

    let cfg = SolverConfig {
        max_iterations: args.iterations,
        tolerance: args.tolerance,
        ..SolverConfig::default()
    };

    let mut solver = LapSolver::new(&track, &vehicle, cfg)?;
    let result = solver.solve();

    report::print_summary(&track, &vehicle, &result);

    let csv_path = match args.csv {
        Some(path) => path,
        None => {
            let path = default_csv_path(&vehicle.name, track.name(), result.lap_time);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
            path
        }
    };
    iox::export_telemetry_csv(&result, &csv_path)?;
    println!("Telemetry written to {}", csv_path.display());

    if let Some(path) = &args.json {
        iox::export_telemetry_json(&result, path)?;
        println!("Result written to {}", path.display());
    }

    if let Some(path) = &args.ggv {
        iox::export_ggv_csv(solver.envelope(), path)?;
        println!("Envelope written to {}", path.display());
    }

    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension().map(|e| e.eq_ignore_ascii_case("csv")).unwrap_or(false)
}

/// outputs/<vehicle>-<track>-<M_SS>-VSIM.csv
fn default_csv_path(vehicle: &str, track: &str, lap_time: f64) -> PathBuf {
    let minutes = (lap_time / 60.0) as u32;
    let seconds = (lap_time % 60.0) as u32;
    PathBuf::from(format!(
        "outputs/{}-{}-{}_{:02}-VSIM.csv",
        report::clean_name(vehicle),
        report::clean_name(track),
        minutes,
        seconds
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_track_format_by_extension() {
        assert!(is_csv(Path::new("monza.csv")));
        assert!(is_csv(Path::new("monza.CSV")));
        assert!(!is_csv(Path::new("monza.json")));
        assert!(!is_csv(Path::new("monza")));
    }

    #[test]
    fn auto_named_output_encodes_the_lap_time() {
        let path = default_csv_path("GP Car (2024)", "monza full", 83.412);
        assert_eq!(path, PathBuf::from("outputs/GP_Car_2024_-monza_full-1_23-VSIM.csv"));
    }
}
